//! Pre-signature guards
//!
//! The guards form a fixed pipeline every plan passes through before a hash,
//! a typed-data payload or a relayed transaction exists for it. Each guard is
//! pure: it sees the plan, the native value and the current time, nothing
//! else. The first failing guard short-circuits the pipeline with a
//! [`ValidationError`] whose `reason` is stable enough to assert on.

mod action_count;
mod adapter_allowlist;
mod caps;
mod deadline;
mod token_allowlist;

pub use action_count::ActionCountGuard;
pub use adapter_allowlist::AdapterAllowlistGuard;
pub use caps::{SwapAmountCapGuard, ValueCapGuard};
pub use deadline::DeadlineGuard;
pub use token_allowlist::TokenAllowlistGuard;

use alloy::primitives::{Address, U256};
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::{AdapterAddresses, ExecutionConfig, GuardLimits};
use crate::plan::Plan;

/// Guard violation
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{reason}")]
pub struct ValidationError {
    pub reason: String,
    pub details: Value,
}

impl ValidationError {
    pub fn new(guard: &'static str, reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            details: json!({ "guard": guard }),
        }
    }

    /// Attach extra detail fields
    pub fn with_detail(mut self, key: &str, value: Value) -> Self {
        if let Value::Object(ref mut map) = self.details {
            map.insert(key.to_string(), value);
        }
        self
    }

    pub fn guard(&self) -> Option<&str> {
        self.details.get("guard").and_then(|g| g.as_str())
    }
}

/// What a guard inspects
#[derive(Debug, Clone, Copy)]
pub struct GuardContext<'a> {
    pub plan: &'a Plan,
    /// Native value attached to the transaction
    pub value: U256,
    /// Unix seconds
    pub now: u64,
}

pub trait Guard: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, ctx: &GuardContext<'_>) -> Result<(), ValidationError>;
}

/// Render an address list the way error messages show it
pub(crate) fn format_list(addresses: &[Address]) -> String {
    let items: Vec<String> = addresses.iter().map(|a| a.to_string()).collect();
    format!("[{}]", items.join(", "))
}

/// Ordered guard pipeline
pub struct GuardValidator {
    guards: Vec<Box<dyn Guard>>,
}

impl GuardValidator {
    /// Standard pipeline: count, adapters, deadline, tokens, amount, value
    pub fn new(limits: &GuardLimits, adapters: &AdapterAddresses, tokens: Vec<Address>) -> Self {
        let guards: Vec<Box<dyn Guard>> = vec![
            Box::new(ActionCountGuard::new(limits.max_actions)),
            Box::new(AdapterAllowlistGuard::new(adapters)),
            Box::new(DeadlineGuard::new(limits.max_deadline_secs)),
            Box::new(TokenAllowlistGuard::new(tokens)),
            Box::new(SwapAmountCapGuard::new(
                limits.max_swap_amount_wei,
                limits.native_symbol.clone(),
            )),
            Box::new(ValueCapGuard::new(
                limits.max_value_wei,
                limits.native_symbol.clone(),
            )),
        ];
        Self { guards }
    }

    pub fn from_config(config: &ExecutionConfig) -> Self {
        Self::new(&config.guard, &config.adapters, config.allowed_tokens())
    }

    /// Run every guard in order; the first failure wins
    pub fn validate(&self, plan: &Plan, value: U256, now: u64) -> Result<(), ValidationError> {
        let ctx = GuardContext { plan, value, now };
        for guard in &self.guards {
            if let Err(err) = guard.check(&ctx) {
                tracing::warn!(guard = guard.name(), reason = %err.reason, "Guard rejected plan");
                return Err(err);
            }
            tracing::debug!(guard = guard.name(), "Guard passed");
        }
        Ok(())
    }

    pub fn guard_names(&self) -> Vec<&'static str> {
        self.guards.iter().map(|g| g.name()).collect()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use alloy::primitives::aliases::U24;
    use alloy::primitives::{Address, U256};

    use crate::codec::{ActionPayload, SwapParams, WrapParams};
    use crate::plan::{Action, Plan};

    pub const NOW: u64 = 1_700_000_000;
    pub const ONE_ETH: u128 = 1_000_000_000_000_000_000;

    pub fn weth() -> Address {
        Address::repeat_byte(0xaa)
    }

    pub fn stable() -> Address {
        Address::repeat_byte(0xbb)
    }

    pub fn swap_adapter() -> Address {
        Address::repeat_byte(0x22)
    }

    pub fn wrap_adapter() -> Address {
        Address::repeat_byte(0x33)
    }

    pub fn swap(token_in: Address, token_out: Address, amount_in: U256) -> Action {
        ActionPayload::Swap(SwapParams {
            tokenIn: token_in,
            tokenOut: token_out,
            fee: U24::from(3000u32),
            amountIn: amount_in,
            amountOutMin: U256::from(1u64),
            recipient: Address::repeat_byte(0x11),
        })
        .into_action(swap_adapter())
    }

    pub fn wrap(amount: U256) -> Action {
        ActionPayload::Wrap(WrapParams {
            amount,
            recipient: Address::repeat_byte(0x11),
        })
        .into_action(wrap_adapter())
    }

    pub fn plan(actions: Vec<Action>) -> Plan {
        Plan {
            user: Address::repeat_byte(0x11),
            nonce: U256::ZERO,
            deadline: NOW + 300,
            actions,
        }
    }
}
