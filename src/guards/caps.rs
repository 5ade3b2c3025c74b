//! Amount ceilings for swaps and for the attached native value

use alloy::primitives::U256;
use serde_json::json;

use super::{Guard, GuardContext, ValidationError};
use crate::codec::{self, ActionPayload};
use crate::plan::ActionType;
use crate::tokens::format_amount;

const NATIVE_DECIMALS: u8 = 18;

/// Per-swap `amountIn` ceiling
pub struct SwapAmountCapGuard {
    max: U256,
    symbol: String,
}

impl SwapAmountCapGuard {
    pub fn new(max: U256, symbol: String) -> Self {
        Self { max, symbol }
    }
}

impl Guard for SwapAmountCapGuard {
    fn name(&self) -> &'static str {
        "swap_amount_cap"
    }

    fn check(&self, ctx: &GuardContext<'_>) -> Result<(), ValidationError> {
        for (index, action) in ctx.plan.actions.iter().enumerate() {
            if action.action_type != ActionType::Swap {
                continue;
            }
            // Undecodable payloads are rejected by the token allowlist
            let Ok(params) = codec::decode_swap(&action.data) else {
                continue;
            };
            if params.amountIn > self.max {
                return Err(ValidationError::new(
                    self.name(),
                    format!(
                        "Swap amountIn exceeds maximum ({} {}).",
                        format_amount(self.max, NATIVE_DECIMALS),
                        self.symbol
                    ),
                )
                .with_detail("actionIndex", json!(index))
                .with_detail("amountIn", json!(params.amountIn.to_string())));
            }
        }
        Ok(())
    }
}

/// Ceiling on the transaction's native value and on every amount a WRAP or
/// PULL action moves
pub struct ValueCapGuard {
    max: U256,
    symbol: String,
}

impl ValueCapGuard {
    pub fn new(max: U256, symbol: String) -> Self {
        Self { max, symbol }
    }

    fn exceeded(&self, what: &str) -> String {
        format!(
            "{} exceeds maximum ({} {}).",
            what,
            format_amount(self.max, NATIVE_DECIMALS),
            self.symbol
        )
    }
}

impl Guard for ValueCapGuard {
    fn name(&self) -> &'static str {
        "value_cap"
    }

    fn check(&self, ctx: &GuardContext<'_>) -> Result<(), ValidationError> {
        if ctx.value > self.max {
            return Err(
                ValidationError::new(self.name(), self.exceeded("Transaction value"))
                    .with_detail("value", json!(ctx.value.to_string())),
            );
        }

        for (index, action) in ctx.plan.actions.iter().enumerate() {
            if !matches!(action.action_type, ActionType::Wrap | ActionType::Pull) {
                continue;
            }
            let amount = match ActionPayload::decode(action.action_type, &action.data) {
                Ok(ActionPayload::Wrap(p)) => p.amount,
                Ok(ActionPayload::Pull(p)) => p.amount,
                Ok(_) => continue,
                Err(e) => {
                    return Err(ValidationError::new(
                        self.name(),
                        format!(
                            "Failed to decode {} action data: {}",
                            action.action_type.name(),
                            e
                        ),
                    )
                    .with_detail("actionIndex", json!(index)))
                }
            };
            if amount > self.max {
                return Err(ValidationError::new(
                    self.name(),
                    self.exceeded(&format!("{} amount", action.action_type.name())),
                )
                .with_detail("actionIndex", json!(index))
                .with_detail("amount", json!(amount.to_string())));
            }
        }
        Ok(())
    }
}
