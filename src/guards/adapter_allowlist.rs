//! Adapter allowlist
//!
//! Every action must target a configured adapter, and specifically the one
//! configured for its action type. Addresses compare by their 20 bytes, so
//! hex casing in requests or config never matters.

use alloy::primitives::Address;
use serde_json::json;

use super::{format_list, Guard, GuardContext, ValidationError};
use crate::config::AdapterAddresses;

pub struct AdapterAllowlistGuard {
    adapters: AdapterAddresses,
    allowed: Vec<Address>,
}

impl AdapterAllowlistGuard {
    pub fn new(adapters: &AdapterAddresses) -> Self {
        Self {
            allowed: adapters.allowlist(),
            adapters: adapters.clone(),
        }
    }
}

impl Guard for AdapterAllowlistGuard {
    fn name(&self) -> &'static str {
        "adapter_allowlist"
    }

    fn check(&self, ctx: &GuardContext<'_>) -> Result<(), ValidationError> {
        for (index, action) in ctx.plan.actions.iter().enumerate() {
            if !self.allowed.contains(&action.adapter) {
                return Err(ValidationError::new(
                    self.name(),
                    format!(
                        "Adapter {} not in allowlist. Allowed: {}",
                        action.adapter,
                        format_list(&self.allowed)
                    ),
                )
                .with_detail("actionIndex", json!(index))
                .with_detail("adapter", json!(action.adapter.to_string())));
            }

            let kind = action.action_type.name();
            match self.adapters.for_action(action.action_type) {
                Some(expected) if expected == action.adapter => {}
                Some(expected) => {
                    return Err(ValidationError::new(
                        self.name(),
                        format!(
                            "{} action must use adapter {}. Got {}",
                            kind, expected, action.adapter
                        ),
                    )
                    .with_detail("actionIndex", json!(index))
                    .with_detail("adapter", json!(action.adapter.to_string())));
                }
                None => {
                    return Err(ValidationError::new(
                        self.name(),
                        format!("No adapter configured for {} actions", kind),
                    )
                    .with_detail("actionIndex", json!(index)));
                }
            }
        }
        Ok(())
    }
}
