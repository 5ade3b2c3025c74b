//! Token allowlist for swap actions

use alloy::primitives::Address;
use serde_json::json;

use super::{format_list, Guard, GuardContext, ValidationError};
use crate::codec;
use crate::plan::ActionType;

pub struct TokenAllowlistGuard {
    allowed: Vec<Address>,
}

impl TokenAllowlistGuard {
    pub fn new(allowed: Vec<Address>) -> Self {
        Self { allowed }
    }

    fn reject(&self, side: &str, token: Address, index: usize) -> ValidationError {
        ValidationError::new(
            self.name(),
            format!(
                "Swap {} {} not in allowlist. Allowed: {}",
                side,
                token,
                format_list(&self.allowed)
            ),
        )
        .with_detail("actionIndex", json!(index))
        .with_detail("token", json!(token.to_string()))
    }
}

impl Guard for TokenAllowlistGuard {
    fn name(&self) -> &'static str {
        "token_allowlist"
    }

    fn check(&self, ctx: &GuardContext<'_>) -> Result<(), ValidationError> {
        for (index, action) in ctx.plan.actions.iter().enumerate() {
            if action.action_type != ActionType::Swap {
                continue;
            }
            let params = codec::decode_swap(&action.data).map_err(|e| {
                ValidationError::new(
                    self.name(),
                    format!("Failed to decode swap action data: {}", e),
                )
                .with_detail("actionIndex", json!(index))
            })?;
            if !self.allowed.contains(&params.tokenIn) {
                return Err(self.reject("tokenIn", params.tokenIn, index));
            }
            if !self.allowed.contains(&params.tokenOut) {
                return Err(self.reject("tokenOut", params.tokenOut, index));
            }
        }
        Ok(())
    }
}
