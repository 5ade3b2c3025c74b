//! Action count bound

use super::{Guard, GuardContext, ValidationError};
use serde_json::json;

pub struct ActionCountGuard {
    max_actions: usize,
}

impl ActionCountGuard {
    pub fn new(max_actions: usize) -> Self {
        Self { max_actions }
    }
}

impl Guard for ActionCountGuard {
    fn name(&self) -> &'static str {
        "action_count"
    }

    fn check(&self, ctx: &GuardContext<'_>) -> Result<(), ValidationError> {
        let count = ctx.plan.actions.len();
        if count == 0 {
            return Err(ValidationError::new(
                self.name(),
                "Plan must contain at least one action.",
            ));
        }
        if count > self.max_actions {
            return Err(ValidationError::new(
                self.name(),
                format!(
                    "Plan exceeds maximum action count ({}). Got {} actions.",
                    self.max_actions, count
                ),
            )
            .with_detail("max", json!(self.max_actions))
            .with_detail("actual", json!(count)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use alloy::primitives::U256;

    fn check(guard: &ActionCountGuard, n: usize) -> Result<(), ValidationError> {
        let actions = (0..n).map(|_| wrap(U256::from(1u64))).collect();
        let plan = plan(actions);
        guard.check(&GuardContext {
            plan: &plan,
            value: U256::ZERO,
            now: NOW,
        })
    }

    #[test]
    fn empty_plan_rejected() {
        let err = check(&ActionCountGuard::new(4), 0).unwrap_err();
        assert_eq!(err.reason, "Plan must contain at least one action.");
    }

    #[test]
    fn bounds_are_inclusive() {
        let guard = ActionCountGuard::new(4);
        assert!(check(&guard, 1).is_ok());
        assert!(check(&guard, 4).is_ok());
        let err = check(&guard, 5).unwrap_err();
        assert_eq!(err.details["max"], 4);
        assert_eq!(err.details["actual"], 5);
    }
}
