//! Deadline bound: strictly in the future, at most `max_secs` ahead

use serde_json::json;

use super::{Guard, GuardContext, ValidationError};

pub struct DeadlineGuard {
    max_secs: u64,
}

impl DeadlineGuard {
    pub fn new(max_secs: u64) -> Self {
        Self { max_secs }
    }
}

impl Guard for DeadlineGuard {
    fn name(&self) -> &'static str {
        "deadline"
    }

    fn check(&self, ctx: &GuardContext<'_>) -> Result<(), ValidationError> {
        let deadline = ctx.plan.deadline;
        if deadline <= ctx.now {
            return Err(
                ValidationError::new(self.name(), "Plan deadline must be in the future")
                    .with_detail("deadline", json!(deadline))
                    .with_detail("now", json!(ctx.now)),
            );
        }
        let ahead = deadline - ctx.now;
        if ahead > self.max_secs {
            return Err(ValidationError::new(
                self.name(),
                format!(
                    "Plan deadline too far in future (max {}s). Got {}s.",
                    self.max_secs, ahead
                ),
            ));
        }
        Ok(())
    }
}
