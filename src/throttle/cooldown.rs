//! Per-key cooldown
//!
//! Enforces a minimum interval between calls for the same key, e.g.
//! `(endpoint, user address)`. A throttled call is an answer, not an error.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::clock::SharedClock;

/// Outcome of a cooldown check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownDecision {
    Allow,
    Throttled { retry_after_ms: u64 },
}

impl CooldownDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, CooldownDecision::Allow)
    }
}

pub struct CooldownLimiter<K> {
    interval_ms: u64,
    clock: SharedClock,
    last_call: Arc<Mutex<HashMap<K, u64>>>,
}

impl<K> CooldownLimiter<K>
where
    K: Eq + Hash + Clone + Send,
{
    pub fn new(interval_ms: u64, clock: SharedClock) -> Self {
        Self {
            interval_ms,
            clock,
            last_call: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Check and, when allowed, record the call
    pub async fn check(&self, key: &K) -> CooldownDecision {
        let now = self.clock.now_millis();
        let mut last_call = self.last_call.lock().await;

        if let Some(&last) = last_call.get(key) {
            let elapsed = now.saturating_sub(last);
            if elapsed < self.interval_ms {
                let retry_after_ms = self.interval_ms - elapsed;
                tracing::debug!(retry_after_ms, "Cooldown active");
                return CooldownDecision::Throttled { retry_after_ms };
            }
        }

        last_call.insert(key.clone(), now);
        // Drop entries that can no longer throttle anything
        let interval = self.interval_ms;
        last_call.retain(|_, &mut at| now.saturating_sub(at) < interval);
        CooldownDecision::Allow
    }
}
