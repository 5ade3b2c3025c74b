//! Rate limiting and short-lived caches for read endpoints

mod cache;
mod cooldown;

pub use cache::TtlCache;
pub use cooldown::{CooldownDecision, CooldownLimiter};
