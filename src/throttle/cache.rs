//! Time-bounded cache for idempotent reads

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::clock::SharedClock;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at_ms: u64,
}

pub struct TtlCache<K, V> {
    ttl_ms: u64,
    clock: SharedClock,
    entries: Arc<RwLock<HashMap<K, CacheEntry<V>>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    pub fn new(ttl_ms: u64, clock: SharedClock) -> Self {
        Self {
            ttl_ms,
            clock,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Fresh value for `key`, if any
    pub async fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now_millis();
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| now.saturating_sub(e.stored_at_ms) < self.ttl_ms)
            .map(|e| e.value.clone())
    }

    pub async fn insert(&self, key: K, value: V) {
        let now = self.clock.now_millis();
        let mut entries = self.entries.write().await;
        let ttl = self.ttl_ms;
        entries.retain(|_, e| now.saturating_sub(e.stored_at_ms) < ttl);
        entries.insert(
            key,
            CacheEntry {
                value,
                stored_at_ms: now,
            },
        );
    }

    pub async fn invalidate(&self, key: &K) {
        self.entries.write().await.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[tokio::test]
    async fn serves_fresh_entries_only() {
        let clock = ManualClock::new(0);
        let cache: TtlCache<&str, u32> = TtlCache::new(5_000, Arc::new(clock.clone()));

        cache.insert("preflight", 1).await;
        assert_eq!(cache.get(&"preflight").await, Some(1));

        clock.advance_millis(4_999);
        assert_eq!(cache.get(&"preflight").await, Some(1));

        clock.advance_millis(1);
        assert_eq!(cache.get(&"preflight").await, None);
    }

    #[tokio::test]
    async fn invalidate_drops_entry() {
        let clock = ManualClock::new(0);
        let cache: TtlCache<u8, String> = TtlCache::new(5_000, Arc::new(clock));

        cache.insert(1, "ok".to_string()).await;
        cache.invalidate(&1).await;
        assert_eq!(cache.get(&1).await, None);
    }
}
