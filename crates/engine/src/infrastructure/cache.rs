//! TTL-based cache for compendium lookups.
//!
//! Spell lists and pack indexes are shared read-only data; they are cached
//! for a configurable time and dropped wholesale when rules or the indexed
//! packs change.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

/// Shared map whose entries go stale after a fixed TTL.
///
/// Stale entries are skipped by reads and overwritten by the next insert.
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, TtlEntry<V>>>,
    ttl: Duration,
}

struct TtlEntry<V> {
    value: V,
    inserted_at: Instant,
}

impl<V> TtlEntry<V> {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() < ttl
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Insert a value, replacing any existing entry and resetting the TTL.
    pub async fn insert(&self, key: K, value: V) {
        let entry = TtlEntry {
            value,
            inserted_at: Instant::now(),
        };
        self.entries.write().await.insert(key, entry);
    }

    #[cfg(test)]
    pub async fn insert_at(&self, key: K, value: V, inserted_at: Instant) {
        let entry = TtlEntry { value, inserted_at };
        self.entries.write().await.insert(key, entry);
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let guard = self.entries.read().await;
        guard
            .get(key)
            .filter(|entry| entry.is_fresh(self.ttl))
            .map(|entry| entry.value.clone())
    }

    /// Drop entries whose key matches, fresh or not.
    pub async fn invalidate_where(&self, predicate: impl Fn(&K) -> bool) -> usize {
        let mut guard = self.entries.write().await;
        let before = guard.len();
        guard.retain(|key, _| !predicate(key));
        before - guard.len()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of entries, stale ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
