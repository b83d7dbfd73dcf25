//! Cache driver contract (§4.H): a capability seam the core consumes without
//! depending on any concrete backend, plus a default in-memory TTL-evicting
//! implementation.
//!
//! Grounded in the teacher's trait-object capability seams (`security::SecurityProvider`
//! in spirit) and the now-retired `middleware/memory.rs`'s entry-tracking style
//! (timestamped entries, lazy eviction on access rather than a background sweep).

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use serde_json::Value;

/// Async cache contract. Handlers and middleware depend on `&dyn CacheService`, never
/// on a concrete backend.
#[async_trait::async_trait]
pub trait CacheService: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;
    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>);
    async fn del(&self, key: &str);
    async fn has(&self, key: &str) -> bool;
    async fn clear(&self);
    /// Release any held resources (connections, background tasks). Default no-op.
    async fn close(&self) {}
}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// In-memory cache with per-entry TTL, evicted lazily on access (§4.H default
/// backend). Not shared across processes; intended for single-instance deployments
/// and tests.
#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self { entries: RwLock::new(HashMap::new()) }
    }
}

#[async_trait::async_trait]
impl CacheService for InMemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) {
        let expires_at = ttl.map(|d| Instant::now() + d);
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), Entry { value, expires_at });
    }

    async fn del(&self, key: &str) {
        self.entries.write().unwrap_or_else(|e| e.into_inner()).remove(key);
    }

    async fn has(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }

    async fn clear(&self) {
        self.entries.write().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let c = InMemoryCache::new();
        c.set("k", Value::String("v".to_string()), None).await;
        assert_eq!(c.get("k").await, Some(Value::String("v".to_string())));
    }

    #[tokio::test]
    async fn expired_entry_is_evicted_on_access() {
        let c = InMemoryCache::new();
        c.set("k", Value::Bool(true), Some(Duration::from_millis(1))).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(c.get("k").await, None);
        assert!(!c.has("k").await);
    }

    #[tokio::test]
    async fn del_and_clear() {
        let c = InMemoryCache::new();
        c.set("a", Value::Bool(true), None).await;
        c.set("b", Value::Bool(true), None).await;
        c.del("a").await;
        assert!(!c.has("a").await);
        assert!(c.has("b").await);
        c.clear().await;
        assert!(!c.has("b").await);
    }
}
