//! In-memory cache implementation - used when Redis is not configured.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use postboard_core::ports::{Cache, CacheError};

struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }
}

/// Process-local cache keyed by string, with per-entry TTL.
///
/// Expired entries are dropped lazily on read and swept on every write, so the
/// map never holds more than the keys written within one TTL.
/// Data is lost on process restart.
pub struct InMemoryCache {
    store: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.store.read().await.len()
    }
}

fn purge_expired(store: &mut HashMap<String, CacheEntry>, now: Instant) -> usize {
    let before = store.len();
    store.retain(|_, entry| !entry.is_expired(now));
    before - store.len()
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        {
            let store = self.store.read().await;
            let entry = store.get(key)?;
            if !entry.is_expired(now) {
                return Some(entry.value.clone());
            }
        }

        let mut store = self.store.write().await;
        if store.get(key).is_some_and(|entry| entry.is_expired(now)) {
            store.remove(key);
        }
        None
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let now = Instant::now();
        let expires_at = ttl.map(|d| now + d);

        let mut store = self.store.write().await;
        let purged = purge_expired(&mut store, now);
        if purged > 0 {
            tracing::trace!(purged, "Evicted expired cache entries");
        }
        store.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at,
            },
        );

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.store.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = InMemoryCache::new();
        cache.set("index_page:1", "body", None).await.unwrap();
        assert_eq!(cache.get("index_page:1").await, Some("body".to_string()));
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = InMemoryCache::new();
        cache.set("index_page:1", "body", None).await.unwrap();
        cache.delete("index_page:1").await.unwrap();
        assert_eq!(cache.get("index_page:1").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = InMemoryCache::new();
        cache
            .set("index_page:1", "body", Some(Duration::from_secs(20)))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(19)).await;
        assert!(cache.get("index_page:1").await.is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get("index_page:1").await, None);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_evicts_expired_entries() {
        let cache = InMemoryCache::new();
        let ttl = Some(Duration::from_secs(20));
        for page in 1..=50 {
            cache
                .set(&format!("index_page:{page}"), "body", ttl)
                .await
                .unwrap();
        }
        cache.set("forever", "b", None).await.unwrap();
        assert_eq!(cache.len().await, 51);

        // Expired keys are never read again; the next write sweeps them.
        tokio::time::advance(Duration::from_secs(21)).await;
        cache.set("index_page:1", "fresh", ttl).await.unwrap();

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get("forever").await, Some("b".to_string()));
        assert_eq!(cache.get("index_page:1").await, Some("fresh".to_string()));
    }
}
