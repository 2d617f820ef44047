//! Time-bounded cache for rendered page fragments.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::ports::Cache;

/// Key of the cached index page body.
pub const INDEX_PAGE_FRAGMENT: &str = "index_page";

/// Caches rendered output by fragment name.
///
/// Entries are only dropped by TTL or an explicit `invalidate`; writes to the
/// underlying data do not evict them, so a cached page may lag behind new
/// posts for up to `ttl`.
#[derive(Clone)]
pub struct FragmentCache {
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl FragmentCache {
    pub fn new(cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// Key for a fragment that varies on extra values (such as page number).
    pub fn key(name: &str, vary_on: &[&str]) -> String {
        if vary_on.is_empty() {
            name.to_string()
        } else {
            format!("{}:{}", name, vary_on.join(":"))
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.cache.get(key).await
    }

    pub async fn invalidate(&self, key: &str) {
        if let Err(e) = self.cache.delete(key).await {
            tracing::warn!(key = %key, error = %e, "Fragment invalidation failed");
        }
    }

    /// Return the cached fragment or render, store and return it.
    /// Cache failures fall back to the freshly rendered value.
    pub async fn get_or_render<F, Fut, E>(&self, key: &str, render: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        if let Some(hit) = self.cache.get(key).await {
            tracing::debug!(key = %key, "Fragment cache hit");
            return Ok(hit);
        }

        let rendered = render().await?;
        if let Err(e) = self.cache.set(key, &rendered, Some(self.ttl)).await {
            tracing::warn!(key = %key, error = %e, "Fragment cache store failed");
        }
        Ok(rendered)
    }
}
