//! Cached API key lookups

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::api_key::{ApiKeyLookup, AuthorizedApp};
use crate::domain::cache::{Cache, CacheExt, KeyDeriver};
use crate::domain::DomainError;

const NAMESPACE: &str = "apikey";

// A bare `None` would serialize to `null` and read back as a miss
#[derive(Debug, Serialize, Deserialize)]
struct CachedLookup {
    app: Option<AuthorizedApp>,
}

/// Memoizes an expensive [`ApiKeyLookup`] in the shared cache
///
/// Raw API keys never reach the cache: entries are stored under the derived
/// key. Unknown keys are memoized too, so a freshly created key may take up
/// to one TTL to become visible unless [`invalidate`](Self::invalidate) is
/// called.
pub struct CachedApiKeyLookup {
    inner: Arc<dyn ApiKeyLookup>,
    cache: Arc<dyn Cache>,
    key_deriver: Arc<dyn KeyDeriver>,
    ttl: Duration,
}

impl std::fmt::Debug for CachedApiKeyLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedApiKeyLookup")
            .field("cache", &self.cache)
            .field("key_deriver", &self.key_deriver)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl CachedApiKeyLookup {
    pub fn new(
        inner: Arc<dyn ApiKeyLookup>,
        cache: Arc<dyn Cache>,
        key_deriver: Arc<dyn KeyDeriver>,
        ttl: Duration,
    ) -> Self {
        Self {
            inner,
            cache,
            key_deriver,
            ttl,
        }
    }

    fn cache_key(&self, api_key: &str) -> String {
        self.key_deriver.derive_with_namespace(NAMESPACE, api_key)
    }

    /// Drops the memoized result for an API key
    pub async fn invalidate(&self, api_key: &str) -> Result<bool, DomainError> {
        self.cache.delete(&self.cache_key(api_key)).await
    }
}

#[async_trait]
impl ApiKeyLookup for CachedApiKeyLookup {
    async fn find_by_api_key(&self, api_key: &str) -> Result<Option<AuthorizedApp>, DomainError> {
        let key = self.cache_key(api_key);
        let key_prefix = &key[..key.len().min(NAMESPACE.len() + 9)];

        debug!(cache_key = %key_prefix, "Resolving API key");

        let inner = &self.inner;
        let cached = self
            .cache
            .get_or_compute(&key, self.ttl, move || async move {
                debug!(cache_key = %key_prefix, "API key cache miss");
                let app = inner.find_by_api_key(api_key).await?;
                Ok(CachedLookup { app })
            })
            .await?;

        Ok(cached.app)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::api_key::{ApiKeyType, MockApiKeyLookup};
    use crate::domain::cache::MockCache;
    use crate::infrastructure::cache::{HmacKeyDeriver, InMemoryCache};

    fn deriver() -> Arc<dyn KeyDeriver> {
        Arc::new(HmacKeyDeriver::new(b"test-hmac-key").unwrap())
    }

    fn app() -> AuthorizedApp {
        AuthorizedApp::new("realm-1", "Health Authority", ApiKeyType::Admin)
    }

    #[tokio::test]
    async fn test_lookup_is_memoized() {
        let mut inner = MockApiKeyLookup::new();
        inner
            .expect_find_by_api_key()
            .withf(|key| key == "secret-api-key")
            .times(1)
            .returning(|_| Ok(Some(app())));

        let lookup = CachedApiKeyLookup::new(
            Arc::new(inner),
            Arc::new(InMemoryCache::new()),
            deriver(),
            Duration::from_secs(60),
        );

        assert_eq!(lookup.find_by_api_key("secret-api-key").await.unwrap(), Some(app()));
        assert_eq!(lookup.find_by_api_key("secret-api-key").await.unwrap(), Some(app()));
    }

    #[tokio::test]
    async fn test_cache_keys_do_not_contain_api_key() {
        let mut inner = MockApiKeyLookup::new();
        inner
            .expect_find_by_api_key()
            .returning(|_| Ok(Some(app())));

        let cache = Arc::new(MockCache::new());
        let lookup = CachedApiKeyLookup::new(
            Arc::new(inner),
            cache.clone(),
            deriver(),
            Duration::from_secs(60),
        );

        lookup.find_by_api_key("secret-api-key").await.unwrap();

        let keys = cache.keys();
        assert_eq!(keys.len(), 1);
        assert!(keys[0].starts_with("apikey:"));
        assert!(!keys[0].contains("secret-api-key"));
    }

    #[tokio::test]
    async fn test_unknown_keys_are_memoized() {
        let mut inner = MockApiKeyLookup::new();
        inner
            .expect_find_by_api_key()
            .times(1)
            .returning(|_| Ok(None));

        let lookup = CachedApiKeyLookup::new(
            Arc::new(inner),
            Arc::new(InMemoryCache::new()),
            deriver(),
            Duration::from_secs(60),
        );

        assert_eq!(lookup.find_by_api_key("unknown").await.unwrap(), None);
        assert_eq!(lookup.find_by_api_key("unknown").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_lookup_errors_are_not_cached() {
        let mut inner = MockApiKeyLookup::new();
        let mut calls = 0;
        inner
            .expect_find_by_api_key()
            .times(2)
            .returning(move |_| {
                calls += 1;
                if calls == 1 {
                    Err(DomainError::storage("database unavailable"))
                } else {
                    Ok(Some(app()))
                }
            });

        let lookup = CachedApiKeyLookup::new(
            Arc::new(inner),
            Arc::new(InMemoryCache::new()),
            deriver(),
            Duration::from_secs(60),
        );

        assert!(lookup.find_by_api_key("key").await.is_err());
        assert_eq!(lookup.find_by_api_key("key").await.unwrap(), Some(app()));
    }

    #[tokio::test]
    async fn test_invalidate_forces_fresh_lookup() {
        let mut inner = MockApiKeyLookup::new();
        inner
            .expect_find_by_api_key()
            .times(2)
            .returning(|_| Ok(Some(app())));

        let lookup = CachedApiKeyLookup::new(
            Arc::new(inner),
            Arc::new(InMemoryCache::new()),
            deriver(),
            Duration::from_secs(60),
        );

        lookup.find_by_api_key("key").await.unwrap();
        assert!(lookup.invalidate("key").await.unwrap());
        lookup.find_by_api_key("key").await.unwrap();
    }

    #[tokio::test]
    async fn test_cache_failure_is_surfaced() {
        let lookup = CachedApiKeyLookup::new(
            Arc::new(MockApiKeyLookup::new()),
            Arc::new(MockCache::new().with_error("connection reset")),
            deriver(),
            Duration::from_secs(60),
        );

        let result = lookup.find_by_api_key("key").await;
        assert!(result.unwrap_err().is_backend_unavailable());
    }
}
