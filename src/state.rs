//! Application state for shared services

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::domain::api_key::ApiKeyLookup;
use crate::domain::cache::{Cache, KeyDeriver};
use crate::domain::pin::CodeStore;
use crate::domain::rate_limit::RateLimiter;
use crate::domain::DomainError;
use crate::infrastructure::services::{CachedApiKeyLookup, IssuanceService};

/// Process-wide services built once from configuration
#[derive(Clone)]
pub struct AppState {
    pub issuance_service: Arc<IssuanceService>,
    pub code_store: Arc<dyn CodeStore>,
    pub cache: Arc<dyn Cache>,
    pub key_deriver: Arc<dyn KeyDeriver>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub api_key_ttl: Duration,
}

impl AppState {
    /// Create new application state with provided services
    pub fn new(
        issuance_service: Arc<IssuanceService>,
        code_store: Arc<dyn CodeStore>,
        cache: Arc<dyn Cache>,
        key_deriver: Arc<dyn KeyDeriver>,
        rate_limiter: Arc<dyn RateLimiter>,
        api_key_ttl: Duration,
    ) -> Self {
        Self {
            issuance_service,
            code_store,
            cache,
            key_deriver,
            rate_limiter,
            api_key_ttl,
        }
    }

    /// Puts an API key lookup behind the shared cache
    pub fn cached_api_key_lookup(&self, lookup: Arc<dyn ApiKeyLookup>) -> CachedApiKeyLookup {
        CachedApiKeyLookup::new(
            lookup,
            self.cache.clone(),
            self.key_deriver.clone(),
            self.api_key_ttl,
        )
    }

    /// Releases backend resources held by the cache
    pub async fn shutdown(&self) -> Result<(), DomainError> {
        self.cache.close().await?;
        info!("Application state shut down");
        Ok(())
    }
}
