//! PMP Verification Codes
//!
//! Issuance and single-use claiming of verification codes, with:
//! - Pluggable code stores (in-memory, PostgreSQL)
//! - A shared cache with HMAC-derived keys (moka, Redis)
//! - Per-actor rate limiting (noop, in-memory, Redis)

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod state;

pub use config::AppConfig;
pub use state::AppState;

use std::sync::Arc;

use rand::Rng;
use tracing::{info, warn};

use domain::cache::KeyDeriver;
use infrastructure::{
    cache::{CacheFactory, HmacKeyDeriver},
    pin::CodeStoreFactory,
    rate_limit::RateLimiterFactory,
    services::IssuanceService,
};

/// Create the application state with default configuration
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let store_config = config.storage.code_store_config()?;
    info!("Code store backend: {}", store_config.store_type());
    let code_store = CodeStoreFactory::create(&store_config).await?;

    let cache_config = config.cache.cache_config()?;
    info!("Cache backend: {}", cache_config.cache_type());
    let cache = CacheFactory::create(&cache_config).await?;

    let limiter_config = config.rate_limit.rate_limiter_config()?;
    info!(
        "Rate limiter backend: {} ({} requests per {}s)",
        limiter_config.limiter_type,
        limiter_config.policy.requests_per_window,
        limiter_config.policy.window.as_secs()
    );
    let rate_limiter = RateLimiterFactory::new().create(&limiter_config).await?;

    let key_deriver = create_key_deriver(config.key_deriver.hmac_key.as_deref())?;

    let issuance_service = IssuanceService::new(
        code_store.clone(),
        rate_limiter.clone(),
        config.codes.generator()?,
        config.codes.issuance_config(),
    )?;

    Ok(AppState::new(
        Arc::new(issuance_service),
        code_store,
        cache,
        key_deriver,
        rate_limiter,
        config.cache.api_key_ttl(),
    ))
}

/// Create the key deriver from the configured secret, or a random one
pub fn create_key_deriver(hmac_key: Option<&str>) -> anyhow::Result<Arc<dyn KeyDeriver>> {
    let secret = match hmac_key {
        Some(key) => key.to_string(),
        None => {
            warn!(
                "No key_deriver.hmac_key configured. Generating random secret. \
                Derived cache keys will NOT be stable across restarts or instances."
            );
            generate_random_secret()
        }
    };

    Ok(Arc::new(HmacKeyDeriver::new(secret.as_bytes())?))
}

/// Generate a random HMAC secret
fn generate_random_secret() -> String {
    use rand::distributions::Alphanumeric;

    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}
