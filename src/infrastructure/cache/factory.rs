//! Cache factory for runtime backend selection

use std::sync::Arc;

use crate::domain::cache::Cache;
use crate::domain::DomainError;

use super::in_memory::{InMemoryCache, InMemoryCacheConfig};
use super::redis::{RedisCache, RedisCacheConfig};

/// Supported cache backends
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CacheType {
    /// Process-local moka cache
    #[default]
    InMemory,
    /// Shared Redis cache
    Redis,
}

impl std::fmt::Display for CacheType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InMemory => write!(f, "in_memory"),
            Self::Redis => write!(f, "redis"),
        }
    }
}

impl std::str::FromStr for CacheType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in_memory" | "inmemory" | "memory" => Ok(Self::InMemory),
            "redis" => Ok(Self::Redis),
            _ => Err(DomainError::configuration(format!(
                "Unknown cache type: {}. Valid types: in_memory, redis",
                s
            ))),
        }
    }
}

/// Backend-specific cache configuration
#[derive(Debug, Clone)]
pub enum CacheConfig {
    InMemory(InMemoryCacheConfig),
    Redis(RedisCacheConfig),
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl CacheConfig {
    pub fn in_memory() -> Self {
        Self::InMemory(InMemoryCacheConfig::default())
    }

    pub fn redis(url: impl Into<String>) -> Self {
        Self::Redis(RedisCacheConfig::new(url))
    }

    pub fn cache_type(&self) -> CacheType {
        match self {
            Self::InMemory(_) => CacheType::InMemory,
            Self::Redis(_) => CacheType::Redis,
        }
    }
}

/// Factory for creating cache instances
#[derive(Debug)]
pub struct CacheFactory;

impl CacheFactory {
    /// Creates a cache based on the configuration, connecting if needed
    pub async fn create(config: &CacheConfig) -> Result<Arc<dyn Cache>, DomainError> {
        match config {
            CacheConfig::InMemory(config) => Ok(Arc::new(InMemoryCache::with_config(config.clone()))),
            CacheConfig::Redis(config) => Ok(Arc::new(RedisCache::new(config.clone()).await?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::CacheExt;
    use std::time::Duration;

    #[test]
    fn test_cache_type_from_str() {
        assert_eq!("in_memory".parse::<CacheType>().unwrap(), CacheType::InMemory);
        assert_eq!("memory".parse::<CacheType>().unwrap(), CacheType::InMemory);
        assert_eq!("REDIS".parse::<CacheType>().unwrap(), CacheType::Redis);
        assert!(matches!(
            "memcached".parse::<CacheType>(),
            Err(DomainError::Configuration { .. })
        ));
    }

    #[test]
    fn test_cache_type_display_parses_back() {
        for cache_type in [CacheType::InMemory, CacheType::Redis] {
            assert_eq!(cache_type.to_string().parse::<CacheType>().unwrap(), cache_type);
        }
    }

    #[test]
    fn test_config_reports_type() {
        assert_eq!(CacheConfig::default().cache_type(), CacheType::InMemory);
        assert_eq!(
            CacheConfig::redis("redis://localhost:6379").cache_type(),
            CacheType::Redis
        );
    }

    #[tokio::test]
    async fn test_factory_create_in_memory() {
        let config = CacheConfig::InMemory(InMemoryCacheConfig::default().with_max_capacity(100));
        let cache = CacheFactory::create(&config).await.unwrap();

        cache
            .set("code-lookup", &42u32, Duration::from_secs(60))
            .await
            .unwrap();

        let value: Option<u32> = cache.get("code-lookup").await.unwrap();
        assert_eq!(value, Some(42));

        cache.close().await.unwrap();
        let closed: Result<Option<u32>, _> = cache.get("code-lookup").await;
        assert!(closed.unwrap_err().is_backend_unavailable());
    }
}
