//! Rate limiter factory for runtime selection

use std::sync::Arc;
use std::time::Duration;

use crate::domain::rate_limit::{RateLimitPolicy, RateLimiter};
use crate::domain::DomainError;

use super::in_memory::InMemoryRateLimiter;
use super::noop::NoopRateLimiter;
use super::redis::{RedisRateLimiter, RedisRateLimiterConfig};

/// Supported rate limiter backends
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RateLimiterType {
    /// Admits every request
    Noop,
    /// Per-process sliding window
    #[default]
    InMemory,
    /// Shared fixed window in Redis
    Redis,
}

impl std::fmt::Display for RateLimiterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateLimiterType::Noop => write!(f, "noop"),
            RateLimiterType::InMemory => write!(f, "in_memory"),
            RateLimiterType::Redis => write!(f, "redis"),
        }
    }
}

impl std::str::FromStr for RateLimiterType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "noop" | "none" => Ok(RateLimiterType::Noop),
            "in_memory" | "inmemory" | "memory" => Ok(RateLimiterType::InMemory),
            "redis" => Ok(RateLimiterType::Redis),
            _ => Err(DomainError::configuration(format!(
                "Unknown rate limiter type: {}. Valid types: noop, in_memory, redis",
                s
            ))),
        }
    }
}

/// Configuration for the rate limiter factory
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    pub limiter_type: RateLimiterType,
    pub policy: RateLimitPolicy,
    /// Redis URL (required for Redis type)
    pub redis_url: Option<String>,
    /// Key prefix for window counters (Redis only)
    pub key_prefix: String,
    /// Connection timeout (Redis only)
    pub connection_timeout: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            limiter_type: RateLimiterType::InMemory,
            policy: RateLimitPolicy::default(),
            redis_url: None,
            key_prefix: "ratelimit".to_string(),
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl RateLimiterConfig {
    pub fn noop() -> Self {
        Self {
            limiter_type: RateLimiterType::Noop,
            ..Default::default()
        }
    }

    pub fn in_memory(policy: RateLimitPolicy) -> Self {
        Self {
            limiter_type: RateLimiterType::InMemory,
            policy,
            ..Default::default()
        }
    }

    pub fn redis(url: impl Into<String>, policy: RateLimitPolicy) -> Self {
        Self {
            limiter_type: RateLimiterType::Redis,
            policy,
            redis_url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }
}

/// Factory for creating rate limiter instances
#[derive(Debug, Default)]
pub struct RateLimiterFactory;

impl RateLimiterFactory {
    pub fn new() -> Self {
        Self
    }

    /// Creates a rate limiter based on configuration
    pub async fn create(
        &self,
        config: &RateLimiterConfig,
    ) -> Result<Arc<dyn RateLimiter>, DomainError> {
        match config.limiter_type {
            RateLimiterType::Noop => Ok(Arc::new(NoopRateLimiter::new())),
            RateLimiterType::InMemory => Ok(Arc::new(InMemoryRateLimiter::new(config.policy)?)),
            RateLimiterType::Redis => {
                let url = config.redis_url.clone().ok_or_else(|| {
                    DomainError::configuration("Redis URL is required for Redis rate limiter")
                })?;

                let redis_config = RedisRateLimiterConfig::new(url)
                    .with_key_prefix(config.key_prefix.clone())
                    .with_connection_timeout(config.connection_timeout);

                let limiter = RedisRateLimiter::new(config.policy, redis_config).await?;
                Ok(Arc::new(limiter))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limiter_type_from_str() {
        assert_eq!("noop".parse::<RateLimiterType>().unwrap(), RateLimiterType::Noop);
        assert_eq!("memory".parse::<RateLimiterType>().unwrap(), RateLimiterType::InMemory);
        assert_eq!("IN_MEMORY".parse::<RateLimiterType>().unwrap(), RateLimiterType::InMemory);
        assert_eq!("redis".parse::<RateLimiterType>().unwrap(), RateLimiterType::Redis);
        assert!(matches!(
            "leaky".parse::<RateLimiterType>(),
            Err(DomainError::Configuration { .. })
        ));
    }

    #[test]
    fn test_limiter_type_display_parses_back() {
        for limiter_type in [
            RateLimiterType::Noop,
            RateLimiterType::InMemory,
            RateLimiterType::Redis,
        ] {
            assert_eq!(
                limiter_type.to_string().parse::<RateLimiterType>().unwrap(),
                limiter_type
            );
        }
    }

    #[tokio::test]
    async fn test_factory_create_in_memory() {
        let config = RateLimiterConfig::in_memory(RateLimitPolicy::new(1, Duration::from_secs(60)));
        let limiter = RateLimiterFactory::new().create(&config).await.unwrap();

        assert!(limiter.allow("a").await.unwrap().allowed);
        assert!(!limiter.allow("a").await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_factory_create_noop() {
        let limiter = RateLimiterFactory::new()
            .create(&RateLimiterConfig::noop())
            .await
            .unwrap();

        assert!(limiter.allow("a").await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_factory_rejects_invalid_policy() {
        let config = RateLimiterConfig::in_memory(RateLimitPolicy::new(0, Duration::from_secs(60)));

        let result = RateLimiterFactory::new().create(&config).await;
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_factory_redis_missing_url() {
        let config = RateLimiterConfig {
            limiter_type: RateLimiterType::Redis,
            ..Default::default()
        };

        let result = RateLimiterFactory::new().create(&config).await;
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }
}
