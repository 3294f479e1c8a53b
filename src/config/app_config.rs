use std::time::Duration;

use serde::Deserialize;

use crate::domain::rate_limit::RateLimitPolicy;
use crate::domain::DomainError;
use crate::infrastructure::cache::{CacheConfig, CacheType, InMemoryCacheConfig, RedisCacheConfig};
use crate::infrastructure::pin::{
    CodeGenerator, CodeStoreConfig, CodeStoreType, PostgresCodeStore, PostgresConfig,
    NUMERIC_CHARSET,
};
use crate::infrastructure::rate_limit::{RateLimiterConfig, RateLimiterType};
use crate::infrastructure::services::IssuanceConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub codes: CodeSettings,
    pub storage: StorageSettings,
    pub cache: CacheSettings,
    pub rate_limit: RateLimitSettings,
    pub key_deriver: KeyDeriverSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Code generation and lifetime settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CodeSettings {
    pub length: usize,
    pub charset: String,
    pub default_duration_secs: u64,
    pub max_duration_secs: u64,
    pub max_generation_attempts: u32,
}

impl Default for CodeSettings {
    fn default() -> Self {
        Self {
            length: 8,
            charset: NUMERIC_CHARSET.to_string(),
            default_duration_secs: 3600,
            max_duration_secs: 24 * 3600,
            max_generation_attempts: 10,
        }
    }
}

impl CodeSettings {
    pub fn generator(&self) -> Result<CodeGenerator, DomainError> {
        CodeGenerator::new(self.length, &self.charset)
    }

    pub fn issuance_config(&self) -> IssuanceConfig {
        IssuanceConfig::default()
            .with_default_duration(Duration::from_secs(self.default_duration_secs))
            .with_max_duration(Duration::from_secs(self.max_duration_secs))
            .with_max_generation_attempts(self.max_generation_attempts)
    }
}

/// Code store settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// `in_memory` or `postgres`
    pub backend: String,
    pub postgres_url: Option<String>,
    pub table_name: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        let postgres = PostgresConfig::default();

        Self {
            backend: CodeStoreType::InMemory.to_string(),
            postgres_url: None,
            table_name: PostgresCodeStore::DEFAULT_TABLE.to_string(),
            max_connections: postgres.max_connections,
            min_connections: postgres.min_connections,
            connect_timeout_secs: postgres.connect_timeout_secs,
            idle_timeout_secs: postgres.idle_timeout_secs,
        }
    }
}

impl StorageSettings {
    pub fn code_store_config(&self) -> Result<CodeStoreConfig, DomainError> {
        match self.backend.parse::<CodeStoreType>()? {
            CodeStoreType::InMemory => Ok(CodeStoreConfig::in_memory()),
            CodeStoreType::Postgres => {
                let url = self.postgres_url.clone().ok_or_else(|| {
                    DomainError::configuration("storage.postgres_url is required for postgres")
                })?;

                let config = PostgresConfig::new(url)
                    .with_max_connections(self.max_connections)
                    .with_min_connections(self.min_connections)
                    .with_connect_timeout(self.connect_timeout_secs)
                    .with_idle_timeout(self.idle_timeout_secs);

                Ok(CodeStoreConfig::Postgres {
                    config,
                    table_name: self.table_name.clone(),
                })
            }
        }
    }
}

/// Cache settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// `in_memory` or `redis`
    #[serde(rename = "type")]
    pub cache_type: String,
    pub redis_url: Option<String>,
    pub key_prefix: Option<String>,
    pub max_capacity: u64,
    pub connection_timeout_secs: u64,
    /// How long API key lookups stay memoized
    pub api_key_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            cache_type: CacheType::InMemory.to_string(),
            redis_url: None,
            key_prefix: None,
            max_capacity: 10_000,
            connection_timeout_secs: 5,
            api_key_ttl_secs: 300,
        }
    }
}

impl CacheSettings {
    pub fn cache_config(&self) -> Result<CacheConfig, DomainError> {
        match self.cache_type.parse::<CacheType>()? {
            CacheType::InMemory => Ok(CacheConfig::InMemory(
                InMemoryCacheConfig::default().with_max_capacity(self.max_capacity),
            )),
            CacheType::Redis => {
                let url = self.redis_url.clone().ok_or_else(|| {
                    DomainError::configuration("cache.redis_url is required for redis")
                })?;

                let mut config = RedisCacheConfig::new(url)
                    .with_connection_timeout(Duration::from_secs(self.connection_timeout_secs));

                if let Some(prefix) = &self.key_prefix {
                    config = config.with_key_prefix(prefix.clone());
                }

                Ok(CacheConfig::Redis(config))
            }
        }
    }

    pub fn api_key_ttl(&self) -> Duration {
        Duration::from_secs(self.api_key_ttl_secs)
    }
}

/// Rate limiter settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// `noop`, `in_memory` or `redis`
    #[serde(rename = "type")]
    pub limiter_type: String,
    pub requests_per_window: u32,
    pub window_secs: u64,
    pub redis_url: Option<String>,
    pub key_prefix: String,
    pub connection_timeout_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        let policy = RateLimitPolicy::default();

        Self {
            limiter_type: RateLimiterType::InMemory.to_string(),
            requests_per_window: policy.requests_per_window,
            window_secs: policy.window.as_secs(),
            redis_url: None,
            key_prefix: "ratelimit".to_string(),
            connection_timeout_secs: 5,
        }
    }
}

impl RateLimitSettings {
    pub fn rate_limiter_config(&self) -> Result<RateLimiterConfig, DomainError> {
        let policy = RateLimitPolicy::new(
            self.requests_per_window,
            Duration::from_secs(self.window_secs),
        );

        let mut config = match self.limiter_type.parse::<RateLimiterType>()? {
            RateLimiterType::Noop => RateLimiterConfig::noop(),
            RateLimiterType::InMemory => RateLimiterConfig::in_memory(policy),
            RateLimiterType::Redis => {
                let url = self.redis_url.clone().ok_or_else(|| {
                    DomainError::configuration("rate_limit.redis_url is required for redis")
                })?;
                RateLimiterConfig::redis(url, policy)
            }
        };

        config = config.with_key_prefix(self.key_prefix.clone());
        config.connection_timeout = Duration::from_secs(self.connection_timeout_secs);

        Ok(config)
    }
}

/// Cache key derivation settings
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct KeyDeriverSettings {
    /// HMAC secret; an ephemeral one is generated when unset
    pub hmac_key: Option<String>,
}

impl std::fmt::Debug for KeyDeriverSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyDeriverSettings")
            .field("hmac_key", &self.hmac_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_build_backend_configs() {
        let config = AppConfig::default();

        assert_eq!(
            config.storage.code_store_config().unwrap().store_type(),
            CodeStoreType::InMemory
        );
        assert_eq!(config.cache.cache_config().unwrap().cache_type(), CacheType::InMemory);
        assert_eq!(
            config.rate_limit.rate_limiter_config().unwrap().limiter_type,
            RateLimiterType::InMemory
        );
        assert_eq!(config.codes.generator().unwrap().length(), 8);
        assert!(config.codes.issuance_config().validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial_sections() {
        let json = r#"{
            "logging": { "format": "json" },
            "codes": { "length": 6, "default_duration_secs": 120 },
            "cache": { "type": "redis", "redis_url": "redis://cache:6379", "key_prefix": "vc" },
            "rate_limit": { "type": "noop" }
        }"#;

        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert!(matches!(config.logging.format, LogFormat::Json));
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.codes.length, 6);
        assert_eq!(config.codes.max_duration_secs, 24 * 3600);
        assert_eq!(
            config.codes.issuance_config().default_duration,
            Duration::from_secs(120)
        );

        match config.cache.cache_config().unwrap() {
            CacheConfig::Redis(redis) => {
                assert_eq!(redis.url, "redis://cache:6379");
                assert_eq!(redis.key_prefix, Some("vc".to_string()));
            }
            other => panic!("expected redis config, got {:?}", other),
        }

        assert_eq!(
            config.rate_limit.rate_limiter_config().unwrap().limiter_type,
            RateLimiterType::Noop
        );
    }

    #[test]
    fn test_postgres_requires_url() {
        let storage = StorageSettings {
            backend: "postgres".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            storage.code_store_config(),
            Err(DomainError::Configuration { .. })
        ));

        let storage = StorageSettings {
            backend: "postgres".to_string(),
            postgres_url: Some("postgres://db/codes".to_string()),
            ..Default::default()
        };
        assert_eq!(
            storage.code_store_config().unwrap().store_type(),
            CodeStoreType::Postgres
        );
    }

    #[test]
    fn test_redis_limiter_requires_url() {
        let settings = RateLimitSettings {
            limiter_type: "redis".to_string(),
            ..Default::default()
        };
        assert!(settings.rate_limiter_config().is_err());
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let cache = CacheSettings {
            cache_type: "memcached".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            cache.cache_config(),
            Err(DomainError::Configuration { .. })
        ));
    }

    #[test]
    fn test_key_deriver_debug_redacts_secret() {
        let settings = KeyDeriverSettings {
            hmac_key: Some("super-secret".to_string()),
        };
        assert!(!format!("{:?}", settings).contains("super-secret"));
    }
}
