//! Redis cache implementation

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client};

use crate::domain::cache::Cache;
use crate::domain::DomainError;

/// Configuration for Redis cache
#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Key prefix for namespacing
    pub key_prefix: Option<String>,
    /// Connection timeout
    pub connection_timeout: Duration,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: None,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisCacheConfig {
    /// Creates a new configuration with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Sets the connection timeout
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}

/// Opens a managed Redis connection bounded by the configured timeout
pub(crate) async fn connect(
    url: &str,
    timeout: Duration,
) -> Result<ConnectionManager, redis::RedisError> {
    let client = Client::open(url)?;
    let config = ConnectionManagerConfig::new()
        .set_connection_timeout(timeout)
        .set_response_timeout(timeout);

    ConnectionManager::new_with_config(client, config).await
}

/// Distributed cache backed by Redis
///
/// TTLs are enforced by Redis (`SET EX`), rounded up to whole seconds.
pub struct RedisCache {
    connection: ConnectionManager,
    config: RedisCacheConfig,
    closed: AtomicBool,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl RedisCache {
    /// Creates a new Redis cache connection
    pub async fn new(config: RedisCacheConfig) -> Result<Self, DomainError> {
        let connection = connect(&config.url, config.connection_timeout)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self {
            connection,
            config,
            closed: AtomicBool::new(false),
        })
    }

    fn prefix_key(&self, key: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    fn connection(&self) -> Result<ConnectionManager, DomainError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DomainError::cache("Cache is closed"));
        }
        Ok(self.connection.clone())
    }

    fn ttl_secs(ttl: Duration) -> u64 {
        let secs = ttl.as_secs().saturating_add(u64::from(ttl.subsec_nanos() > 0));
        secs.max(1)
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, DomainError> {
        let mut conn = self.connection()?;
        let mut cursor = 0u64;
        let mut found = Vec::new();

        loop {
            let (new_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(|e| DomainError::cache(format!("Failed to scan keys: {}", e)))?;

            found.extend(keys);
            cursor = new_cursor;

            if cursor == 0 {
                break;
            }
        }

        Ok(found)
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection()?;

        let result: Option<String> = conn
            .get(&prefixed_key)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to get key: {}", e)))?;

        Ok(result)
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection()?;

        let _: () = conn
            .set_ex(&prefixed_key, value, Self::ttl_secs(ttl))
            .await
            .map_err(|e| DomainError::cache(format!("Failed to set key: {}", e)))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection()?;

        let deleted: i32 = conn
            .del(&prefixed_key)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to delete key: {}", e)))?;

        Ok(deleted > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection()?;

        let exists: bool = conn
            .exists(&prefixed_key)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to check key existence: {}", e)))?;

        Ok(exists)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection()?;

        let ttl_secs: i64 = conn
            .ttl(&prefixed_key)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to get TTL: {}", e)))?;

        // Redis returns -2 if key doesn't exist, -1 if no TTL
        if ttl_secs < 0 {
            Ok(None)
        } else {
            Ok(Some(Duration::from_secs(ttl_secs as u64)))
        }
    }

    async fn clear(&self) -> Result<(), DomainError> {
        let mut conn = self.connection()?;

        match &self.config.key_prefix {
            Some(_) => {
                let keys = self.scan_keys(&self.prefix_key("*")).await?;

                if !keys.is_empty() {
                    let _: i64 = conn
                        .del(&keys)
                        .await
                        .map_err(|e| DomainError::cache(format!("Failed to delete keys: {}", e)))?;
                }
            }
            None => {
                redis::cmd("FLUSHDB")
                    .query_async::<()>(&mut conn)
                    .await
                    .map_err(|e| DomainError::cache(format!("Failed to flush database: {}", e)))?;
            }
        }

        Ok(())
    }

    async fn size(&self) -> Result<usize, DomainError> {
        match &self.config.key_prefix {
            Some(_) => Ok(self.scan_keys(&self.prefix_key("*")).await?.len()),
            None => {
                let mut conn = self.connection()?;
                let size: usize = redis::cmd("DBSIZE")
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| DomainError::cache(format!("Failed to get database size: {}", e)))?;
                Ok(size)
            }
        }
    }

    async fn close(&self) -> Result<(), DomainError> {
        // The manager's connection is dropped with the last clone
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::CacheExt;

    // Note: These tests require a running Redis instance
    // Run with: cargo test -- --ignored

    fn get_test_config() -> RedisCacheConfig {
        RedisCacheConfig::new("redis://127.0.0.1:6379").with_key_prefix("test")
    }

    #[test]
    fn test_ttl_secs_rounds_up() {
        assert_eq!(RedisCache::ttl_secs(Duration::from_millis(10)), 1);
        assert_eq!(RedisCache::ttl_secs(Duration::from_secs(2)), 2);
        assert_eq!(RedisCache::ttl_secs(Duration::from_millis(2500)), 3);
        assert_eq!(
            RedisCache::ttl_secs(Duration::new(u64::MAX, 1)),
            u64::MAX
        );
    }

    #[test]
    fn test_config_builder() {
        let config = RedisCacheConfig::new("redis://localhost")
            .with_key_prefix("myapp")
            .with_connection_timeout(Duration::from_secs(1));

        assert_eq!(config.key_prefix, Some("myapp".to_string()));
        assert_eq!(config.connection_timeout, Duration::from_secs(1));
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_set_and_get() {
        let cache = RedisCache::new(get_test_config()).await.unwrap();

        cache
            .set("key1", &"value1", Duration::from_secs(60))
            .await
            .unwrap();

        let result: Option<String> = cache.get("key1").await.unwrap();
        assert_eq!(result, Some("value1".to_string()));

        cache.delete("key1").await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_get_or_compute() {
        let cache = RedisCache::new(get_test_config()).await.unwrap();
        cache.delete("computed").await.unwrap();

        let value: u32 = cache
            .get_or_compute("computed", Duration::from_secs(60), || async { Ok(5) })
            .await
            .unwrap();
        assert_eq!(value, 5);

        let ttl = cache.ttl("computed").await.unwrap();
        assert!(ttl.unwrap().as_secs() > 50);

        cache.delete("computed").await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_close() {
        let cache = RedisCache::new(get_test_config()).await.unwrap();
        cache.close().await.unwrap();

        let result: Result<Option<String>, _> = cache.get("key1").await;
        assert!(result.unwrap_err().is_backend_unavailable());
    }
}
