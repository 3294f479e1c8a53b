//! Redis fixed window rate limiter

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

use crate::domain::rate_limit::{RateLimitDecision, RateLimitPolicy, RateLimiter};
use crate::domain::DomainError;
use crate::infrastructure::cache::connect_redis;

// Increments the window counter, arms the expiry on the first hit and
// returns the counter with the remaining window in milliseconds.
const FIXED_WINDOW_SCRIPT: &str = r#"
local current = redis.call('INCR', KEYS[1])
if current == 1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
local ttl = redis.call('PTTL', KEYS[1])
if ttl < 0 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
    ttl = tonumber(ARGV[1])
end
return {current, ttl}
"#;

/// Configuration for the Redis rate limiter
#[derive(Debug, Clone)]
pub struct RedisRateLimiterConfig {
    pub url: String,
    pub key_prefix: String,
    pub connection_timeout: Duration,
}

impl Default for RedisRateLimiterConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "ratelimit".to_string(),
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisRateLimiterConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}

/// Fixed window limiter shared across processes through Redis
///
/// The counter update runs as a single Lua script, so concurrent callers in
/// different processes see a consistent count.
pub struct RedisRateLimiter {
    connection: ConnectionManager,
    script: Script,
    policy: RateLimitPolicy,
    config: RedisRateLimiterConfig,
}

impl fmt::Debug for RedisRateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisRateLimiter")
            .field("policy", &self.policy)
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisRateLimiter {
    pub async fn new(
        policy: RateLimitPolicy,
        config: RedisRateLimiterConfig,
    ) -> Result<Self, DomainError> {
        policy.validate()?;

        let connection = connect_redis(&config.url, config.connection_timeout)
            .await
            .map_err(|e| DomainError::rate_limiter(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self {
            connection,
            script: Script::new(FIXED_WINDOW_SCRIPT),
            policy,
            config,
        })
    }

    fn window_key(&self, subject: &str) -> String {
        format!("{}:{}", self.config.key_prefix, subject)
    }
}

/// Window length as `PEXPIRE` milliseconds, at least one
fn window_millis(window: Duration) -> u64 {
    u64::try_from(window.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// Turns a raw counter and remaining window into a decision
fn decide(limit: u32, count: i64, ttl_ms: i64) -> RateLimitDecision {
    if count <= i64::from(limit) {
        let remaining = (i64::from(limit) - count).max(0) as u32;
        RateLimitDecision::allow(limit, remaining)
    } else {
        RateLimitDecision::deny(limit, Duration::from_millis(ttl_ms.max(0) as u64))
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn allow(&self, subject: &str) -> Result<RateLimitDecision, DomainError> {
        let mut conn = self.connection.clone();

        let (count, ttl_ms): (i64, i64) = self
            .script
            .key(self.window_key(subject))
            .arg(window_millis(self.policy.window))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| DomainError::rate_limiter(format!("Failed to evaluate limit: {}", e)))?;

        Ok(decide(self.policy.requests_per_window, count, ttl_ms))
    }

    async fn reset(&self, subject: &str) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();

        let _: i64 = conn
            .del(self.window_key(subject))
            .await
            .map_err(|e| DomainError::rate_limiter(format!("Failed to reset limit: {}", e)))?;

        Ok(())
    }
}
