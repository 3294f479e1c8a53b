//! Rate limiter that admits everything

use async_trait::async_trait;

use crate::domain::rate_limit::{RateLimitDecision, RateLimiter};
use crate::domain::DomainError;

/// Always-allow limiter for tests and local development
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRateLimiter;

impl NoopRateLimiter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RateLimiter for NoopRateLimiter {
    async fn allow(&self, _subject: &str) -> Result<RateLimitDecision, DomainError> {
        Ok(RateLimitDecision::allow(u32::MAX, u32::MAX))
    }

    async fn reset(&self, _subject: &str) -> Result<(), DomainError> {
        Ok(())
    }
}
