//! Rate limiter trait definition

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::automock;

use crate::domain::DomainError;

/// Number of requests a subject may make within one window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Maximum requests allowed per window
    pub requests_per_window: u32,
    /// Length of the accounting window
    #[serde(with = "window_secs")]
    pub window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            requests_per_window: 60,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitPolicy {
    pub fn new(requests_per_window: u32, window: Duration) -> Self {
        Self {
            requests_per_window,
            window,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.requests_per_window == 0 {
            return Err(DomainError::configuration(
                "Rate limit requests_per_window must be greater than zero",
            ));
        }

        if self.window.is_zero() {
            return Err(DomainError::configuration(
                "Rate limit window must be greater than zero",
            ));
        }

        Ok(())
    }
}

mod window_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(window: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(window.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

/// Outcome of an admission check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the action may proceed now
    pub allowed: bool,
    /// Total limit for the window
    pub limit: u32,
    /// Remaining requests in the current window
    pub remaining: u32,
    /// How long to wait before retrying (zero when allowed)
    pub retry_after: Duration,
}

impl RateLimitDecision {
    pub fn allow(limit: u32, remaining: u32) -> Self {
        Self {
            allowed: true,
            limit,
            remaining,
            retry_after: Duration::ZERO,
        }
    }

    pub fn deny(limit: u32, retry_after: Duration) -> Self {
        Self {
            allowed: false,
            limit,
            remaining: 0,
            retry_after,
        }
    }
}

/// Admission gate answering whether a subject may act now
///
/// A denied request is reported through the decision; an `Err` always means
/// the limiter itself could not answer. Fail-open or fail-closed on error is
/// the caller's choice.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Checks and records one request for the subject in a single atomic step
    async fn allow(&self, subject: &str) -> Result<RateLimitDecision, DomainError>;

    /// Clears all accounting for the subject
    async fn reset(&self, subject: &str) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_validation() {
        assert!(RateLimitPolicy::default().validate().is_ok());
        assert!(RateLimitPolicy::new(0, Duration::from_secs(1)).validate().is_err());
        assert!(RateLimitPolicy::new(1, Duration::ZERO).validate().is_err());
    }

    #[test]
    fn test_policy_window_serializes_as_seconds() {
        let policy = RateLimitPolicy::new(5, Duration::from_secs(30));
        let json = serde_json::to_string(&policy).unwrap();
        assert_eq!(json, r#"{"requests_per_window":5,"window":30}"#);

        let parsed: RateLimitPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, policy);
    }

    #[test]
    fn test_decisions() {
        let allowed = RateLimitDecision::allow(10, 9);
        assert!(allowed.allowed);
        assert_eq!(allowed.retry_after, Duration::ZERO);

        let denied = RateLimitDecision::deny(10, Duration::from_secs(5));
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
    }
}
