//! In-memory sliding window rate limiter

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::domain::rate_limit::{RateLimitDecision, RateLimitPolicy, RateLimiter};
use crate::domain::DomainError;

/// Sliding window rate limiter keeping a timestamp log per subject
///
/// The check and the record happen under one write lock, so concurrent calls
/// can never both take the last remaining slot.
#[derive(Debug)]
pub struct InMemoryRateLimiter {
    policy: RateLimitPolicy,
    /// Per-subject request timestamps inside the current window
    records: RwLock<HashMap<String, Vec<Instant>>>,
    /// Cleanup interval
    cleanup_interval: Duration,
    /// Last cleanup time
    last_cleanup: Mutex<Instant>,
}

impl InMemoryRateLimiter {
    /// Create a new rate limiter enforcing the given policy
    pub fn new(policy: RateLimitPolicy) -> Result<Self, DomainError> {
        policy.validate()?;

        Ok(Self {
            policy,
            records: RwLock::new(HashMap::new()),
            cleanup_interval: Duration::from_secs(300),
            last_cleanup: Mutex::new(Instant::now()),
        })
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Number of subjects currently tracked
    pub async fn tracked_subjects(&self) -> usize {
        self.records.read().await.len()
    }

    fn window_start(&self, now: Instant) -> Instant {
        now.checked_sub(self.policy.window).unwrap_or(now)
    }

    async fn maybe_cleanup(&self) {
        let mut last = self.last_cleanup.lock().await;

        if last.elapsed() < self.cleanup_interval {
            return;
        }

        *last = Instant::now();
        let cutoff = self.window_start(*last);

        let mut records = self.records.write().await;

        for timestamps in records.values_mut() {
            timestamps.retain(|t| *t > cutoff);
        }

        records.retain(|_, v| !v.is_empty());
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn allow(&self, subject: &str) -> Result<RateLimitDecision, DomainError> {
        self.maybe_cleanup().await;

        let limit = self.policy.requests_per_window;
        let now = Instant::now();
        let window_start = self.window_start(now);

        let mut records = self.records.write().await;
        let timestamps = records.entry(subject.to_string()).or_default();
        timestamps.retain(|t| *t > window_start);

        if timestamps.len() as u32 >= limit {
            // Timestamps are appended in order; the first one leaves the window next
            let retry_after = timestamps
                .first()
                .map(|oldest| self.policy.window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(self.policy.window);

            return Ok(RateLimitDecision::deny(limit, retry_after));
        }

        timestamps.push(now);
        let remaining = limit - timestamps.len() as u32;

        Ok(RateLimitDecision::allow(limit, remaining))
    }

    async fn reset(&self, subject: &str) -> Result<(), DomainError> {
        self.records.write().await.remove(subject);
        Ok(())
    }
}
