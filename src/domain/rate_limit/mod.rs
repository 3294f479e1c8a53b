//! Rate limit domain - Admission control abstraction

mod limiter;

pub use limiter::{RateLimitDecision, RateLimitPolicy, RateLimiter};

#[cfg(test)]
pub use limiter::MockRateLimiter;
