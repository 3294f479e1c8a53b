//! Rate limiter implementations

mod factory;
mod in_memory;
mod noop;
mod redis;

pub use factory::{RateLimiterConfig, RateLimiterFactory, RateLimiterType};
pub use in_memory::InMemoryRateLimiter;
pub use noop::NoopRateLimiter;
pub use self::redis::{RedisRateLimiter, RedisRateLimiterConfig};
