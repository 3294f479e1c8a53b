//! Domain layer - Core business logic and entities

pub mod api_key;
pub mod cache;
pub mod error;
pub mod pin;
pub mod rate_limit;

pub use api_key::{ApiKeyLookup, ApiKeyType, AuthorizedApp};
pub use cache::{Cache, CacheExt, KeyDeriver};
pub use error::DomainError;
pub use pin::{ClaimRecord, CodeStatus, CodeStore, TransmissionRisk};
pub use rate_limit::{RateLimitDecision, RateLimitPolicy, RateLimiter};
