use std::time::Duration;

use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Already exists: {message}")]
    AlreadyExists { message: String },

    #[error("Already claimed: {message}")]
    AlreadyClaimed { message: String },

    #[error("Expired: {message}")]
    Expired { message: String },

    #[error("Rate limited: retry after {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("Backend unavailable: {backend} - {message}")]
    BackendUnavailable { backend: String, message: String },

    #[error("Issuance failed: {message}")]
    IssuanceFailed { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::AlreadyExists {
            message: message.into(),
        }
    }

    pub fn already_claimed(message: impl Into<String>) -> Self {
        Self::AlreadyClaimed {
            message: message.into(),
        }
    }

    pub fn expired(message: impl Into<String>) -> Self {
        Self::Expired {
            message: message.into(),
        }
    }

    pub fn rate_limited(retry_after: Duration) -> Self {
        Self::RateLimited { retry_after }
    }

    pub fn issuance_failed(message: impl Into<String>) -> Self {
        Self::IssuanceFailed {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Failure of the code store backend
    pub fn storage(message: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            backend: "storage".to_string(),
            message: message.into(),
        }
    }

    /// Failure of the cache backend
    pub fn cache(message: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            backend: "cache".to_string(),
            message: message.into(),
        }
    }

    /// Failure of the rate limiter backend (not a deny decision)
    pub fn rate_limiter(message: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            backend: "rate_limiter".to_string(),
            message: message.into(),
        }
    }

    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, Self::BackendUnavailable { .. })
    }

    /// Retry hint carried by a rate limit rejection
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    /// Conventional HTTP status code for this error kind
    pub fn status_hint(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::AlreadyExists { .. } | Self::AlreadyClaimed { .. } => 409,
            Self::Expired { .. } => 410,
            Self::RateLimited { .. } => 429,
            Self::BackendUnavailable { .. } => 503,
            Self::IssuanceFailed { .. } | Self::Configuration { .. } | Self::Internal { .. } => 500,
        }
    }
}
