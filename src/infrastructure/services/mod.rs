//! Infrastructure services

mod api_key_cache_service;
mod issuance_service;

pub use api_key_cache_service::CachedApiKeyLookup;
pub use issuance_service::{IssuanceConfig, IssuanceService, IssueCodeRequest, IssuedCode};
