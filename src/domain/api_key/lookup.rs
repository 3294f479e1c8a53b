//! API key lookup contract

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::automock;

use crate::domain::DomainError;

/// Kind of access granted to an API key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiKeyType {
    /// May issue codes
    Admin,
    /// May claim codes
    Device,
}

/// Application an API key resolves to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizedApp {
    /// Realm the application belongs to; used as the rate limit subject
    pub realm_id: String,
    /// Display name of the application
    pub name: String,
    /// Granted access
    pub api_key_type: ApiKeyType,
}

impl AuthorizedApp {
    pub fn new(realm_id: impl Into<String>, name: impl Into<String>, api_key_type: ApiKeyType) -> Self {
        Self {
            realm_id: realm_id.into(),
            name: name.into(),
            api_key_type,
        }
    }

    pub fn can_issue(&self) -> bool {
        self.api_key_type == ApiKeyType::Admin
    }
}

/// Resolves raw API keys to the application they authorize
///
/// This is the expensive lookup that callers put behind the cache.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ApiKeyLookup: Send + Sync {
    /// Returns the authorized application, or `None` for an unknown or revoked key
    async fn find_by_api_key(&self, api_key: &str) -> Result<Option<AuthorizedApp>, DomainError>;
}
