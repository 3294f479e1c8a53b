//! API key domain - Resolution of API keys to authorized applications

mod lookup;

pub use lookup::{ApiKeyLookup, ApiKeyType, AuthorizedApp};

#[cfg(test)]
pub use lookup::MockApiKeyLookup;
