//! Code store factory for runtime backend selection

use std::sync::Arc;

use crate::domain::pin::CodeStore;
use crate::domain::DomainError;

use super::in_memory::InMemoryCodeStore;
use super::postgres::{PostgresCodeStore, PostgresConfig};

/// Supported code store backends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeStoreType {
    /// In-memory store (for testing/development)
    InMemory,
    /// PostgreSQL store
    Postgres,
}

impl std::fmt::Display for CodeStoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InMemory => write!(f, "in_memory"),
            Self::Postgres => write!(f, "postgres"),
        }
    }
}

impl std::str::FromStr for CodeStoreType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Ok(Self::InMemory),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            _ => Err(DomainError::configuration(format!(
                "Unknown storage backend: {}. Valid backends: in_memory, postgres",
                s
            ))),
        }
    }
}

/// Code store configuration
#[derive(Debug, Clone)]
pub enum CodeStoreConfig {
    /// In-memory store configuration
    InMemory,
    /// PostgreSQL store configuration
    Postgres {
        config: PostgresConfig,
        table_name: String,
    },
}

impl CodeStoreConfig {
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    pub fn postgres(config: PostgresConfig) -> Self {
        Self::Postgres {
            config,
            table_name: PostgresCodeStore::DEFAULT_TABLE.to_string(),
        }
    }

    pub fn postgres_url(url: impl Into<String>) -> Self {
        Self::postgres(PostgresConfig::new(url))
    }

    pub fn store_type(&self) -> CodeStoreType {
        match self {
            Self::InMemory => CodeStoreType::InMemory,
            Self::Postgres { .. } => CodeStoreType::Postgres,
        }
    }
}

/// Factory for creating code store instances
#[derive(Debug)]
pub struct CodeStoreFactory;

impl CodeStoreFactory {
    /// Creates a code store based on the configuration
    pub async fn create(config: &CodeStoreConfig) -> Result<Arc<dyn CodeStore>, DomainError> {
        match config {
            CodeStoreConfig::InMemory => Ok(Arc::new(InMemoryCodeStore::new())),
            CodeStoreConfig::Postgres { config, table_name } => {
                let store = PostgresCodeStore::connect(config, table_name.clone()).await?;
                store.ensure_table().await?;
                Ok(Arc::new(store))
            }
        }
    }
}
