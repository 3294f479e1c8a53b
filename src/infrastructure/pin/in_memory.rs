//! In-memory code store implementation

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::pin::{ClaimRecord, CodeStore, TransmissionRisk};
use crate::domain::DomainError;

/// Thread-safe in-memory code store
///
/// Insert and claim hold the write lock for the whole check-and-mutate, so
/// concurrent claims on one code serialize and exactly one succeeds. Expired
/// records are never swept; expiry is evaluated when a code is claimed.
/// Data is lost when the process terminates.
#[derive(Debug, Default)]
pub struct InMemoryCodeStore {
    records: RwLock<HashMap<String, ClaimRecord>>,
}

impl InMemoryCodeStore {
    /// Creates a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, including expired and claimed ones
    pub fn len(&self) -> Result<usize, DomainError> {
        let records = self.records.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(records.len())
    }

    pub fn is_empty(&self) -> Result<bool, DomainError> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl CodeStore for InMemoryCodeStore {
    async fn insert(
        &self,
        code: &str,
        transmission_risks: &[TransmissionRisk],
        claims: &HashMap<String, String>,
        duration: Duration,
    ) -> Result<ClaimRecord, DomainError> {
        let record = ClaimRecord::new(code, transmission_risks, claims, Utc::now(), duration)?;

        let mut records = self.records.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        if records.contains_key(code) {
            return Err(DomainError::already_exists("Code is already stored"));
        }

        records.insert(code.to_string(), record.clone());
        Ok(record)
    }

    async fn retrieve(&self, code: &str) -> Result<ClaimRecord, DomainError> {
        let records = self.records.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        records
            .get(code)
            .cloned()
            .ok_or_else(|| DomainError::not_found("Code not found"))
    }

    async fn claim(&self, code: &str) -> Result<ClaimRecord, DomainError> {
        let mut records = self.records.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        let record = records
            .get_mut(code)
            .ok_or_else(|| DomainError::not_found("Code not found"))?;

        record.claim_at(Utc::now())?;
        Ok(record.clone())
    }
}
