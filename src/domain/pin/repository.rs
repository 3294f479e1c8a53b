//! Code store trait definition

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::domain::DomainError;

use super::entity::{ClaimRecord, TransmissionRisk};

/// Storage for issued codes with at-most-once claim semantics
///
/// Every backend must make the duplicate check in `insert` and the
/// check-then-set in `claim` a single atomic step per code.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CodeStore: Send + Sync {
    /// Stores a new code that expires `duration` from now
    ///
    /// Fails with `AlreadyExists` if the code is already stored.
    async fn insert(
        &self,
        code: &str,
        transmission_risks: &[TransmissionRisk],
        claims: &HashMap<String, String>,
        duration: Duration,
    ) -> Result<ClaimRecord, DomainError>;

    /// Returns the stored record without filtering expired or claimed codes
    async fn retrieve(&self, code: &str) -> Result<ClaimRecord, DomainError>;

    /// Marks the code as claimed and returns the updated record
    ///
    /// Fails with `NotFound`, `Expired` (checked first) or `AlreadyClaimed`.
    async fn claim(&self, code: &str) -> Result<ClaimRecord, DomainError>;
}
