//! Verification code issuance service

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::pin::{ClaimRecord, CodeStatus, CodeStore, TransmissionRisk};
use crate::domain::rate_limit::RateLimiter;
use crate::domain::DomainError;
use crate::infrastructure::pin::CodeGenerator;

/// Configuration for code issuance
#[derive(Debug, Clone)]
pub struct IssuanceConfig {
    /// Lifetime used when a request does not name one
    pub default_duration: Duration,
    /// Longest lifetime a request may ask for
    pub max_duration: Duration,
    /// Insert attempts before giving up on collisions
    pub max_generation_attempts: u32,
}

impl Default for IssuanceConfig {
    fn default() -> Self {
        Self {
            default_duration: Duration::from_secs(3600),
            max_duration: Duration::from_secs(24 * 3600),
            max_generation_attempts: 10,
        }
    }
}

impl IssuanceConfig {
    pub fn with_default_duration(mut self, duration: Duration) -> Self {
        self.default_duration = duration;
        self
    }

    pub fn with_max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = duration;
        self
    }

    pub fn with_max_generation_attempts(mut self, attempts: u32) -> Self {
        self.max_generation_attempts = attempts;
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.max_generation_attempts == 0 {
            return Err(DomainError::configuration(
                "max_generation_attempts must be greater than zero",
            ));
        }

        if self.default_duration.is_zero() || self.default_duration > self.max_duration {
            return Err(DomainError::configuration(format!(
                "default_duration must be between 1s and max_duration ({}s)",
                self.max_duration.as_secs()
            )));
        }

        Ok(())
    }
}

/// Request to issue a new code
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueCodeRequest {
    #[serde(default)]
    pub transmission_risks: Vec<TransmissionRisk>,
    #[serde(default)]
    pub claims: HashMap<String, String>,
    /// Lifetime of the code; the configured default when absent
    #[serde(default)]
    pub duration: Option<Duration>,
}

impl IssueCodeRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transmission_risks(mut self, risks: Vec<TransmissionRisk>) -> Self {
        self.transmission_risks = risks;
        self
    }

    pub fn with_claim(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.insert(key.into(), value.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// A freshly issued code
#[derive(Debug, Clone, Serialize)]
pub struct IssuedCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub record: ClaimRecord,
}

/// Issues, claims and inspects verification codes
///
/// Issuance is admitted per actor by the rate limiter. Generated codes that
/// collide with an existing one are regenerated a bounded number of times;
/// backend errors are returned as-is.
pub struct IssuanceService {
    store: Arc<dyn CodeStore>,
    limiter: Arc<dyn RateLimiter>,
    generator: CodeGenerator,
    config: IssuanceConfig,
}

impl std::fmt::Debug for IssuanceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuanceService")
            .field("generator", &self.generator)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl IssuanceService {
    pub fn new(
        store: Arc<dyn CodeStore>,
        limiter: Arc<dyn RateLimiter>,
        generator: CodeGenerator,
        config: IssuanceConfig,
    ) -> Result<Self, DomainError> {
        config.validate()?;

        Ok(Self {
            store,
            limiter,
            generator,
            config,
        })
    }

    pub fn config(&self) -> &IssuanceConfig {
        &self.config
    }

    /// Issues a new code on behalf of `actor`
    pub async fn issue_code(
        &self,
        actor: &str,
        request: IssueCodeRequest,
    ) -> Result<IssuedCode, DomainError> {
        let duration = self.resolve_duration(request.duration)?;

        let decision = self.limiter.allow(actor).await?;

        if !decision.allowed {
            warn!(
                actor = %actor,
                retry_after_ms = decision.retry_after.as_millis() as u64,
                "Issuance rate limited"
            );
            return Err(DomainError::rate_limited(decision.retry_after));
        }

        for attempt in 1..=self.config.max_generation_attempts {
            let code = self.generator.generate();

            match self
                .store
                .insert(&code, &request.transmission_risks, &request.claims, duration)
                .await
            {
                Ok(record) => {
                    info!(
                        actor = %actor,
                        code_length = code.len(),
                        attempt,
                        expires_at = %record.expires_at(),
                        "Issued verification code"
                    );

                    return Ok(IssuedCode {
                        code,
                        expires_at: record.expires_at(),
                        record,
                    });
                }
                Err(DomainError::AlreadyExists { .. }) => {
                    debug!(attempt, "Generated code collided, regenerating");
                }
                Err(e) => return Err(e),
            }
        }

        warn!(
            actor = %actor,
            attempts = self.config.max_generation_attempts,
            "Exhausted code generation attempts"
        );

        Err(DomainError::issuance_failed(format!(
            "No unused code found after {} attempts",
            self.config.max_generation_attempts
        )))
    }

    /// Claims a code, at most once
    pub async fn claim_code(&self, code: &str) -> Result<ClaimRecord, DomainError> {
        match self.store.claim(code).await {
            Ok(record) => {
                info!(code_length = code.len(), "Claimed verification code");
                Ok(record)
            }
            Err(e) => {
                debug!(code_length = code.len(), error = %e, "Claim rejected");
                Err(e)
            }
        }
    }

    /// Reports whether a code is active, claimed or expired
    pub async fn code_status(&self, code: &str) -> Result<CodeStatus, DomainError> {
        let record = self.store.retrieve(code).await?;
        Ok(record.status_at(Utc::now()))
    }

    fn resolve_duration(&self, requested: Option<Duration>) -> Result<Duration, DomainError> {
        let duration = requested.unwrap_or(self.config.default_duration);

        if duration.is_zero() {
            return Err(DomainError::validation("Code duration must be greater than zero"));
        }

        if duration > self.config.max_duration {
            return Err(DomainError::validation(format!(
                "Code duration {}s exceeds the maximum of {}s",
                duration.as_secs(),
                self.config.max_duration.as_secs()
            )));
        }

        Ok(duration)
    }
}
