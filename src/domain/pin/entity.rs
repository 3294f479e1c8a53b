//! Claim record entity and related types

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Opaque transmission risk level attached to a code at issuance
///
/// Any value is stored verbatim. The named constants follow the levels used
/// by exposure notification key exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransmissionRisk(pub u8);

impl TransmissionRisk {
    pub const UNKNOWN: Self = Self(0);
    pub const LOWEST: Self = Self(1);
    pub const LOW: Self = Self(2);
    pub const MEDIUM_LOW: Self = Self(3);
    pub const MEDIUM: Self = Self(4);
    pub const MEDIUM_HIGH: Self = Self(5);
    pub const HIGH: Self = Self(6);
    pub const VERY_HIGH: Self = Self(7);
    pub const HIGHEST: Self = Self(8);

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl From<u8> for TransmissionRisk {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl fmt::Display for TransmissionRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller-side interpretation of a stored record at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeStatus {
    /// Unclaimed and within its validity window
    Active,
    /// Consumed by a successful claim
    Claimed,
    /// Past its expiry, whether or not it was claimed
    Expired,
}

impl fmt::Display for CodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Claimed => write!(f, "claimed"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// Stored representation of one issued code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRecord {
    code: String,
    transmission_risks: Vec<TransmissionRisk>,
    claims: HashMap<String, String>,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    claimed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    claimed_at: Option<DateTime<Utc>>,
}

impl ClaimRecord {
    /// Creates a new unclaimed record, copying the caller's risks and claims
    pub fn new(
        code: impl Into<String>,
        transmission_risks: &[TransmissionRisk],
        claims: &HashMap<String, String>,
        issued_at: DateTime<Utc>,
        duration: Duration,
    ) -> Result<Self, DomainError> {
        let code = code.into();

        if code.is_empty() {
            return Err(DomainError::validation("Code must not be empty"));
        }

        let expires_at = expiry_from(issued_at, duration)?;

        Ok(Self {
            code,
            transmission_risks: transmission_risks.to_vec(),
            claims: claims.clone(),
            issued_at,
            expires_at,
            claimed: false,
            claimed_at: None,
        })
    }

    /// Reconstitutes a record loaded from a durable backend
    pub fn from_parts(
        code: String,
        transmission_risks: Vec<TransmissionRisk>,
        claims: HashMap<String, String>,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        claimed_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            code,
            transmission_risks,
            claims,
            issued_at,
            expires_at,
            claimed: claimed_at.is_some(),
            claimed_at,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn transmission_risks(&self) -> &[TransmissionRisk] {
        &self.transmission_risks
    }

    pub fn claims(&self) -> &HashMap<String, String> {
        &self.claims
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed
    }

    pub fn claimed_at(&self) -> Option<DateTime<Utc>> {
        self.claimed_at
    }

    /// A record is expired once `now` is strictly past `expires_at`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Expiry takes precedence over the claimed flag
    pub fn status_at(&self, now: DateTime<Utc>) -> CodeStatus {
        if self.is_expired_at(now) {
            CodeStatus::Expired
        } else if self.claimed {
            CodeStatus::Claimed
        } else {
            CodeStatus::Active
        }
    }

    /// Applies the claim transition, enforcing expiry and single use
    ///
    /// Backends must call this while holding whatever exclusion guards the
    /// record so that the check and the transition are one step.
    pub fn claim_at(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.is_expired_at(now) {
            return Err(DomainError::expired(format!(
                "Code expired at {}",
                self.expires_at
            )));
        }

        if self.claimed {
            return Err(DomainError::already_claimed("Code has already been claimed"));
        }

        self.claimed = true;
        self.claimed_at = Some(now);
        Ok(())
    }
}

fn expiry_from(issued_at: DateTime<Utc>, duration: Duration) -> Result<DateTime<Utc>, DomainError> {
    let delta = chrono::Duration::from_std(duration)
        .map_err(|e| DomainError::validation(format!("Invalid code duration: {}", e)))?;

    issued_at
        .checked_add_signed(delta)
        .ok_or_else(|| DomainError::validation("Code duration overflows the expiry timestamp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> HashMap<String, String> {
        HashMap::from([("transmissionDate".to_string(), "2020-01-01".to_string())])
    }

    #[test]
    fn test_new_record() {
        let now = Utc::now();
        let record = ClaimRecord::new(
            "123456",
            &[TransmissionRisk::HIGH],
            &claims(),
            now,
            Duration::from_secs(2),
        )
        .unwrap();

        assert_eq!(record.code(), "123456");
        assert_eq!(record.transmission_risks(), &[TransmissionRisk::HIGH]);
        assert_eq!(record.claims().get("transmissionDate").unwrap(), "2020-01-01");
        assert_eq!(record.expires_at(), now + chrono::Duration::seconds(2));
        assert!(!record.is_claimed());
        assert!(record.claimed_at().is_none());
    }

    #[test]
    fn test_new_record_rejects_empty_code() {
        let result = ClaimRecord::new("", &[], &HashMap::new(), Utc::now(), Duration::from_secs(1));
        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[test]
    fn test_new_record_copies_inputs() {
        let mut risks = vec![TransmissionRisk::LOW];
        let mut input_claims = claims();

        let record =
            ClaimRecord::new("abc", &risks, &input_claims, Utc::now(), Duration::from_secs(60))
                .unwrap();

        risks.push(TransmissionRisk::HIGHEST);
        input_claims.insert("extra".to_string(), "value".to_string());

        assert_eq!(record.transmission_risks().len(), 1);
        assert_eq!(record.claims().len(), 1);
    }

    #[test]
    fn test_claim_transitions_once() {
        let now = Utc::now();
        let mut record =
            ClaimRecord::new("abc", &[], &HashMap::new(), now, Duration::from_secs(60)).unwrap();

        record.claim_at(now).unwrap();
        assert!(record.is_claimed());
        assert_eq!(record.claimed_at(), Some(now));

        let second = record.claim_at(now);
        assert!(matches!(second, Err(DomainError::AlreadyClaimed { .. })));
    }

    #[test]
    fn test_expiry_takes_precedence_over_claimed() {
        let issued = Utc::now();
        let mut record =
            ClaimRecord::new("abc", &[], &HashMap::new(), issued, Duration::from_secs(2)).unwrap();
        record.claim_at(issued).unwrap();

        let later = issued + chrono::Duration::seconds(3);
        assert!(matches!(record.claim_at(later), Err(DomainError::Expired { .. })));
        assert_eq!(record.status_at(later), CodeStatus::Expired);
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let issued = Utc::now();
        let record =
            ClaimRecord::new("abc", &[], &HashMap::new(), issued, Duration::from_secs(2)).unwrap();

        assert!(!record.is_expired_at(record.expires_at()));
        assert!(record.is_expired_at(record.expires_at() + chrono::Duration::milliseconds(1)));
    }

    #[test]
    fn test_status_at() {
        let issued = Utc::now();
        let mut record =
            ClaimRecord::new("abc", &[], &HashMap::new(), issued, Duration::from_secs(60)).unwrap();

        assert_eq!(record.status_at(issued), CodeStatus::Active);
        record.claim_at(issued).unwrap();
        assert_eq!(record.status_at(issued), CodeStatus::Claimed);
    }

    #[test]
    fn test_from_parts_derives_claimed_flag() {
        let now = Utc::now();
        let record = ClaimRecord::from_parts(
            "abc".to_string(),
            vec![TransmissionRisk::MEDIUM],
            HashMap::new(),
            now,
            now + chrono::Duration::minutes(5),
            Some(now),
        );

        assert!(record.is_claimed());
    }

    #[test]
    fn test_transmission_risk_serializes_as_integer() {
        let json = serde_json::to_string(&vec![TransmissionRisk::HIGH, TransmissionRisk(42)]).unwrap();
        assert_eq!(json, "[6,42]");
    }
}
