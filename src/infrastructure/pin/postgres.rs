//! PostgreSQL code store implementation with connection pooling

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::debug;

use crate::domain::pin::{ClaimRecord, CodeStore, TransmissionRisk};
use crate::domain::DomainError;

/// PostgreSQL connection configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection acquire timeout in seconds
    pub connect_timeout_secs: u64,
    /// Idle timeout in seconds
    pub idle_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/pmp_verification_codes".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    pub fn with_idle_timeout(mut self, secs: u64) -> Self {
        self.idle_timeout_secs = secs;
        self
    }
}

/// Drops the nanoseconds `TIMESTAMPTZ` cannot hold
fn micros_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn micros_duration(duration: Duration) -> Duration {
    duration - Duration::from_nanos(u64::from(duration.subsec_nanos() % 1_000))
}

/// Durable code store backed by PostgreSQL
///
/// Atomicity comes from single statements: `INSERT ... ON CONFLICT DO NOTHING`
/// for issuance and a conditional `UPDATE` for claiming. A request cancelled
/// mid-flight either committed its statement or left the row untouched.
/// Claimed and expired rows are retained for audit.
pub struct PostgresCodeStore {
    pool: PgPool,
    table_name: String,
}

impl std::fmt::Debug for PostgresCodeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresCodeStore")
            .field("table_name", &self.table_name)
            .finish()
    }
}

impl PostgresCodeStore {
    /// Default table for issued codes
    pub const DEFAULT_TABLE: &'static str = "verification_codes";

    /// Creates a store over an existing pool
    pub fn new(pool: PgPool, table_name: impl Into<String>) -> Self {
        Self {
            pool,
            table_name: table_name.into(),
        }
    }

    /// Creates a store with its own connection pool
    pub async fn connect(
        config: &PostgresConfig,
        table_name: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to PostgreSQL: {}", e)))?;

        Ok(Self::new(pool, table_name))
    }

    /// Returns a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Ensures the codes table exists
    pub async fn ensure_table(&self) -> Result<(), DomainError> {
        let query = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                code VARCHAR(255) PRIMARY KEY,
                transmission_risks JSONB NOT NULL,
                claims JSONB NOT NULL,
                issued_at TIMESTAMPTZ NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL,
                claimed BOOLEAN NOT NULL DEFAULT FALSE,
                claimed_at TIMESTAMPTZ
            )
            "#,
            self.table_name
        );

        sqlx::query(&query)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to create table: {}", e)))?;

        Ok(())
    }

    fn select_query(&self) -> String {
        format!(
            "SELECT code, transmission_risks, claims, issued_at, expires_at, claimed_at FROM {} WHERE code = $1",
            self.table_name
        )
    }

    fn record_from_row(row: &PgRow) -> Result<ClaimRecord, DomainError> {
        let risks: serde_json::Value = row.get("transmission_risks");
        let claims: serde_json::Value = row.get("claims");

        let risks: Vec<TransmissionRisk> = serde_json::from_value(risks).map_err(|e| {
            DomainError::storage(format!("Failed to deserialize transmission risks: {}", e))
        })?;
        let claims: HashMap<String, String> = serde_json::from_value(claims)
            .map_err(|e| DomainError::storage(format!("Failed to deserialize claims: {}", e)))?;

        Ok(ClaimRecord::from_parts(
            row.get("code"),
            risks,
            claims,
            row.get("issued_at"),
            row.get("expires_at"),
            row.get("claimed_at"),
        ))
    }

    async fn find(&self, code: &str) -> Result<Option<ClaimRecord>, DomainError> {
        let row = sqlx::query(&self.select_query())
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to retrieve code: {}", e)))?;

        row.as_ref().map(Self::record_from_row).transpose()
    }
}

#[async_trait]
impl CodeStore for PostgresCodeStore {
    async fn insert(
        &self,
        code: &str,
        transmission_risks: &[TransmissionRisk],
        claims: &HashMap<String, String>,
        duration: Duration,
    ) -> Result<ClaimRecord, DomainError> {
        let record = ClaimRecord::new(
            code,
            transmission_risks,
            claims,
            micros_now(),
            micros_duration(duration),
        )?;

        let risks = serde_json::to_value(record.transmission_risks()).map_err(|e| {
            DomainError::internal(format!("Failed to serialize transmission risks: {}", e))
        })?;
        let claims = serde_json::to_value(record.claims())
            .map_err(|e| DomainError::internal(format!("Failed to serialize claims: {}", e)))?;

        let query = format!(
            r#"
            INSERT INTO {} (code, transmission_risks, claims, issued_at, expires_at, claimed)
            VALUES ($1, $2, $3, $4, $5, FALSE)
            ON CONFLICT (code) DO NOTHING
            "#,
            self.table_name
        );

        let result = sqlx::query(&query)
            .bind(record.code())
            .bind(&risks)
            .bind(&claims)
            .bind(record.issued_at())
            .bind(record.expires_at())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to insert code: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::already_exists("Code is already stored"));
        }

        Ok(record)
    }

    async fn retrieve(&self, code: &str) -> Result<ClaimRecord, DomainError> {
        self.find(code)
            .await?
            .ok_or_else(|| DomainError::not_found("Code not found"))
    }

    async fn claim(&self, code: &str) -> Result<ClaimRecord, DomainError> {
        let now = micros_now();

        let query = format!(
            r#"
            UPDATE {}
            SET claimed = TRUE, claimed_at = $2
            WHERE code = $1 AND claimed = FALSE AND expires_at >= $2
            RETURNING code, transmission_risks, claims, issued_at, expires_at, claimed_at
            "#,
            self.table_name
        );

        let row = sqlx::query(&query)
            .bind(code)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to claim code: {}", e)))?;

        if let Some(row) = row {
            return Self::record_from_row(&row);
        }

        // The conditional update matched nothing; work out why
        debug!("Claim did not match an open code, diagnosing");
        let mut record = self
            .find(code)
            .await?
            .ok_or_else(|| DomainError::not_found("Code not found"))?;

        match record.claim_at(now) {
            Err(e) => Err(e),
            // Expired or claimed state changed between the two statements
            Ok(()) => Err(DomainError::already_claimed("Code has already been claimed")),
        }
    }
}
