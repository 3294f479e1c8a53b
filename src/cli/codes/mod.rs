//! Code commands - issue, claim and inspect verification codes

use std::collections::HashMap;
use std::time::Duration;

use clap::Args;
use serde_json::json;
use tracing::warn;

use crate::config::AppConfig;
use crate::domain::pin::TransmissionRisk;
use crate::infrastructure::pin::CodeStoreType;
use crate::infrastructure::services::IssueCodeRequest;

/// Arguments for the issue command
#[derive(Args, Clone, Debug)]
pub struct IssueArgs {
    /// Subject the issuance is rate limited under
    #[arg(long, default_value = "cli")]
    pub actor: String,

    /// Transmission risk level (repeatable)
    #[arg(long = "risk")]
    pub risks: Vec<u8>,

    /// Claim attached to the code, as key=value (repeatable)
    #[arg(long = "claim", value_parser = parse_claim)]
    pub claims: Vec<(String, String)>,

    /// Lifetime in seconds (configured default when omitted)
    #[arg(long)]
    pub duration_secs: Option<u64>,
}

impl IssueArgs {
    fn into_request(self) -> IssueCodeRequest {
        IssueCodeRequest {
            transmission_risks: self.risks.into_iter().map(TransmissionRisk::from).collect(),
            claims: self.claims.into_iter().collect::<HashMap<_, _>>(),
            duration: self.duration_secs.map(Duration::from_secs),
        }
    }
}

/// Arguments naming a single code
#[derive(Args, Clone, Debug)]
pub struct CodeArgs {
    /// The verification code
    pub code: String,
}

fn parse_claim(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

/// Warns when a lookup would run against a store that starts empty
fn warn_if_ephemeral_store(config: &AppConfig) -> bool {
    let ephemeral = matches!(
        config.storage.code_store_config().map(|store| store.store_type()),
        Ok(CodeStoreType::InMemory)
    );

    if ephemeral {
        warn!(
            "storage.backend is in_memory; codes issued by other processes are not visible \
            here. Configure a durable backend such as postgres."
        );
    }

    ephemeral
}

/// Run the issue command
pub async fn issue(args: IssueArgs) -> anyhow::Result<()> {
    let config = super::bootstrap()?;
    let state = crate::create_app_state_with_config(&config).await?;

    let actor = args.actor.clone();
    let result = state
        .issuance_service
        .issue_code(&actor, args.into_request())
        .await;
    state.shutdown().await?;

    let issued = result?;
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "code": issued.code,
            "expires_at": issued.expires_at,
        }))?
    );

    Ok(())
}

/// Run the claim command
pub async fn claim(args: CodeArgs) -> anyhow::Result<()> {
    let config = super::bootstrap()?;
    warn_if_ephemeral_store(&config);
    let state = crate::create_app_state_with_config(&config).await?;

    let result = state.issuance_service.claim_code(&args.code).await;
    state.shutdown().await?;

    let record = result?;
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "transmission_risks": record.transmission_risks(),
            "claims": record.claims(),
            "claimed_at": record.claimed_at(),
        }))?
    );

    Ok(())
}

/// Run the status command
pub async fn status(args: CodeArgs) -> anyhow::Result<()> {
    let config = super::bootstrap()?;
    warn_if_ephemeral_store(&config);
    let state = crate::create_app_state_with_config(&config).await?;

    let result = state.issuance_service.code_status(&args.code).await;
    state.shutdown().await?;

    println!("{}", result?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_claim() {
        assert_eq!(
            parse_claim("transmissionDate=2020-01-01").unwrap(),
            ("transmissionDate".to_string(), "2020-01-01".to_string())
        );
        assert_eq!(parse_claim("empty=").unwrap(), ("empty".to_string(), String::new()));
        assert!(parse_claim("novalue").is_err());
        assert!(parse_claim("=value").is_err());
    }

    #[test]
    fn test_issue_args_into_request() {
        let args = IssueArgs {
            actor: "realm-1".to_string(),
            risks: vec![6, 8],
            claims: vec![("testType".to_string(), "confirmed".to_string())],
            duration_secs: Some(120),
        };

        let request = args.into_request();

        assert_eq!(
            request.transmission_risks,
            vec![TransmissionRisk::HIGH, TransmissionRisk::HIGHEST]
        );
        assert_eq!(request.claims.get("testType"), Some(&"confirmed".to_string()));
        assert_eq!(request.duration, Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_in_memory_store_is_flagged_ephemeral() {
        let mut config = AppConfig::default();
        assert!(warn_if_ephemeral_store(&config));

        config.storage.backend = "postgres".to_string();
        config.storage.postgres_url = Some("postgres://db/codes".to_string());
        assert!(!warn_if_ephemeral_store(&config));
    }
}
