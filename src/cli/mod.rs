//! CLI module for PMP Verification Codes
//!
//! Provides subcommands operating on the configured backends:
//! - `issue`: issue a new code
//! - `claim`: claim a code once
//! - `status`: report whether a code is active, claimed or expired
//! - `derive-key`: print the cache key derived from an input

pub mod codes;
pub mod derive_key;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// PMP Verification Codes - Issue and claim single-use verification codes
#[derive(Parser)]
#[command(name = "pmp-verification-codes")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Issue a new verification code
    Issue(codes::IssueArgs),

    /// Claim a verification code
    ///
    /// Needs a durable `storage.backend`; the in-memory store starts empty in
    /// every process.
    Claim(codes::CodeArgs),

    /// Show the status of a verification code
    ///
    /// Needs a durable `storage.backend`; the in-memory store starts empty in
    /// every process.
    Status(codes::CodeArgs),

    /// Print the cache key derived from an input
    DeriveKey(derive_key::DeriveKeyArgs),
}

/// Loads `.env` and configuration, then installs the subscriber
pub fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging)?;

    Ok(config)
}
