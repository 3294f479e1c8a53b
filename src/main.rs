use clap::Parser;
use pmp_verification_codes::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Issue(args) => cli::codes::issue(args).await,
        Command::Claim(args) => cli::codes::claim(args).await,
        Command::Status(args) => cli::codes::status(args).await,
        Command::DeriveKey(args) => cli::derive_key::run(args).await,
    }
}
