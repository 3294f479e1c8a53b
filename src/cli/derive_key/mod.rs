//! Derive-key command - prints the cache key for an input

use clap::Args;

/// Arguments for the derive-key command
#[derive(Args, Clone, Debug)]
pub struct DeriveKeyArgs {
    /// Input to derive from, such as an API key
    pub input: String,

    /// Namespace prefix for the derived key
    #[arg(long)]
    pub namespace: Option<String>,
}

/// Run the derive-key command
pub async fn run(args: DeriveKeyArgs) -> anyhow::Result<()> {
    let config = super::bootstrap()?;

    if config.key_deriver.hmac_key.is_none() {
        anyhow::bail!("key_deriver.hmac_key must be set to derive stable keys");
    }

    let deriver = crate::create_key_deriver(config.key_deriver.hmac_key.as_deref())?;

    let key = match &args.namespace {
        Some(namespace) => deriver.derive_with_namespace(namespace, &args.input),
        None => deriver.derive(&args.input),
    };
    println!("{}", key);

    Ok(())
}
