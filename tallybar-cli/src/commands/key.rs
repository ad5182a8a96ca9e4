//! Key command - manage the provider API key.

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use tallybar_fetch::CredentialStore;
use tallybar_providers::{credential_store, ZaiRegion, ZaiTokenStore};
use tracing::info;

use super::{build_registry, load_config};
use crate::output::{JsonFormatter, KeyStatusOutput, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the key command.
#[derive(Args)]
pub struct KeyArgs {
    #[command(subcommand)]
    pub action: KeyAction,
}

/// Key subcommands.
#[derive(Subcommand)]
pub enum KeyAction {
    /// Save an API key in the system keychain.
    Set {
        /// The API key.
        key: String,
    },

    /// Remove the saved API key.
    Delete,

    /// Show whether a key is configured and where it comes from.
    Status,
}

/// Runs the key command.
pub async fn run(args: &KeyArgs, cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let registry = build_registry(&config)?;
    let provider = registry.default_provider()?;
    let provider_id = provider.id().to_string();

    match &args.action {
        KeyAction::Set { key } => set_key(&provider_id, key).await,
        KeyAction::Delete => delete_key(&provider_id).await,
        KeyAction::Status => show_status(&provider_id, cli).await,
    }
}

async fn set_key(provider_id: &str, key: &str) -> Result<()> {
    let key = key.trim();
    if key.is_empty() {
        bail!("API key must not be empty");
    }

    credential_store(provider_id)
        .write(key)
        .await
        .context("Failed to save API key")?;

    info!(provider = provider_id, "API key saved");
    println!("API key saved for {provider_id}");

    if let Some(var) = shadowing_env_var(provider_id) {
        println!("Note: ${var} is set and takes precedence over the saved key");
    }

    Ok(())
}

async fn delete_key(provider_id: &str) -> Result<()> {
    credential_store(provider_id)
        .delete()
        .await
        .context("Failed to delete API key")?;

    info!(provider = provider_id, "API key deleted");
    println!("API key deleted for {provider_id}");
    Ok(())
}

async fn show_status(provider_id: &str, cli: &Cli) -> Result<()> {
    let found = match ZaiRegion::from_id(provider_id) {
        Some(region) => ZaiTokenStore::new(region)
            .read_with_source()
            .await?
            .map(|(key, source)| (key, source.to_string())),
        None => credential_store(provider_id)
            .read()
            .await?
            .map(|key| (key, "keychain".to_string())),
    };

    let status = KeyStatusOutput {
        provider: provider_id.to_string(),
        configured: found.is_some(),
        masked: found.as_ref().map(|(key, _)| mask_secret(key)),
        source: found.map(|(_, source)| source),
    };

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_key_status(&status));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&status)?);
        }
    }

    Ok(())
}

/// Returns the environment variable that overrides the keychain, if set.
fn shadowing_env_var(provider_id: &str) -> Option<&'static str> {
    let region = ZaiRegion::from_id(provider_id)?;
    region
        .api_key_env_vars()
        .iter()
        .copied()
        .find(|var| std::env::var(var).is_ok_and(|value| !value.trim().is_empty()))
}

/// Shows the first and last four characters of a key.
fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "…".repeat(3);
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}

// ============================================================================
// Tests
// ============================================================================
