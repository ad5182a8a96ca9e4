//! Config command - manage configuration.

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use tallybar_store::Config;
use tracing::info;

use super::{config_path, load_config};
use crate::output::JsonFormatter;
use crate::{Cli, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show configuration and state paths.
    Path,

    /// Set the time between fetches.
    SetInterval {
        /// Interval in seconds; must be at least the minimum interval.
        secs: u64,
    },

    /// Set the default provider.
    SetProvider {
        /// Provider id (zai, bigmodel).
        provider: String,
    },

    /// Reset to defaults.
    Reset,
}

/// Runs the config command.
pub fn run(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        ConfigAction::Show => show_config(cli),
        ConfigAction::Path => show_paths(cli),
        ConfigAction::SetInterval { secs } => set_interval(*secs, cli),
        ConfigAction::SetProvider { provider } => set_provider(provider, cli),
        ConfigAction::Reset => reset_config(cli),
    }
}

fn show_config(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;

    match cli.format {
        OutputFormat::Text => {
            println!("TallyBar Configuration");
            println!("{}", "─".repeat(40));
            println!();
            println!("Provider:          {}", config.provider);
            if let Some(url) = &config.base_url {
                println!("Base URL:          {url}");
            }
            println!(
                "Fetch interval:    {}s (minimum {}s)",
                config.effective_base_interval(),
                config.min_interval_secs
            );
            println!(
                "Backoff limit:     {}s + up to {}s jitter",
                config.max_backoff_secs, config.max_jitter_secs
            );
            println!("Quota period:      {}s", config.reset_interval_secs);
            println!("Give up after:     {} failures", config.failure_threshold);
            println!(
                "Notifications:     {} (every {}s)",
                if config.notifications { "on" } else { "off" },
                config.notify_interval_secs
            );
            println!("State dir:         {}", config.state_dir().display());
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&config)?);
        }
    }

    Ok(())
}

fn show_paths(cli: &Cli) -> Result<()> {
    let config_file = config_path(cli);
    let state_dir = load_config(cli)?.state_dir();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config file: {}", config_file.display());
            println!("State dir:   {}", state_dir.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "configFile": config_file.display().to_string(),
                "stateDir": state_dir.display().to_string(),
            });
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&paths)?);
        }
    }

    Ok(())
}

/// Loads the stored config without flag overrides, applies `edit`, and
/// saves it back after validation.
fn update_config(cli: &Cli, edit: impl FnOnce(&mut Config) -> Result<()>) -> Result<Config> {
    let path = config_path(cli);
    let mut config = Config::load_from(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

    edit(&mut config)?;
    config.validate()?;
    config
        .save_to(&path)
        .with_context(|| format!("Failed to save configuration to {}", path.display()))?;

    Ok(config)
}

fn set_interval(secs: u64, cli: &Cli) -> Result<()> {
    update_config(cli, |config| {
        if secs < config.min_interval_secs {
            bail!(
                "Interval must be at least {}s (got {secs}s)",
                config.min_interval_secs
            );
        }
        config.base_interval_secs = secs;
        Ok(())
    })?;

    info!(secs, "Fetch interval updated");
    println!("Fetch interval set to {secs}s");
    Ok(())
}

fn set_provider(provider: &str, cli: &Cli) -> Result<()> {
    let provider = provider.trim().to_lowercase();
    let config = Config {
        provider: provider.clone(),
        ..Config::default()
    };
    super::build_registry(&config).with_context(|| format!("Unknown provider: {provider}"))?;

    update_config(cli, |config| {
        config.provider = provider.clone();
        Ok(())
    })?;

    info!(provider = %provider, "Default provider updated");
    println!("Default provider set to {provider}");
    Ok(())
}

fn reset_config(cli: &Cli) -> Result<()> {
    let path = config_path(cli);

    if path.exists() {
        std::fs::remove_file(&path)
            .with_context(|| format!("Failed to remove {}", path.display()))?;
        info!(path = %path.display(), "Configuration reset");
        println!("Configuration reset to defaults");
    } else {
        println!("No configuration file to reset");
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
