// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! TallyBar CLI - coding plan quota monitoring from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Show usage, fetching only if the schedule says so
//! tallybar
//!
//! # Fetch now, ignoring the schedule and any backoff
//! tallybar refresh
//!
//! # Use the BigModel (mainland China) endpoint
//! tallybar --provider bigmodel
//!
//! # JSON output
//! tallybar --format json --pretty
//!
//! # Store an API key in the system keychain
//! tallybar key set sk-...
//!
//! # Poll in the foreground and announce quota resets
//! tallybar watch
//! ```

mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tallybar_store::EngineError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{config, key, providers, state, usage, watch};

// ============================================================================
// CLI Definition
// ============================================================================

/// TallyBar CLI - coding plan quota monitoring.
#[derive(Parser)]
#[command(name = "tallybar")]
#[command(about = "Coding plan quota monitoring CLI")]
#[command(long_about = r#"
TallyBar polls your coding plan quota, backs off politely when the
provider is struggling, and tells you when your quota resets.

Supported providers:
  • z.ai (zai)
  • BigModel (bigmodel)

Examples:
  tallybar                       # Cached or freshly fetched usage
  tallybar refresh               # Fetch now
  tallybar --format json         # JSON output
  tallybar key set <KEY>         # Save an API key
  tallybar watch                 # Poll until Ctrl-C
"#)]
#[command(version)]
#[command(author = "TallyBar Contributors")]
pub struct Cli {
    /// Subcommand to run. If none, runs 'usage' by default.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Provider to use instead of the configured one.
    #[arg(long, short, global = true)]
    pub provider: Option<String>,

    /// Configuration file to use instead of the default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Show current usage, fetching if due (default if no command specified).
    #[command(visible_alias = "u")]
    Usage,

    /// Fetch now, ignoring the schedule and backoff.
    #[command(visible_alias = "r")]
    Refresh,

    /// Poll in the foreground and announce quota resets.
    #[command(visible_alias = "w")]
    Watch(watch::WatchArgs),

    /// Show the persisted scheduler state.
    State,

    /// Manage the provider API key.
    Key(key::KeyArgs),

    /// Manage configuration.
    Config(config::ConfigArgs),

    /// List available providers.
    #[command(visible_alias = "p")]
    Providers,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// No API key is configured.
    ApiKeyMissing = 2,
    /// Nothing fetched yet and the fetch failed.
    NoCachedData = 3,
}

impl ExitCode {
    /// Picks the exit code for a failed command.
    fn for_error(error: &anyhow::Error) -> Self {
        match error.downcast_ref::<EngineError>() {
            Some(EngineError::ApiKeyNotSet) => Self::ApiKeyMissing,
            Some(EngineError::NoCachedData) => Self::NoCachedData,
            _ => Self::Error,
        }
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return; // No logging in quiet mode
    }

    let default_filter = if verbose { "tallybar=debug,info" } else { "tallybar=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Some(Commands::Usage) | None => usage::run(&cli, false).await,
        Some(Commands::Refresh) => usage::run(&cli, true).await,
        Some(Commands::Watch(args)) => watch::run(args, &cli).await,
        Some(Commands::State) => state::run(&cli).await,
        Some(Commands::Key(args)) => key::run(args, &cli).await,
        Some(Commands::Config(args)) => config::run(args, &cli),
        Some(Commands::Providers) => providers::run(&cli).await,
    };

    let code = match result {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            ExitCode::for_error(&e)
        }
    };

    std::process::exit(code as i32);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_command_is_usage() {
        let cli = Cli::parse_from(["tallybar"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["tallybar", "state", "--format", "json", "--provider", "bigmodel"]);
        assert!(matches!(cli.command, Some(Commands::State)));
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.provider.as_deref(), Some("bigmodel"));
    }

    #[test]
    fn test_exit_codes() {
        let missing = anyhow::Error::from(EngineError::ApiKeyNotSet);
        assert_eq!(ExitCode::for_error(&missing), ExitCode::ApiKeyMissing);

        let empty = anyhow::Error::from(EngineError::NoCachedData);
        assert_eq!(ExitCode::for_error(&empty), ExitCode::NoCachedData);

        let fatal = anyhow::Error::from(EngineError::Fatal("boom".into()));
        assert_eq!(ExitCode::for_error(&fatal), ExitCode::Error);

        let other = anyhow::anyhow!("unknown provider");
        assert_eq!(ExitCode::for_error(&other), ExitCode::Error);
    }

    #[test]
    fn test_exit_code_survives_context() {
        let result: Result<(), EngineError> = Err(EngineError::ApiKeyNotSet);
        let e = result.context("Fetching usage").unwrap_err();
        assert_eq!(ExitCode::for_error(&e), ExitCode::ApiKeyMissing);
    }
}
