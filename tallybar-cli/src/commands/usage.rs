//! Usage and refresh commands - fetch and display provider usage.

use anyhow::Result;
use tallybar_core::UsageSnapshot;
use tallybar_store::{Clock, FetchEngine};
use tracing::info;

use super::{load_config, open_engine};
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Runs the usage command. With `force`, fetches regardless of schedule.
pub async fn run(cli: &Cli, force: bool) -> Result<()> {
    let config = load_config(cli)?;
    let engine = open_engine(&config).await?;

    info!(provider = engine.provider_id(), force, "Fetching usage");

    let snapshot = if force {
        engine.force_fetch().await?
    } else {
        engine.fetch_if_due().await?
    };

    print_snapshot(&engine, &snapshot, cli).await
}

/// Prints a snapshot in the selected format.
pub async fn print_snapshot(engine: &FetchEngine, snapshot: &UsageSnapshot, cli: &Cli) -> Result<()> {
    let state = engine.run_state().await;

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            let now = engine.clock().now_epoch();
            println!(
                "{}",
                formatter.format_usage(snapshot, engine.provider_name(), &state, now)
            );
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!(
                "{}",
                formatter.format_usage(snapshot, engine.provider_name(), &state)?
            );
        }
    }

    Ok(())
}
