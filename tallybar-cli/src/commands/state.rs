//! State command - show the persisted scheduler state.

use anyhow::Result;
use tallybar_store::Clock;

use super::{load_config, open_engine};
use crate::output::{JsonFormatter, StateOutput, TextFormatter};
use crate::{Cli, OutputFormat};

/// Runs the state command.
pub async fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let engine = open_engine(&config).await?;

    let state = engine.run_state().await;
    let has_snapshot = engine.cached_snapshot().await.is_some();
    let now = engine.clock().now_epoch();

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!(
                "{}",
                formatter.format_state(&state, engine.provider_name(), has_snapshot, now)
            );
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            let output = StateOutput {
                provider: engine.provider_id().to_string(),
                due: state.is_due(now),
                state,
                has_cached_snapshot: has_snapshot,
            };
            println!("{}", formatter.format(&output)?);
        }
    }

    Ok(())
}
