//! Watch command - foreground polling with reset notifications.

use std::io::{stdout, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use tallybar_store::{
    Clock, DesktopNotifier, FetchEngine, FetchLoop, ResetNotifier,
};
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{info, warn};

use super::{load_config, open_engine};
use crate::output::{usage_output, JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for watch command.
#[derive(Args)]
pub struct WatchArgs {
    /// Display refresh interval in seconds. Fetching follows the schedule.
    #[arg(long, short, default_value = "10")]
    pub interval: u64,

    /// Do not show quota reset notifications.
    #[arg(long)]
    pub no_notify: bool,
}

/// Runs the watch command.
pub async fn run(args: &WatchArgs, cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let engine = open_engine(&config).await?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    info!(
        provider = engine.provider_id(),
        base_interval = config.effective_base_interval(),
        "Starting watch mode"
    );

    let fetch_loop =
        FetchLoop::new(Arc::clone(&engine)).with_failure_threshold(config.failure_threshold);
    let mut fetch_task = tokio::spawn({
        let shutdown = shutdown_rx.clone();
        async move { fetch_loop.run(shutdown).await }
    });

    let notifier = Arc::new(DesktopNotifier::new(config.notifications && !args.no_notify));
    let reset_notifier = ResetNotifier::new(Arc::clone(&engine), notifier)
        .with_interval(Duration::from_secs(config.notify_interval_secs));
    let notify_task = tokio::spawn(async move { reset_notifier.run(shutdown_rx).await });

    let refresh = Duration::from_secs(args.interval.max(1));

    let finished = tokio::select! {
        joined = &mut fetch_task => Some(joined),
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "Failed to listen for Ctrl-C");
            }
            None
        }
        () = display(&engine, cli, refresh) => None,
    };

    info!("Stopping watch mode");
    // Receivers may already be gone if both tasks ended.
    let _ = shutdown_tx.send(true);
    notify_task.await?;

    let fetch_result = match finished {
        Some(joined) => joined?,
        None => fetch_task.await?,
    };
    fetch_result?;

    Ok(())
}

/// Redraws the cached usage on a fixed cadence. Never returns.
async fn display(engine: &FetchEngine, cli: &Cli, refresh: Duration) {
    let text = TextFormatter::new(!cli.no_color);
    let json = JsonFormatter::new(false);
    let mut ticker = interval(refresh);

    loop {
        ticker.tick().await;

        let state = engine.run_state().await;
        let snapshot = engine.cached_snapshot().await;

        match cli.format {
            OutputFormat::Text => {
                let now = engine.clock().now_epoch();
                let mut out = stdout();
                // Clear screen
                let _ = write!(out, "\x1b[2J\x1b[H");
                let _ = out.flush();

                let clock = chrono::Local::now();
                println!(
                    "TallyBar Watch Mode - {} (refresh: {}s)",
                    clock.format("%H:%M:%S"),
                    refresh.as_secs()
                );
                println!("{}", "─".repeat(50));
                println!();

                match &snapshot {
                    Some(snapshot) => {
                        println!("{}", text.format_usage(snapshot, engine.provider_name(), &state, now));
                    }
                    None if state.has_error() => {
                        println!("{}", text.format_error(engine.provider_name(), &state.last_error));
                    }
                    None => println!("Waiting for first fetch..."),
                }

                println!();
                println!("Press Ctrl+C to exit");
            }
            OutputFormat::Json => {
                if let Some(snapshot) = &snapshot {
                    match json.format(&usage_output(snapshot, engine.provider_name(), &state)) {
                        Ok(line) => println!("{line}"),
                        Err(e) => warn!(error = %e, "Failed to encode usage"),
                    }
                }
            }
        }
    }
}
