//! Providers command - list available providers.

use anyhow::Result;
use tallybar_fetch::CredentialStore;
use tallybar_providers::{credential_store, ZaiRegion};
use tracing::info;

use super::{build_registry, load_config};
use crate::output::{JsonFormatter, ProviderInfoOutput, TextFormatter};
use crate::{Cli, OutputFormat};

/// Runs the providers command.
pub async fn run(cli: &Cli) -> Result<()> {
    info!("Listing providers");

    let config = load_config(cli)?;
    let registry = build_registry(&config)?;
    let default_id = registry.default_provider()?.id().to_string();

    let mut infos = Vec::with_capacity(registry.count());
    for provider in registry.all() {
        infos.push(ProviderInfoOutput {
            id: provider.id().to_string(),
            display_name: provider.display_name().to_string(),
            is_default: provider.id() == default_id,
            has_key: credential_store(provider.id()).exists().await,
            reset_interval_secs: provider.reset_interval_secs(),
            dashboard_url: ZaiRegion::from_id(provider.id())
                .map(|region| region.dashboard_url().to_string()),
        });
    }

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);

            println!("{}", formatter.format_providers_header());
            println!("{}", "─".repeat(70));

            for info in &infos {
                println!("{}", formatter.format_provider_line(info));
            }

            println!();
            println!(
                "Total: {} providers ({} with a key)",
                infos.len(),
                infos.iter().filter(|info| info.has_key).count()
            );
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&infos)?);
        }
    }

    Ok(())
}
