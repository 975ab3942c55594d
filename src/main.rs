//! Upgrade Planner - command-line entry point
//!
//! Reads the documents named on the command line, runs the planner, and
//! prints JSON to stdout. Logs go to stderr.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{debug, error, info};

use upgrade_planner::cli::{Cli, Commands, parse_version_pair};
use upgrade_planner::{
    DefaultFamilies, PackageEventCatalog, RepositoryCatalog, SystemFacts, UpgradeContext,
    load_catalogs, plan_upgrade,
};

/// Initialize tracing with `RUST_LOG` support
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn read_document(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse_args();
    debug!("CLI arguments parsed");

    match cli.command {
        Commands::ValidateRepomap { document, mapping } => {
            info!("Validating repository mapping: {:?}", document);
            let text = read_document(&document)?;
            let catalog = RepositoryCatalog::from_json_str(&text, DefaultFamilies::default())
                .inspect_err(|e| error!("Repository mapping validation failed: {}", e))?;

            if let Some(pair) = mapping {
                let Some((source, target)) = parse_version_pair(&pair) else {
                    bail!("Invalid version pair '{}', expected SOURCE:TARGET", pair);
                };
                match catalog.mapping_for(&source, &target) {
                    Some(entries) => print_json(&entries, cli.pretty)?,
                    None => bail!("No mapping rules for {} -> {}", source, target),
                }
            } else {
                println!("✓ Repository mapping is valid: {:?}", document);
            }
        }
        Commands::ValidateEvents { document } => {
            info!("Validating package events: {:?}", document);
            let text = read_document(&document)?;
            let catalog = PackageEventCatalog::from_json_str(&text)
                .inspect_err(|e| error!("Package event validation failed: {}", e))?;
            println!(
                "✓ Package event document is valid: {} concrete events",
                catalog.len()
            );
        }
        Commands::Plan {
            repomap,
            events,
            context,
            facts,
        } => {
            let context = UpgradeContext::load_from_file(&context)?;
            context.validate().context("Invalid upgrade context")?;

            let (repositories, events) =
                load_catalogs(&read_document(&repomap)?, &read_document(&events)?, &context)?;
            let facts = SystemFacts::from_json_str(&read_document(&facts)?)?;

            let plan = plan_upgrade(&repositories, &events, &context, &facts);
            print_json(&plan, cli.pretty)?;
        }
    }

    Ok(())
}
