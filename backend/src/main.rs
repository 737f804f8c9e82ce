//! Quality Management Platform - vehicle-type standardization CLI
//!
//! Normalizes free-text vehicle-type labels in the hosted database: merges
//! duplicate catalog rows and rewrites every dependent table to the
//! canonical spelling.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qms_maintenance::services::{
    RunScope, SeedingService, StandardizationService, StandardizationSettings,
};
use qms_maintenance::{Config, PostgrestClient, StandardizationReport};
use qms_shared::VehicleTypeNormalizer;

/// Vehicle-type standardization for the quality-management database
#[derive(Parser)]
#[command(name = "qms-standardize")]
#[command(version)]
#[command(about = "Standardize vehicle-type labels across the quality-management database")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Compute and report changes without writing anything
    #[arg(long, global = true)]
    dry_run: bool,

    /// Output format of the final report
    #[arg(short, long, value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    /// Write labels that matched no rule to this CSV file
    #[arg(long, global = true)]
    unmatched_csv: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// Merge catalog duplicates, then cascade into dependent tables (default)
    Run,

    /// Merge and relabel vehicle-type catalog rows only
    Products,

    /// Rewrite dependent tables only
    References,

    /// Add vehicle types found in dependent tables to the catalog
    Seed,

    /// Add part codes found in dependent tables to the parts catalog
    SeedParts,

    /// Show how labels normalize, without touching the database
    Check {
        /// Labels to normalize
        #[arg(required = true)]
        labels: Vec<String>,
    },

    /// List canonical labels, aliases and fallback rules
    Catalog,
}

#[derive(Copy, Clone)]
enum SeedTarget {
    VehicleTypes,
    Parts,
}

#[derive(Copy, Clone, ValueEnum, PartialEq)]
enum OutputFormat {
    Human,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    init_logging(cli.verbose);

    match execute(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "qms_standardize=debug,qms_maintenance=debug"
    } else {
        "qms_standardize=info,qms_maintenance=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn execute(cli: &Cli) -> anyhow::Result<()> {
    match cli.command.clone().unwrap_or(Commands::Run) {
        Commands::Run => standardize(cli, RunScope::All).await,
        Commands::Products => standardize(cli, RunScope::Products).await,
        Commands::References => standardize(cli, RunScope::References).await,
        Commands::Seed => seed(cli, SeedTarget::VehicleTypes).await,
        Commands::SeedParts => seed(cli, SeedTarget::Parts).await,
        Commands::Check { labels } => check(&labels, cli.format),
        Commands::Catalog => print_catalog(cli.format),
    }
}

async fn standardize(cli: &Cli, scope: RunScope) -> anyhow::Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    tracing::info!("Starting vehicle-type standardization");
    tracing::info!("Environment: {}", config.environment);

    let normalizer = config.standardization.normalizer()?;
    let settings = StandardizationSettings::from_config(&config.standardization, cli.dry_run);
    let service = StandardizationService::new(PostgrestClient::new(&config.supabase), normalizer, settings);

    let report = service.run(scope).await?;
    emit_report(cli, &report)?;

    let errors = report.total_errors();
    if errors > 0 {
        tracing::warn!("{} items failed and were skipped; see the log above", errors);
    }
    Ok(())
}

fn emit_report(cli: &Cli, report: &StandardizationReport) -> anyhow::Result<()> {
    match cli.format {
        OutputFormat::Human => print!("{}", report),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }

    if let Some(path) = &cli.unmatched_csv {
        let written = report
            .write_unmatched_csv(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("{} unmatched labels written to {}", written, path.display());
    }
    Ok(())
}

async fn seed(cli: &Cli, target: SeedTarget) -> anyhow::Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    tracing::info!("Starting catalog seeding");

    let normalizer = config.standardization.normalizer()?;
    let settings = StandardizationSettings::from_config(&config.standardization, cli.dry_run);
    let service = SeedingService::new(PostgrestClient::new(&config.supabase), normalizer, settings);

    let outcome = match target {
        SeedTarget::VehicleTypes => service.seed().await?,
        SeedTarget::Parts => service.seed_parts().await?,
    };
    match cli.format {
        OutputFormat::Human => print!("{}", outcome),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
    }
    Ok(())
}

/// Normalizer for offline commands: built-in catalog plus configured aliases
///
/// Credentials are not required; a malformed config file is still an error.
fn offline_normalizer() -> anyhow::Result<VehicleTypeNormalizer> {
    let config = Config::load_unvalidated().context("Failed to load configuration")?;
    Ok(config.standardization.normalizer()?)
}

fn check(labels: &[String], format: OutputFormat) -> anyhow::Result<()> {
    let normalizer = offline_normalizer()?;
    let results: Vec<_> = labels
        .iter()
        .map(|label| (label.as_str(), normalizer.classify(label)))
        .collect();

    match format {
        OutputFormat::Human => {
            for (input, normalized) in &results {
                println!("{:?} -> {:?} ({})", input, normalized.label, normalized.kind);
            }
        }
        OutputFormat::Json => {
            let rows: Vec<_> = results
                .iter()
                .map(|(input, normalized)| {
                    serde_json::json!({
                        "input": input,
                        "label": normalized.label,
                        "kind": normalized.kind,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(())
}

fn print_catalog(format: OutputFormat) -> anyhow::Result<()> {
    let normalizer = offline_normalizer()?;

    match format {
        OutputFormat::Human => {
            println!("Canonical vehicle types:");
            for label in normalizer.canonical_labels() {
                println!("  {}", label);
            }
            println!("Aliases:");
            for (alias, canonical) in normalizer.aliases() {
                println!("  {:?} -> {}", alias, canonical);
            }
            println!("Fallback rules (first match wins):");
            for rule in normalizer.rules() {
                if rule.none_of.is_empty() {
                    println!("  contains {} -> {}", rule.all_of.join(" + "), rule.canonical);
                } else {
                    println!(
                        "  contains {} but not {} -> {}",
                        rule.all_of.join(" + "),
                        rule.none_of.join(", "),
                        rule.canonical
                    );
                }
            }
        }
        OutputFormat::Json => {
            let catalog = serde_json::json!({
                "canonical": normalizer.canonical_labels(),
                "aliases": normalizer.aliases(),
                "rules": normalizer.rules(),
            });
            println!("{}", serde_json::to_string_pretty(&catalog)?);
        }
    }
    Ok(())
}
