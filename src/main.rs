//! flostat - daily streamflow snapshot
//!
//! One invocation per run, meant to be scheduled externally:
//! 1. Fetches the last N days of discharge for every configured USGS site
//! 2. Computes summary statistics, trend, anomalies and flow condition
//! 3. Writes dated JSON artifacts for the plotting and versioning layers
//!
//! Usage:
//!   flostat                          # uses ./flostat.toml
//!   flostat --config sites.toml -v   # custom config, info logging
//!   flostat --dry-run                # analyze without writing files

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;

use flostat_service::config::{self, DEFAULT_CONFIG_PATH};
use flostat_service::logging;
use flostat_service::pipeline::Pipeline;

/// Daily streamflow statistics, trend and flow-condition snapshot.
#[derive(Parser)]
#[command(name = "flostat", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Analyze and print results without writing artifacts.
    #[arg(long)]
    dry_run: bool,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = config::load_config(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    println!("🌊 flostat - {} site(s)", config.sites.len());
    println!("============================\n");

    let pipeline = Pipeline::from_config(config)?.dry_run(cli.dry_run);
    let summary = pipeline.run_once(Utc::now()).context("run failed")?;

    for record in &summary.records {
        println!("  {:<16} {}", record.site_id, record.headline);
    }
    if !summary.fetch_failures.is_empty() {
        println!("\n⚠️  fetch failed for: {}", summary.fetch_failures.join(", "));
    }

    match (&summary.report_path, &summary.observations_path) {
        (Some(report), Some(observations)) => {
            println!("\n✓ results saved to {}", report.display());
            println!("✓ data saved to {}", observations.display());
        }
        _ => println!("\n(dry run, nothing written)"),
    }
    println!("\n{}", summary.commit_message);

    Ok(())
}
