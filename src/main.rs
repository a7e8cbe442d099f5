//! Pkgdepot CLI - merge package metadata stores and resolve dependency links

use clap::{Parser, Subcommand};
use pkgdepot::config::ImportConfig;
use pkgdepot::ledger::Ledger;
use pkgdepot::pipeline;
use pkgdepot::storage::DepotStore;
use pkgdepot::ui;
use pkgdepot::ui::Icons;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pkgdepot")]
#[command(version)]
#[command(about = "Merge package repository metadata stores and resolve dependency links")]
#[command(long_about = r#"
Pkgdepot builds one queryable dependency store per configured dataset:
  • Merges N per-repository metadata stores into a staging store
  • Picks one authoritative version per source package name
  • Links binary packages to the source they were built from
  • Resolves every requirement to the provisions that satisfy it

Example usage:
  pkgdepot import --config pkgdepot.toml
  pkgdepot list
  pkgdepot stats --name mainline
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import every configured dataset
    Import {
        /// Path to the import configuration file
        #[arg(short, long, default_value = "pkgdepot.toml")]
        config: PathBuf,

        /// Directory for destination stores (overrides the config file)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Number of datasets to import concurrently
        #[arg(short, long, default_value = "1")]
        jobs: usize,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List imported datasets
    List {
        /// Directory holding the destination stores
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },

    /// Show row counts for one dataset store
    Stats {
        /// Dataset name
        #[arg(short, long)]
        name: String,

        /// Directory holding the destination stores
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },

    /// Delete a dataset store and its ledger entry
    Drop {
        /// Dataset name
        #[arg(short, long)]
        name: String,

        /// Directory holding the destination stores
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Import {
            config,
            data_dir,
            jobs,
            format,
        } => {
            let import_config = ImportConfig::load(&config)?;
            let data_dir = import_config.resolve_data_dir(data_dir);
            let total = import_config
                .datasets
                .iter()
                .filter(|d| d.is_importable())
                .count();

            ui::header(&format!("Importing {} datasets", total));
            ui::info("Config", &config.display().to_string());
            ui::info("Data dir", &data_dir.display().to_string());
            if jobs > 1 {
                ui::info("Workers", &jobs.to_string());
            }

            let started = Instant::now();
            let (progress, events) = ui::ImportProgress::new(total);
            let outcomes = pipeline::run_batch(&import_config, &data_dir, jobs, events)?;
            progress.finish();

            if format == "json" {
                let report: Vec<serde_json::Value> = outcomes
                    .iter()
                    .map(|outcome| match &outcome.result {
                        Ok(report) => serde_json::json!({
                            "dataset": outcome.dataset.name,
                            "imported": true,
                            "report": report,
                        }),
                        Err(err) => serde_json::json!({
                            "dataset": outcome.dataset.name,
                            "imported": false,
                            "error": err.to_string(),
                        }),
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                ui::section("Import Report");
                for outcome in &outcomes {
                    match &outcome.result {
                        Ok(report) => {
                            ui::summary_row(
                                &outcome.dataset.name,
                                &format!(
                                    "{} {}  {} {}  {} {} requires ({} dropped)",
                                    Icons::PACKAGE,
                                    report.counts.sources + report.counts.binaries,
                                    Icons::LINK,
                                    report.counts.provides,
                                    Icons::GEAR,
                                    report.counts.requires,
                                    report.counts.dropped_requires
                                ),
                            );
                        }
                        Err(err) => {
                            ui::summary_row(&outcome.dataset.name, &format!("not imported: {}", err));
                        }
                    }
                }

                let imported = outcomes.iter().filter(|o| o.succeeded()).count();
                let failed = outcomes.len() - imported;
                ui::batch_summary(started.elapsed(), imported, failed);
                if failed > 0 {
                    ui::warn(&format!("{} datasets were not imported", failed));
                }
            }
        }

        Commands::List { data_dir } => {
            let data_dir = data_dir.unwrap_or_else(pkgdepot::config::default_data_dir);
            let entries = Ledger::new(&data_dir).load()?;

            if entries.is_empty() {
                println!("∅ No datasets imported yet.");
            } else {
                ui::status(
                    Icons::DATABASE,
                    "Imported datasets",
                    &data_dir.display().to_string(),
                );
                println!("{}", ui::dataset_table(&entries));
            }
        }

        Commands::Stats { name, data_dir } => {
            let data_dir = data_dir.unwrap_or_else(pkgdepot::config::default_data_dir);
            let depot = DepotStore::open(&data_dir, &name)?;
            let stats = depot.stats()?;

            println!("{} Dataset statistics: {}", Icons::STATS, name);
            println!(
                "{}",
                ui::stats_table(&[
                    ("Source packages", &stats.sources.to_string()),
                    ("Binary packages", &stats.binaries.to_string()),
                    ("Provides", &stats.provides.to_string()),
                    ("Requires", &stats.requires.to_string()),
                ])
            );
        }

        Commands::Drop { name, data_dir } => {
            let data_dir = data_dir.unwrap_or_else(pkgdepot::config::default_data_dir);
            let existed = DepotStore::drop_database(&data_dir, &name)?;
            Ledger::new(&data_dir).remove(&name)?;

            if existed {
                ui::success(&format!("Dropped dataset {}", name));
            } else {
                ui::error(&format!("Dataset {} does not exist", name));
            }
        }
    }

    Ok(())
}
