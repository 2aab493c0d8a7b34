//! Nightly image indexer CLI
//!
//! Entry point for the `nightly-index` command-line tool.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use nightly_index::config::DEFAULT_CONFIG_FILE;
use nightly_index::{build_backends, Config, Pipeline, RunSummary};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nightly-index")]
#[command(about = "Generate index files for nightly image hosting", version)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, short = 'c', default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Override the output directory from the configuration
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Plan retention and log what would be deleted, without deleting
    #[arg(long)]
    dry_run: bool,

    /// Skip retention entirely
    #[arg(long, conflicts_with = "dry_run")]
    no_retention: bool,

    /// Log filter when RUST_LOG is not set (e.g. "debug", "nightly_index=trace")
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,

    /// Variants to build (default: all configured variants)
    variants: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }
    };

    if let Some(output) = cli.output {
        config.output_dir = output;
    }
    if cli.dry_run {
        config.retention.dry_run = true;
    }
    if cli.no_retention {
        config.retention.enabled = false;
    }

    let backends = build_backends(&config);
    let pipeline = Pipeline::new(&config, backends);

    match pipeline.run(&cli.variants) {
        Ok(summary) => {
            if cli.json {
                match serde_json::to_string_pretty(&summary) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Error serializing summary: {}", e);
                        process::exit(1);
                    }
                }
            } else {
                print_summary(&summary);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn print_summary(summary: &RunSummary) {
    for report in &summary.variants {
        let status = if report.is_unavailable() {
            "UNAVAILABLE"
        } else if report.is_partial() {
            "PARTIAL"
        } else {
            "OK"
        };
        println!(
            "{:<12} {:<12} {:>5} revisions  current: {}",
            report.variant,
            status,
            report.rows,
            if report.current.is_empty() {
                "-".to_string()
            } else {
                report.current.join(", ")
            }
        );
        if !report.failed_locations.is_empty() {
            println!("  failed locations: {}", report.failed_locations.join(", "));
        }
        for retention in &report.retention {
            if retention.skipped.is_some() {
                continue;
            }
            println!(
                "  retention @{}: kept {}, dropped {}, {} {} file(s){}",
                retention.location,
                retention.kept,
                retention.dropped,
                if retention.dry_run { "would delete" } else { "deleted" },
                retention.deleted_files.len(),
                if retention.errors.is_empty() {
                    String::new()
                } else {
                    format!(", {} error(s)", retention.errors.len())
                }
            );
        }
    }
    if !summary.maps_written {
        println!("rewrite maps not regenerated");
    }
}
