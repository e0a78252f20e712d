use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vidstats_core::{DateRange, PublishPolicy, RunSummary};

mod run;

#[derive(Debug, Parser)]
#[command(name = "vidstats-cli")]
#[command(about = "Video statistics ingestion pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch, reconcile, and publish statistics for a date range.
    Run(RunCommand),
}

#[derive(Debug, clap::Args)]
struct RunCommand {
    /// First day of the range, YYYY-MM-DD.
    #[arg(long)]
    start_date: String,
    /// Last day of the range (inclusive), YYYY-MM-DD.
    #[arg(long)]
    end_date: String,
    /// Report what would be written without mutating any sink.
    #[arg(long)]
    dry_run: bool,
    /// Replace existing records for matching triples instead of skipping them.
    #[arg(long)]
    overwrite: bool,
    /// Fetch fresh data from the platforms. Without this flag, records are
    /// published from the existing CSV file instead.
    #[arg(long)]
    process: bool,
    /// Override the CSV file path.
    #[arg(long)]
    csv: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = vidstats_core::load_app_config()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(cmd) => {
            let range = DateRange::parse(&cmd.start_date, &cmd.end_date)?;
            let policy = PublishPolicy {
                dry_run: cmd.dry_run,
                overwrite: cmd.overwrite,
            };
            let csv_path = cmd.csv.unwrap_or_else(|| config.default_csv_path.clone());

            let summary = run::execute(&config, &range, policy, cmd.process, &csv_path).await?;
            print_summary(&summary);

            if let Some(fatal) = &summary.fatal {
                anyhow::bail!("run failed: {fatal}");
            }
        }
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    for (platform, count) in &summary.fetched {
        println!("fetched {count} records from {platform}");
    }
    for failure in &summary.errors {
        eprintln!("error: {} fetch failed: {}", failure.platform, failure.message);
    }
    for report in &summary.sink_reports {
        println!(
            "{}: wrote {}, skipped {}, overwrote {}",
            report.sink, report.written, report.skipped, report.overwritten
        );
    }
    println!(
        "reconciled {} records; wrote {}, skipped {}, overwrote {}",
        summary.reconciled, summary.written, summary.skipped, summary.overwritten
    );
    if !summary.committed_before_failure.is_empty() {
        let triples: Vec<String> = summary
            .committed_before_failure
            .iter()
            .map(ToString::to_string)
            .collect();
        eprintln!("committed before failure: {}", triples.join(", "));
    }
}
