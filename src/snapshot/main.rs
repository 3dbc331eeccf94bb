//! Fetch the current mosque list from Overpass and export it as a static
//! extract that `explore --static-file` can read.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use minaret::config::Config;
use minaret::source::Snapshot;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "snapshot")]
#[command(about = "Export Istanbul mosques from Overpass to a JSON extract")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file
    #[arg(short, long, default_value = "mosques.json")]
    output: PathBuf,

    /// Overpass feature filter (blank means the default mosque query)
    #[arg(long)]
    query: Option<String>,

    /// Overpass endpoint, repeatable; replaces the configured list
    #[arg(long = "endpoint")]
    endpoints: Vec<String>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    minaret::logging::init(args.verbose)?;

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(query) = &args.query {
        config.overpass.query = query.clone();
    }
    if !args.endpoints.is_empty() {
        config.overpass.endpoints = args.endpoints.clone();
    }

    let source = config.overpass_source(config.normalizer()?)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message("Querying Overpass...");
    pb.enable_steady_tick(Duration::from_millis(120));

    let report = source.fetch_report().await;
    pb.finish_and_clear();
    let report = report?;

    info!(
        "Fetched {} mosques from {} ({} attempts, {} backoffs)",
        report.mosques.len(),
        report.endpoint,
        report.attempts,
        report.backoffs.len()
    );

    let snapshot = Snapshot::from_mosques(&report.mosques, Utc::now());
    snapshot.write_to(&args.output)?;
    info!(
        "Wrote {} mosques ({} with district, {} without) to {}",
        snapshot.total_count,
        snapshot.with_district,
        snapshot.without_district,
        args.output.display()
    );

    Ok(())
}
