//! Command-line mosque explorer.
//!
//! Loads the list from the configured source, determines the position to
//! rank against, and prints the district options and the nearest mosques.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use minaret::config::{Config, SourceKind};
use minaret::geo::{distance_meters, format_coordinates_default, format_distance};
use minaret::location::{FixedLocation, Unsupported, UserPosition};
use minaret::source::MosqueSource;
use minaret::store::{Explorer, FetchStatus};
use minaret::view::{derive_view, ExplorerView, ViewState};
use minaret::{GeoPoint, Mosque};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "explore")]
#[command(about = "List Istanbul mosques by distance")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Read a static extract instead of querying Overpass
    #[arg(long)]
    static_file: Option<PathBuf>,

    /// Overpass feature filter (blank means the default mosque query)
    #[arg(long)]
    query: Option<String>,

    /// Latitude of your position
    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude of your position
    #[arg(long, allow_hyphen_values = true)]
    lon: Option<f64>,

    /// District to show, or "all"
    #[arg(long, default_value = "all")]
    district: String,

    /// Accent-insensitive name search
    #[arg(long)]
    search: Option<String>,

    /// Number of list entries (5-500)
    #[arg(long)]
    limit: Option<usize>,

    /// OSM id of the mosque to show details for
    #[arg(long)]
    select: Option<i64>,

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
    if let Some(path) = &args.static_file {
        config.source.kind = SourceKind::Static;
        config.static_data.path = Some(path.clone());
    }

    let normalizer = config.normalizer()?;
    match config.source.kind {
        SourceKind::Overpass => {
            let source = config.overpass_source(normalizer)?;
            run(Explorer::new(source), &config, &args).await
        }
        SourceKind::Static => {
            let source = config.static_source(normalizer)?;
            run(Explorer::new(source), &config, &args).await
        }
    }
}

async fn run<S: MosqueSource>(explorer: Explorer<S>, config: &Config, args: &Args) -> Result<()> {
    info!("Loading mosques from {}", explorer.source().describe());
    explorer.refresh().await;
    if explorer.status() == FetchStatus::Error {
        bail!(
            "Loading mosques failed: {}",
            explorer.error().unwrap_or_default()
        );
    }

    let fallback = config.location.fallback_point()?;
    let options = config.location.options();
    let position = match (args.lat, args.lon) {
        (Some(lat), Some(lon)) => {
            let point = GeoPoint::checked(lat, lon)
                .with_context(|| format!("Invalid position {lat}, {lon}"))?;
            explorer.locate(&FixedLocation(point), &options, fallback).await
        }
        (None, None) => explorer.locate(&Unsupported, &options, fallback).await,
        _ => bail!("--lat and --lon must be given together"),
    };
    explorer.close();

    let mut state = config.view_state();
    state.district = args.district.parse()?;
    state.search = args.search.clone();
    state.selected = args.select;
    if let Some(limit) = args.limit {
        state.set_list_limit(limit);
    }

    let mosques = explorer.mosques();
    let view = derive_view(&mosques, &state, position.as_ref());
    print_view(&view, &state, position.as_ref());
    Ok(())
}

fn print_view(view: &ExplorerView<'_>, state: &ViewState, position: Option<&UserPosition>) {
    println!("{}", view.geo_status);
    println!(
        "Districts ({}): {}",
        view.district_options.len(),
        view.district_options.join(", ")
    );
    println!(
        "Filter: {} | showing {} of {} ({} total)",
        state.district,
        view.displayed_count(),
        view.filtered_count(),
        view.total_count
    );
    println!();

    if view.is_filtered_empty() {
        println!("No mosques match this filter. Try --district all.");
        return;
    }
    if view.total_count == 0 {
        println!("No mosques were found for the Istanbul area.");
        return;
    }

    let selected_id = view.selected.map(|m| m.id);
    for (rank, mosque) in view.displayed.iter().enumerate() {
        let marker = if Some(mosque.id) == selected_id { '*' } else { ' ' };
        let distance = position
            .map(|p| format_distance(distance_meters(mosque.position, p.coords)))
            .unwrap_or_default();
        println!(
            "{marker}{:>4}. {:<40} {:<16} {:>9}",
            rank + 1,
            mosque.name,
            mosque.district.as_deref().unwrap_or("-"),
            distance
        );
    }
    if view.truncated {
        println!(
            "  ... {} more, raise --limit to see them",
            view.ranked.len() - view.displayed.len()
        );
    }

    if let Some(mosque) = view.selected {
        println!();
        print_details(mosque);
    }
}

fn print_details(mosque: &Mosque) {
    println!("{}", mosque.name);
    println!("  Coordinates:  {}", format_coordinates_default(mosque.position));
    let fields = [
        ("District", mosque.district.as_deref()),
        ("Neighborhood", mosque.neighborhood.as_deref()),
        ("Street", mosque.street.as_deref()),
        ("Wikidata", mosque.refs.wikidata.as_deref()),
        ("OSM", mosque.refs.source_url.as_deref()),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("  {:<13} {}", format!("{label}:"), value);
        }
    }
    if let Some(attributes) = &mosque.attributes {
        if let Some(capacity) = &attributes.capacity {
            println!("  {:<13} {}", "Capacity:", capacity);
        }
        if let Some(accessibility) = &attributes.accessibility {
            println!("  {:<13} {}", "Wheelchair:", accessibility);
        }
    }
}
