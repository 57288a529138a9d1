use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use travelmap::api::NominatimClient;
use travelmap::config::FileConfig;
use travelmap::domain::MetadataTable;
use travelmap::layers::{
    CitiesReport, CountriesReport, CountryOptions, load_metadata, run_cities, run_countries,
};
use travelmap::legend::Legend;

/// Generate country and city GeoJSON layers for a personal travel map
///
/// Examples:
///   # Generate both layers into dist/
///   travelmap
///
///   # Only rebuild the country polygons, with simplified outlines
///   travelmap --simplify 0.01 countries
///
///   # Geocode newly added cities, reusing dist/cities.geojson as cache
///   travelmap -v cities
///
///   # Show the colour legend the map will use
///   travelmap legend
#[derive(Parser, Debug)]
#[command(name = "travelmap")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to config file (optional, auto-searches travelmap.toml if not provided)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Travel metadata table (defaults to data.json)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Base country boundaries with an ISO_A2 property (defaults to vendor/countries.geojson)
    #[arg(long, global = true)]
    boundaries: Option<PathBuf>,

    /// Output directory for countries.geojson and cities.geojson (defaults to dist)
    #[arg(short = 'o', long, global = true)]
    out_dir: Option<PathBuf>,

    /// Outline simplification tolerance in degrees, 0 = off
    #[arg(long, global = true)]
    simplify: Option<f64>,

    /// Enable verbose logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Build both layers concurrently (default)
    Generate,
    /// Build the country layer only
    Countries,
    /// Build the city layer only
    Cities,
    /// Print the colour legend for the metadata table
    Legend,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let total_start = Instant::now();

    let mut config = match args.config {
        Some(ref path) => FileConfig::from_path(path)?,
        None => FileConfig::load().unwrap_or_default(),
    };
    if let Some(data) = args.data.clone() {
        config.data = data;
    }
    if let Some(boundaries) = args.boundaries.clone() {
        config.boundaries = boundaries;
    }
    if let Some(out_dir) = args.out_dir.clone() {
        config.out_dir = out_dir;
    }
    if let Some(tolerance) = args.simplify {
        config.simplify_tolerance = tolerance;
    }
    config.verbose |= args.verbose;

    let level = if config.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let metadata = load_metadata(&config.data)?;
    log::debug!(
        "Loaded {} countries from {}",
        metadata.len(),
        config.data.display()
    );

    let command = args.command.unwrap_or(Command::Generate);
    if command == Command::Legend {
        print_legend(&Legend::build(&metadata));
        return Ok(());
    }

    println!("travelmap - Travel Map Layer Generator");
    println!("======================================");
    println!();

    if config.verbose {
        println!("Configuration:");
        println!("  Metadata: {}", config.data.display());
        println!("  Boundaries: {}", config.boundaries.display());
        println!("  Countries output: {}", config.countries_output().display());
        println!("  Cities output: {}", config.cities_output().display());
        println!(
            "  Precision: {} decimals ({} for extra components)",
            config.precision.coordinates, config.precision.extras
        );
        println!("  Simplify tolerance: {}", config.simplify_tolerance);
        println!("  Geocoder: {}", config.geocoder.url);
        println!();
    }

    let progress = MultiProgress::new();
    let (countries, cities) = match command {
        Command::Countries => (Some(countries_layer(&config, &metadata, &progress)), None),
        Command::Cities => (None, Some(cities_layer(&config, &metadata, &progress))),
        _ => thread::scope(|s| {
            let countries = s.spawn(|| countries_layer(&config, &metadata, &progress));
            let cities = s.spawn(|| cities_layer(&config, &metadata, &progress));
            (
                Some(join_layer(countries.join(), "country")),
                Some(join_layer(cities.join(), "city")),
            )
        }),
    };

    let mut errors = Vec::new();
    println!();
    if let Some(result) = countries {
        match result {
            Ok(report) => print_countries_report(&report),
            Err(e) => errors.push(e),
        }
    }
    if let Some(result) = cities {
        match result {
            Ok(report) => print_cities_report(&report),
            Err(e) => errors.push(e),
        }
    }

    if let Some(last) = errors.pop() {
        for e in &errors {
            eprintln!("Error: {:#}", e);
        }
        return Err(last);
    }

    println!();
    println!(
        "Done! Total time: {:.1}s",
        total_start.elapsed().as_secs_f32()
    );

    Ok(())
}

fn countries_layer(
    config: &FileConfig,
    metadata: &MetadataTable,
    progress: &MultiProgress,
) -> Result<CountriesReport> {
    let spinner = progress.add(create_spinner("Joining country boundaries..."));
    let start = Instant::now();
    let options = CountryOptions {
        precision: config.precision.to_precision(),
        simplify_tolerance: config.simplify_tolerance,
    };

    let result = run_countries(
        metadata,
        &config.boundaries,
        &config.countries_output(),
        &options,
    );
    match &result {
        Ok(report) => spinner.finish_with_message(format!(
            "Joined {} countries [{:.1}s]",
            report.written,
            start.elapsed().as_secs_f32()
        )),
        Err(_) => spinner.abandon_with_message("Country layer failed"),
    }
    result
}

fn cities_layer(
    config: &FileConfig,
    metadata: &MetadataTable,
    progress: &MultiProgress,
) -> Result<CitiesReport> {
    let spinner = progress.add(create_spinner("Resolving cities..."));
    let start = Instant::now();

    let result = NominatimClient::new(&config.geocoder)
        .context("Failed to set up geocoder")
        .and_then(|mut geocoder| {
            let lookup_spinner = spinner.clone();
            run_cities(
                metadata,
                &config.cities_output(),
                &mut geocoder,
                move |i, total, city| {
                    lookup_spinner.set_message(format!(
                        "Geocoding {}/{}: {}",
                        i + 1,
                        total,
                        city.query()
                    ))
                },
            )
        });
    match &result {
        Ok(report) => spinner.finish_with_message(format!(
            "Resolved {} cities ({} cached, {} geocoded) [{:.1}s]",
            report.cached + report.resolved,
            report.cached,
            report.resolved,
            start.elapsed().as_secs_f32()
        )),
        Err(_) => spinner.abandon_with_message("City layer failed"),
    }
    result
}

fn join_layer<T>(joined: thread::Result<Result<T>>, layer: &str) -> Result<T> {
    joined.map_err(|_| anyhow!("The {} layer thread panicked", layer))?
}

fn print_countries_report(report: &CountriesReport) {
    println!(
        "Countries: {} written to {}",
        report.written,
        report.output.display()
    );
    if !report.dropped.is_empty() {
        println!(
            "  No boundary for: {} (skipped)",
            report.dropped.join(", ")
        );
    }
}

fn print_cities_report(report: &CitiesReport) {
    println!(
        "Cities: {} written to {} ({} from cache, {} geocoded)",
        report.cached + report.resolved,
        report.output.display(),
        report.cached,
        report.resolved
    );
}

fn print_legend(legend: &Legend) {
    for (title, entries) in legend.groups() {
        if entries.is_empty() {
            continue;
        }
        println!("{}", title);
        for entry in entries {
            println!(
                "  {}  {} ({}) - {}",
                entry.color, entry.name, entry.code, entry.status
            );
        }
        println!();
    }
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}
