#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the safety map.
//!
//! Loads incidents from a JSON file, buckets them into the risk grid and
//! either reports the grid, writes the high-risk overlay as `GeoJSON`,
//! checks a point against it, or plans a route that avoids it.

mod config;

use std::io::Write as _;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use safety_map_incident_models::{IncidentFilter, IncidentPoint, LngLat, distinct_values};
use safety_map_location::safe_route::SafeRoutePlanner;
use safety_map_location::{LocationService, PlaceCategory, create_service_from_env};
use safety_map_spatial::{RiskZoneIndex, risk_zones, to_feature_collection};

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "safety_map", about = "Risk zones and safe routes from incident data")]
struct Cli {
    /// Config file (defaults to `safety_map.toml` if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Incident JSON file
    #[arg(long, global = true, default_value = "data/incidents.json")]
    incidents: PathBuf,

    /// Only use incidents from this city
    #[arg(long, global = true)]
    city: Option<String>,

    /// Only use incidents from this district
    #[arg(long, global = true)]
    district: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every grid cell, busiest first
    Cells {
        /// Show at most this many cells
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Write high-risk zones as a `GeoJSON` `FeatureCollection`
    Zones {
        /// Output file (stdout if omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// List the cities and districts present in the incident file
    Areas,
    /// Check whether a point lies in a high-risk zone
    Check {
        /// Point as `lng,lat`
        at: LngLat,
    },
    /// Search for a place by name
    Search {
        text: String,
        /// Location provider ID (see `services/`)
        #[arg(long)]
        provider: Option<String>,
    },
    /// Find nearby police stations, hospitals, etc.
    Nearby {
        /// Point as `lng,lat`
        at: LngLat,
        #[arg(long, default_value = "police")]
        category: PlaceCategory,
        /// Search radius in metres
        #[arg(long, default_value_t = 5_000.0)]
        radius: f64,
        #[arg(long)]
        provider: Option<String>,
    },
    /// Plan a route that avoids high-risk zones
    Route {
        /// Start as `lng,lat` or a place name
        from: String,
        /// Destination as `lng,lat` or a place name
        to: String,
        #[arg(long)]
        provider: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    let filter = IncidentFilter {
        city: cli.city.clone(),
        district: cli.district.clone(),
    };

    match cli.command {
        Commands::Cells { limit } => {
            let incidents = load_incidents(&cli.incidents, &filter)?;
            print_cells(&config, &incidents, limit)?;
        }
        Commands::Zones { output } => {
            let incidents = load_incidents(&cli.incidents, &filter)?;
            write_zones(&config, &incidents, output.as_deref())?;
        }
        Commands::Areas => {
            let incidents = load_incidents(&cli.incidents, &filter)?;
            print_areas(&incidents);
        }
        Commands::Check { at } => {
            let incidents = load_incidents(&cli.incidents, &filter)?;
            check_point(&config, &incidents, at)?;
        }
        Commands::Search { text, provider } => {
            let service = provider_for(&config, provider.as_deref())?;
            for place in service.search_place(&text).await? {
                println!("{}  {}  ({})", place.position, place.label, place.id);
            }
        }
        Commands::Nearby {
            at,
            category,
            radius,
            provider,
        } => {
            let service = provider_for(&config, provider.as_deref())?;
            let places = service.nearby_places(at, category, radius).await?;
            if places.is_empty() {
                println!("No {category} within {radius:.0} m of {at}");
            }
            for place in places {
                println!(
                    "{}  {}{}",
                    place.position,
                    place.label,
                    place
                        .address
                        .map(|a| format!(" - {a}"))
                        .unwrap_or_default()
                );
            }
        }
        Commands::Route { from, to, provider } => {
            let incidents = load_incidents(&cli.incidents, &filter)?;
            let service = provider_for(&config, provider.as_deref())?;
            plan_route(&config, service.as_ref(), &incidents, &from, &to).await?;
        }
    }

    Ok(())
}

fn load_incidents(
    path: &Path,
    filter: &IncidentFilter,
) -> Result<Vec<IncidentPoint>, Box<dyn std::error::Error>> {
    let file = std::fs::File::open(path)
        .map_err(|e| format!("Failed to open incidents file {}: {e}", path.display()))?;
    let incidents: Vec<IncidentPoint> = serde_json::from_reader(std::io::BufReader::new(file))?;
    let filtered = filter.apply(&incidents);

    log::info!(
        "Loaded {} incidents from {} ({} after filtering)",
        incidents.len(),
        path.display(),
        filtered.len()
    );

    Ok(filtered)
}

fn provider_for(
    config: &AppConfig,
    provider: Option<&str>,
) -> Result<Box<dyn LocationService>, Box<dyn std::error::Error>> {
    let id = provider.or(config.location.provider.as_deref());
    Ok(create_service_from_env(id)?)
}

fn print_cells(
    config: &AppConfig,
    incidents: &[IncidentPoint],
    limit: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let grid = config.grid.aggregator().aggregate(incidents)?;
    let thresholds = config.grid.thresholds()?;

    println!(
        "{} incidents in {} cells (grid size {}°)",
        incidents.len(),
        grid.len(),
        grid.size().degrees()
    );

    for cell in grid.by_count().into_iter().take(limit.unwrap_or(usize::MAX)) {
        let marker = if cell.is_high_risk(thresholds) {
            "HIGH"
        } else {
            "    "
        };
        let sw = grid.ring(cell.key).south_west();
        println!(
            "{marker}  cell {:>12}  sw {}  count {:>3}  severity {:>3}",
            cell.key.to_string(),
            sw,
            cell.count(),
            cell.weighted_severity
        );
    }

    Ok(())
}

fn write_zones(
    config: &AppConfig,
    incidents: &[IncidentPoint],
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let grid = config.grid.aggregator().aggregate(incidents)?;
    let zones = risk_zones(&grid, config.grid.thresholds()?);
    let json = serde_json::to_string_pretty(&to_feature_collection(&zones))?;

    if let Some(path) = output {
        std::fs::write(path, json)?;
        log::info!("Wrote {} risk zones to {}", zones.len(), path.display());
    } else {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{json}")?;
    }

    Ok(())
}

fn print_areas(incidents: &[IncidentPoint]) {
    for city in distinct_values(incidents, |i| i.city.as_deref()) {
        println!("{city}");
        let in_city: Vec<IncidentPoint> = IncidentFilter {
            city: Some(city.clone()),
            district: None,
        }
        .apply(incidents);
        for district in distinct_values(&in_city, |i| i.district.as_deref()) {
            println!("  {district}");
        }
    }
}

fn check_point(
    config: &AppConfig,
    incidents: &[IncidentPoint],
    at: LngLat,
) -> Result<(), Box<dyn std::error::Error>> {
    let grid = config.grid.aggregator().aggregate(incidents)?;
    let index = RiskZoneIndex::new(grid.size(), risk_zones(&grid, config.grid.thresholds()?));

    match index.zone_at(at) {
        Some(zone) => println!(
            "{at} is inside a high-risk zone (cell {}): {}, weighted severity {}",
            zone.key,
            zone.description(),
            zone.weighted_severity
        ),
        None => println!(
            "{at} is not inside any of {} high-risk zones",
            index.len()
        ),
    }

    Ok(())
}

/// Parses `lng,lat`, falling back to the provider's first search result.
async fn resolve_endpoint(
    service: &dyn LocationService,
    text: &str,
) -> Result<LngLat, Box<dyn std::error::Error>> {
    if let Ok(point) = text.parse::<LngLat>() {
        return Ok(point);
    }

    let place = service
        .search_place(text)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| format!("No place found for '{text}'"))?;
    log::info!("Resolved '{text}' to {} at {}", place.label, place.position);
    Ok(place.position)
}

async fn plan_route(
    config: &AppConfig,
    service: &dyn LocationService,
    incidents: &[IncidentPoint],
    from: &str,
    to: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = resolve_endpoint(service, from).await?;
    let end = resolve_endpoint(service, to).await?;

    let planner = SafeRoutePlanner::new(
        service,
        config.grid.aggregator(),
        config.grid.thresholds()?,
    );
    let route = planner.plan(start, end, incidents).await?;

    println!(
        "Route {} -> {}: {:.2} km, {:.0} min, {} points",
        route.start,
        route.end,
        route.distance_m / 1_000.0,
        route.duration_s / 60.0,
        route.path.len()
    );
    println!("Avoided {} high-risk zones", route.avoided.len());
    if !route.crossed.is_empty() {
        let cells: Vec<String> = route.crossed.iter().map(ToString::to_string).collect();
        println!("Warning: route passes through {}", cells.join(" "));
    }
    println!("{}", serde_json::to_string(&route.path)?);

    Ok(())
}
