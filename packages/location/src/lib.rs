#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Place search and route calculation for the safety map.
//!
//! Providers implement the [`LocationService`] capability trait and are
//! configured via TOML files in `services/`:
//!
//! 1. **`OpenRouteService`** (priority 1): hosted geocoding and walking
//!    directions that accept polygons to avoid. Needs an API key.
//! 2. **Offline directory** (priority 2): a fixed list of police stations,
//!    hospitals and landmarks with straight-line routes. Always available.
//!
//! [`safe_route::SafeRoutePlanner`] ties a provider to the risk grid: it
//! turns high-risk cells into avoidance polygons for the route request.

pub mod offline;
pub mod openrouteservice;
pub mod safe_route;
pub mod service_registry;

use safety_map_incident_models::LngLat;
use safety_map_spatial::{CellRing, SpatialError};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

use crate::service_registry::{LocationServiceConfig, ProviderConfig};

/// Environment variable that pins the provider by service ID.
pub const PROVIDER_ENV_VAR: &str = "SAFETY_MAP_LOCATION_PROVIDER";

/// Kind of place a provider can return.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PlaceCategory {
    Police,
    Hospital,
    FireStation,
    Landmark,
    Other,
}

/// A place returned by search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    /// Provider-specific identifier.
    pub id: String,
    /// Display label (e.g. "India Gate, New Delhi").
    pub label: String,
    pub position: LngLat,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub category: Option<PlaceCategory>,
}

/// A computed route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteGeometry {
    /// Polyline from start to end.
    pub path: Vec<LngLat>,
    /// Length in metres.
    pub distance_m: f64,
    /// Expected travel time in seconds.
    pub duration_s: f64,
}

/// Errors from location provider operations.
#[derive(Debug, Error)]
pub enum LocationError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Provider is misconfigured or missing credentials.
    #[error("Configuration error: {message}")]
    Config {
        /// What is missing or wrong.
        message: String,
    },

    /// The provider cannot perform this operation.
    #[error("{provider} does not support {operation}")]
    Unsupported {
        /// Service ID.
        provider: String,
        /// Operation name.
        operation: &'static str,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Risk grid input was invalid.
    #[error(transparent)]
    Spatial(#[from] SpatialError),
}

/// A place search and routing provider.
#[async_trait::async_trait]
pub trait LocationService: Send + Sync {
    /// Service ID from the registry (e.g. `"openrouteservice"`).
    fn id(&self) -> &str;

    /// Searches for places matching free text.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError`] if the request or response parsing fails.
    async fn search_place(&self, text: &str) -> Result<Vec<Place>, LocationError>;

    /// Calculates a route from `start` to `end` that stays out of `avoid`.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError`] if no route can be calculated.
    async fn calculate_route(
        &self,
        start: LngLat,
        end: LngLat,
        avoid: &[CellRing],
    ) -> Result<RouteGeometry, LocationError>;

    /// Finds places of `category` within `radius_m` metres, nearest first.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::Unsupported`] if the provider has no
    /// category search, or another [`LocationError`] if the lookup fails.
    async fn nearby_places(
        &self,
        position: LngLat,
        category: PlaceCategory,
        radius_m: f64,
    ) -> Result<Vec<Place>, LocationError>;
}

/// Instantiates the provider described by `config`.
///
/// # Errors
///
/// Returns [`LocationError::Config`] if required credentials are missing,
/// or [`LocationError::Http`] if the HTTP client cannot be built.
pub fn create_service(
    config: &LocationServiceConfig,
) -> Result<Box<dyn LocationService>, LocationError> {
    match &config.provider {
        ProviderConfig::OpenRouteService {
            base_url,
            api_key_env,
            profile,
            country,
            max_results,
            focus,
        } => {
            let api_key = std::env::var(api_key_env).map_err(|_| LocationError::Config {
                message: format!("{api_key_env} environment variable not set"),
            })?;
            Ok(Box::new(openrouteservice::OpenRouteService::new(
                openrouteservice::OpenRouteServiceOptions {
                    id: config.id.clone(),
                    base_url: base_url.clone(),
                    api_key,
                    profile: profile.clone(),
                    country: country.clone(),
                    max_results: *max_results,
                    focus: *focus,
                },
            )?))
        }
        ProviderConfig::Static {
            walking_speed_mps,
            max_results,
            places,
        } => Ok(Box::new(offline::StaticLocationService::new(
            config.id.clone(),
            places.clone(),
            *walking_speed_mps,
            *max_results,
        ))),
    }
}

/// Creates a provider by service ID, or picks one automatically.
///
/// With `id` (or `SAFETY_MAP_LOCATION_PROVIDER`) set, that service is used.
/// Otherwise the enabled services are tried in priority order and the first
/// one whose credentials are available wins.
///
/// # Errors
///
/// Returns [`LocationError::Config`] if the requested service does not exist
/// or no service is usable.
pub fn create_service_from_env(id: Option<&str>) -> Result<Box<dyn LocationService>, LocationError> {
    let requested = id
        .map(str::to_string)
        .or_else(|| std::env::var(PROVIDER_ENV_VAR).ok())
        .filter(|id| !id.trim().is_empty());

    if let Some(requested) = requested {
        let config = service_registry::all_services()
            .into_iter()
            .find(|svc| svc.id.eq_ignore_ascii_case(requested.trim()))
            .ok_or_else(|| LocationError::Config {
                message: format!("Unknown location provider '{requested}'"),
            })?;
        log::info!("Using location provider {} ({})", config.name, config.id);
        return create_service(&config);
    }

    for config in service_registry::enabled_services() {
        match create_service(&config) {
            Ok(service) => {
                log::info!("Using location provider {} ({})", config.name, config.id);
                return Ok(service);
            }
            Err(e) => {
                log::debug!("Skipping location provider {}: {e}", config.id);
            }
        }
    }

    Err(LocationError::Config {
        message: "No location provider is available".to_string(),
    })
}
