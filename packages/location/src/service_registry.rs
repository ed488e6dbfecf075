//! Compile-time registry of location provider configurations.
//!
//! Each provider is defined in a TOML file under `services/`. The registry
//! embeds these at compile time and exposes them via [`all_services`] and
//! [`enabled_services`].

use safety_map_incident_models::LngLat;
use serde::Deserialize;

use crate::Place;

/// A location provider configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct LocationServiceConfig {
    /// Unique identifier (e.g., `"openrouteservice"`, `"offline"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether automatic provider selection may pick this service.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Selection order; lower values are tried first.
    pub priority: u32,
    /// Provider-specific configuration.
    pub provider: ProviderConfig,
}

/// Provider-specific configuration, tagged by `type` in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Hosted `OpenRouteService` geocoding and directions.
    OpenRouteService {
        /// API base URL (e.g., `"https://api.openrouteservice.org"`).
        base_url: String,
        /// Environment variable holding the API key.
        api_key_env: String,
        /// Directions profile (e.g., `"foot-walking"`).
        profile: String,
        /// ISO 3166-1 alpha-3 country filter for place search.
        country: Option<String>,
        /// Maximum search results.
        #[serde(default = "default_max_results")]
        max_results: usize,
        /// Search results are biased towards this point.
        focus: Option<LngLat>,
    },
    /// Offline directory of known places.
    Static {
        /// Speed used to derive route durations.
        #[serde(default = "default_walking_speed")]
        walking_speed_mps: f64,
        /// Maximum search results.
        #[serde(default = "default_max_results")]
        max_results: usize,
        /// The directory.
        #[serde(default)]
        places: Vec<Place>,
    },
}

const fn default_true() -> bool {
    true
}

const fn default_max_results() -> usize {
    5
}

const fn default_walking_speed() -> f64 {
    1.4
}

impl LocationServiceConfig {
    /// Returns the provider's base URL regardless of variant.
    ///
    /// Returns an empty string for providers without one (e.g. `Static`).
    #[must_use]
    pub fn base_url(&self) -> &str {
        match &self.provider {
            ProviderConfig::OpenRouteService { base_url, .. } => base_url,
            ProviderConfig::Static { .. } => "",
        }
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const SERVICE_TOMLS: &[(&str, &str)] = &[
    (
        "openrouteservice",
        include_str!("../services/openrouteservice.toml"),
    ),
    ("offline", include_str!("../services/offline.toml")),
];

#[cfg(test)]
const EXPECTED_SERVICE_COUNT: usize = 2;

/// Returns all provider configurations (enabled and disabled).
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_services() -> Vec<LocationServiceConfig> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse location service '{name}': {e}"))
        })
        .collect()
}

/// Returns only enabled services, sorted by priority (ascending).
#[must_use]
pub fn enabled_services() -> Vec<LocationServiceConfig> {
    let mut services: Vec<LocationServiceConfig> =
        all_services().into_iter().filter(|s| s.enabled).collect();
    services.sort_by_key(|s| s.priority);
    services
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PlaceCategory;
    use std::collections::BTreeSet;

    #[test]
    fn loads_all_services() {
        let services = all_services();
        assert_eq!(services.len(), EXPECTED_SERVICE_COUNT);
    }

    #[test]
    fn service_ids_are_unique() {
        let services = all_services();
        let mut seen = BTreeSet::new();
        for svc in &services {
            assert!(seen.insert(&svc.id), "Duplicate service ID: {}", svc.id);
        }
    }

    #[test]
    fn all_services_have_required_fields() {
        for svc in &all_services() {
            assert!(!svc.id.is_empty(), "Service has empty id");
            assert!(!svc.name.is_empty(), "Service {} has empty name", svc.id);
            // Static directories are local and have no base_url
            if !matches!(svc.provider, ProviderConfig::Static { .. }) {
                assert!(
                    !svc.base_url().is_empty(),
                    "Service {} has empty base_url",
                    svc.id
                );
            }
        }
    }

    #[test]
    fn enabled_services_sorted_by_priority() {
        let services = enabled_services();
        for window in services.windows(2) {
            assert!(
                window[0].priority <= window[1].priority,
                "Services not sorted by priority: {} ({}) > {} ({})",
                window[0].id,
                window[0].priority,
                window[1].id,
                window[1].priority
            );
        }
    }

    #[test]
    fn offline_directory_has_police_stations() {
        let offline = all_services()
            .into_iter()
            .find(|svc| svc.id == "offline")
            .unwrap();
        let ProviderConfig::Static { places, .. } = offline.provider else {
            panic!("offline service is not a static directory");
        };

        assert!(
            places
                .iter()
                .any(|p| p.category == Some(PlaceCategory::Police))
        );
        let mut ids = BTreeSet::new();
        for place in &places {
            assert!(ids.insert(&place.id), "Duplicate place ID: {}", place.id);
            assert!(place.position.is_finite());
        }
    }
}
