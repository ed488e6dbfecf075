//! Routes that steer around high-risk grid cells.
//!
//! The planner aggregates the current incidents with the same
//! [`RiskGridAggregator`] the map overlay uses, so the areas a route avoids
//! are exactly the areas drawn as high risk.

use safety_map_incident_models::{IncidentPoint, LngLat};
use safety_map_spatial::{
    CellKey, CellRing, RiskGridAggregator, RiskThresholds, RiskZoneIndex, avoidance_rings,
    risk_zones,
};
use serde::Serialize;

use crate::{LocationError, LocationService};

/// A route plus the risk areas it was planned around.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafeRoute {
    pub start: LngLat,
    pub end: LngLat,
    pub path: Vec<LngLat>,
    pub distance_m: f64,
    pub duration_s: f64,
    /// Avoidance polygons sent with the route request.
    pub avoided: Vec<CellRing>,
    /// High-risk cells the returned path still passes through.
    pub crossed: Vec<CellKey>,
}

/// Plans routes against a [`LocationService`].
pub struct SafeRoutePlanner<'s> {
    service: &'s dyn LocationService,
    aggregator: RiskGridAggregator,
    thresholds: RiskThresholds,
}

impl<'s> SafeRoutePlanner<'s> {
    #[must_use]
    pub const fn new(
        service: &'s dyn LocationService,
        aggregator: RiskGridAggregator,
        thresholds: RiskThresholds,
    ) -> Self {
        Self {
            service,
            aggregator,
            thresholds,
        }
    }

    /// Calculates a route from `start` to `end` avoiding the high-risk cells
    /// of `incidents`.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::Spatial`] if an incident has an invalid
    /// coordinate, or the provider's error if routing fails.
    pub async fn plan(
        &self,
        start: LngLat,
        end: LngLat,
        incidents: &[IncidentPoint],
    ) -> Result<SafeRoute, LocationError> {
        let grid = self.aggregator.aggregate(incidents)?;
        let zones = risk_zones(&grid, self.thresholds);
        let avoided = avoidance_rings(&zones);

        log::info!(
            "Routing {start} -> {end} via {} avoiding {} high-risk cells",
            self.service.id(),
            avoided.len()
        );

        let route = self.service.calculate_route(start, end, &avoided).await?;

        let index = RiskZoneIndex::new(grid.size(), zones);
        let crossed: Vec<CellKey> = index
            .zones_crossed(&route.path)
            .into_iter()
            .map(|zone| zone.key)
            .collect();

        if !crossed.is_empty() {
            log::warn!(
                "Route from {} still crosses {} high-risk cells",
                self.service.id(),
                crossed.len()
            );
        }

        Ok(SafeRoute {
            start,
            end,
            path: route.path,
            distance_m: route.distance_m,
            duration_s: route.duration_s,
            avoided,
            crossed,
        })
    }
}
