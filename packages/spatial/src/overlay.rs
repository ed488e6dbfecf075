//! High-risk cells as labelled map polygons.
//!
//! A [`RiskZone`] is the detached, owned form of a high-risk
//! [`GridCell`](crate::grid::GridCell): it outlives the incident slice and
//! can be rendered as `GeoJSON` or fed to a routing request.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use safety_map_spatial_models::{CellKey, CellRing, RiskThresholds};
use serde::Serialize;

use crate::grid::RiskGrid;

/// A high-risk area ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskZone {
    pub key: CellKey,
    pub ring: CellRing,
    pub count: u32,
    pub weighted_severity: u32,
}

impl RiskZone {
    /// Human-readable label for the zone.
    #[must_use]
    pub fn description(&self) -> String {
        format!("High-crime area with {} incidents", self.count)
    }

    /// The zone's footprint as a `geo` polygon.
    #[must_use]
    pub fn to_polygon(&self) -> geo::Polygon<f64> {
        let exterior: Vec<(f64, f64)> = self.ring.points().iter().map(|p| (p.lng, p.lat)).collect();
        geo::Polygon::new(geo::LineString::from(exterior), vec![])
    }

    /// The zone as a `GeoJSON` polygon feature with `count`,
    /// `weightedSeverity` and `description` properties.
    #[must_use]
    pub fn to_feature(&self) -> Feature {
        let mut properties = JsonObject::new();
        properties.insert("count".to_string(), self.count.into());
        properties.insert(
            "weightedSeverity".to_string(),
            self.weighted_severity.into(),
        );
        properties.insert("description".to_string(), self.description().into());

        Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Polygon(vec![self.ring.to_positions()]))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

/// Converts the high-risk cells of `grid` into zones, ordered by key.
#[must_use]
pub fn risk_zones(grid: &RiskGrid<'_>, thresholds: RiskThresholds) -> Vec<RiskZone> {
    let zones: Vec<RiskZone> = grid
        .high_risk(thresholds)
        .into_iter()
        .map(|cell| RiskZone {
            key: cell.key,
            ring: grid.ring(cell.key),
            count: cell.count(),
            weighted_severity: cell.weighted_severity,
        })
        .collect();

    log::debug!(
        "{} of {} cells are high risk (count >= {} or severity >= {})",
        zones.len(),
        grid.len(),
        thresholds.min_count(),
        thresholds.min_weighted_severity()
    );

    zones
}

/// Avoidance polygons for a routing request.
#[must_use]
pub fn avoidance_rings(zones: &[RiskZone]) -> Vec<CellRing> {
    zones.iter().map(|zone| zone.ring).collect()
}

/// Renders zones as a `GeoJSON` feature collection for a map fill layer.
#[must_use]
pub fn to_feature_collection(zones: &[RiskZone]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: zones.iter().map(RiskZone::to_feature).collect(),
        foreign_members: None,
    }
}
