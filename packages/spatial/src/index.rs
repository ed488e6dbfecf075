//! R-tree over high-risk zones for geofence-style lookups.
//!
//! Built from the zones of one aggregation and answers "is this point in a
//! high-risk area" and "which high-risk areas does this path cross".

use std::collections::BTreeMap;

use geo::{Intersects, LineString, Polygon};
use rstar::{AABB, RTree, RTreeObject};
use safety_map_incident_models::LngLat;
use safety_map_spatial_models::{CellKey, GridSize};

use crate::overlay::RiskZone;

/// A zone's footprint stored in the R-tree.
struct ZoneEntry {
    key: CellKey,
    envelope: AABB<[f64; 2]>,
    polygon: Polygon<f64>,
}

impl RTreeObject for ZoneEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Spatial index of risk zones.
///
/// Point lookups bucket the point exactly like the aggregator does, so a
/// point on a cell's west or south edge belongs to that cell. Path queries
/// go through the R-tree.
pub struct RiskZoneIndex {
    size: GridSize,
    by_key: BTreeMap<CellKey, RiskZone>,
    tree: RTree<ZoneEntry>,
}

impl RiskZoneIndex {
    /// Indexes `zones`, which must come from a grid of `size`.
    #[must_use]
    pub fn new(size: GridSize, zones: Vec<RiskZone>) -> Self {
        let entries: Vec<ZoneEntry> = zones
            .iter()
            .map(|zone| {
                let sw = zone.ring.south_west();
                let ne = zone.ring.north_east();
                ZoneEntry {
                    key: zone.key,
                    envelope: AABB::from_corners([sw.lng, sw.lat], [ne.lng, ne.lat]),
                    polygon: zone.to_polygon(),
                }
            })
            .collect();

        let tree = RTree::bulk_load(entries);
        let by_key: BTreeMap<CellKey, RiskZone> =
            zones.into_iter().map(|zone| (zone.key, zone)).collect();
        log::debug!("Indexed {} risk zones", by_key.len());

        Self { size, by_key, tree }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Returns the zone whose cell contains the point, if any.
    ///
    /// Uses the same floor bucketing as aggregation. Points that cannot be
    /// bucketed (non-finite, or out of range for the grid size) are in no
    /// zone.
    #[must_use]
    pub fn zone_at(&self, position: LngLat) -> Option<&RiskZone> {
        let key = CellKey::containing(position, self.size).ok()?;
        self.by_key.get(&key)
    }

    /// Returns every zone the polyline `path` touches, ordered by key.
    #[must_use]
    pub fn zones_crossed(&self, path: &[LngLat]) -> Vec<&RiskZone> {
        match path {
            [] => Vec::new(),
            [single] => self.zone_at(*single).into_iter().collect(),
            _ => {
                let line: LineString<f64> = path.iter().map(|p| (p.lng, p.lat)).collect();
                let (min, max) = bounds(path);
                let query_env = AABB::from_corners(min, max);

                let mut keys: Vec<CellKey> = self
                    .tree
                    .locate_in_envelope_intersecting(&query_env)
                    .filter(|entry| entry.polygon.intersects(&line))
                    .map(|entry| entry.key)
                    .collect();
                keys.sort_unstable();
                keys.dedup();

                keys.iter().filter_map(|key| self.by_key.get(key)).collect()
            }
        }
    }
}

fn bounds(path: &[LngLat]) -> ([f64; 2], [f64; 2]) {
    path.iter().fold(
        ([f64::MAX, f64::MAX], [f64::MIN, f64::MIN]),
        |(min, max), p| {
            (
                [min[0].min(p.lng), min[1].min(p.lat)],
                [max[0].max(p.lng), max[1].max(p.lat)],
            )
        },
    )
}
