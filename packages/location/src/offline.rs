//! Offline provider backed by a fixed place directory.
//!
//! Search matches labels by substring and routes are straight lines, so this
//! provider cannot steer around avoidance areas. It exists so the tool works
//! without network access or credentials.

use geo::{Distance, Haversine, Intersects, LineString, Point};
use safety_map_incident_models::LngLat;
use safety_map_spatial::CellRing;

use crate::{LocationError, LocationService, Place, PlaceCategory, RouteGeometry};

/// Directory-backed [`LocationService`].
pub struct StaticLocationService {
    id: String,
    places: Vec<Place>,
    walking_speed_mps: f64,
    max_results: usize,
}

impl StaticLocationService {
    #[must_use]
    pub const fn new(
        id: String,
        places: Vec<Place>,
        walking_speed_mps: f64,
        max_results: usize,
    ) -> Self {
        Self {
            id,
            places,
            walking_speed_mps,
            max_results,
        }
    }

    #[must_use]
    pub fn places(&self) -> &[Place] {
        &self.places
    }
}

fn distance_m(a: LngLat, b: LngLat) -> f64 {
    Haversine.distance(Point::new(a.lng, a.lat), Point::new(b.lng, b.lat))
}

#[async_trait::async_trait]
impl LocationService for StaticLocationService {
    fn id(&self) -> &str {
        &self.id
    }

    async fn search_place(&self, text: &str) -> Result<Vec<Place>, LocationError> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .places
            .iter()
            .filter(|place| place.label.to_lowercase().contains(&needle))
            .take(self.max_results)
            .cloned()
            .collect())
    }

    async fn calculate_route(
        &self,
        start: LngLat,
        end: LngLat,
        avoid: &[CellRing],
    ) -> Result<RouteGeometry, LocationError> {
        let line = LineString::from(vec![(start.lng, start.lat), (end.lng, end.lat)]);
        let blocked = avoid
            .iter()
            .filter(|ring| {
                let exterior: Vec<(f64, f64)> =
                    ring.points().iter().map(|p| (p.lng, p.lat)).collect();
                geo::Polygon::new(LineString::from(exterior), vec![]).intersects(&line)
            })
            .count();
        if blocked > 0 {
            log::warn!(
                "Straight-line route {start} -> {end} passes through {blocked} area(s) it was asked to avoid"
            );
        }

        let distance_m = distance_m(start, end);
        let duration_s = if self.walking_speed_mps > 0.0 {
            distance_m / self.walking_speed_mps
        } else {
            0.0
        };

        Ok(RouteGeometry {
            path: vec![start, end],
            distance_m,
            duration_s,
        })
    }

    async fn nearby_places(
        &self,
        position: LngLat,
        category: PlaceCategory,
        radius_m: f64,
    ) -> Result<Vec<Place>, LocationError> {
        let mut nearby: Vec<(f64, &Place)> = self
            .places
            .iter()
            .filter(|place| place.category == Some(category))
            .map(|place| (distance_m(position, place.position), place))
            .filter(|(distance, _)| *distance <= radius_m)
            .collect();

        nearby.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(nearby
            .into_iter()
            .take(self.max_results)
            .map(|(_, place)| place.clone())
            .collect())
    }
}
