//! `OpenRouteService` geocoding and directions client.
//!
//! Place search uses the Pelias-based `/geocode/search` endpoint; routes use
//! `/v2/directions/{profile}/geojson`, which accepts a `MultiPolygon` of
//! areas to avoid.
//!
//! See <https://openrouteservice.org/dev/#/api-docs>

use std::time::Duration;

use safety_map_incident_models::LngLat;
use safety_map_spatial::CellRing;

use crate::{LocationError, LocationService, Place, PlaceCategory, RouteGeometry};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for [`OpenRouteService`], resolved from the service registry.
#[derive(Debug, Clone)]
pub struct OpenRouteServiceOptions {
    pub id: String,
    pub base_url: String,
    pub api_key: String,
    pub profile: String,
    pub country: Option<String>,
    pub max_results: usize,
    pub focus: Option<LngLat>,
}

/// `OpenRouteService` provider.
pub struct OpenRouteService {
    client: reqwest::Client,
    options: OpenRouteServiceOptions,
}

impl OpenRouteService {
    /// Builds the HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::Http`] if the client cannot be built.
    pub fn new(options: OpenRouteServiceOptions) -> Result<Self, LocationError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, options })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.options.base_url.trim_end_matches('/'))
    }
}

#[async_trait::async_trait]
impl LocationService for OpenRouteService {
    fn id(&self) -> &str {
        &self.options.id
    }

    async fn search_place(&self, text: &str) -> Result<Vec<Place>, LocationError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: Vec<(&str, String)> = vec![
            ("api_key", self.options.api_key.clone()),
            ("text", text.to_string()),
            ("size", self.options.max_results.to_string()),
        ];
        if let Some(country) = &self.options.country {
            query.push(("boundary.country", country.clone()));
        }
        if let Some(focus) = self.options.focus {
            query.push(("focus.point.lon", focus.lng.to_string()));
            query.push(("focus.point.lat", focus.lat.to_string()));
        }

        let resp = self
            .client
            .get(self.url("/geocode/search"))
            .query(&query)
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LocationError::RateLimited);
        }

        let body: serde_json::Value = resp.error_for_status()?.json().await?;
        let places = parse_search_response(&body)?;
        log::debug!("OpenRouteService returned {} places for '{text}'", places.len());
        Ok(places)
    }

    async fn calculate_route(
        &self,
        start: LngLat,
        end: LngLat,
        avoid: &[CellRing],
    ) -> Result<RouteGeometry, LocationError> {
        let body = route_request_body(start, end, avoid);
        log::debug!(
            "Requesting {} route {start} -> {end} avoiding {} areas",
            self.options.profile,
            avoid.len()
        );

        let resp = self
            .client
            .post(self.url(&format!(
                "/v2/directions/{}/geojson",
                self.options.profile
            )))
            .header(reqwest::header::AUTHORIZATION, &self.options.api_key)
            .json(&body)
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LocationError::RateLimited);
        }

        let body: serde_json::Value = resp.error_for_status()?.json().await?;
        parse_route_response(&body)
    }

    async fn nearby_places(
        &self,
        _position: LngLat,
        _category: PlaceCategory,
        _radius_m: f64,
    ) -> Result<Vec<Place>, LocationError> {
        Err(LocationError::Unsupported {
            provider: self.options.id.clone(),
            operation: "nearby_places",
        })
    }
}

/// Builds the directions request. `avoid_polygons` is omitted when there is
/// nothing to avoid.
fn route_request_body(start: LngLat, end: LngLat, avoid: &[CellRing]) -> serde_json::Value {
    let mut body = serde_json::json!({
        "coordinates": [[start.lng, start.lat], [end.lng, end.lat]],
    });

    if !avoid.is_empty() {
        let polygons: Vec<Vec<Vec<Vec<f64>>>> =
            avoid.iter().map(|ring| vec![ring.to_positions()]).collect();
        body["options"] = serde_json::json!({
            "avoid_polygons": {
                "type": "MultiPolygon",
                "coordinates": polygons,
            }
        });
    }

    body
}

/// Parses a `GeoJSON` feature collection of geocoding results.
fn parse_search_response(body: &serde_json::Value) -> Result<Vec<Place>, LocationError> {
    let features = body["features"]
        .as_array()
        .ok_or_else(|| LocationError::Parse {
            message: "Geocode response has no features array".to_string(),
        })?;

    features
        .iter()
        .map(|feature| {
            let position = parse_position(&feature["geometry"]["coordinates"]).ok_or_else(|| {
                LocationError::Parse {
                    message: "Geocode feature is missing point coordinates".to_string(),
                }
            })?;

            let properties = &feature["properties"];
            let label = properties["label"]
                .as_str()
                .or_else(|| properties["name"].as_str())
                .ok_or_else(|| LocationError::Parse {
                    message: "Geocode feature is missing a label".to_string(),
                })?
                .to_string();
            let id = properties["gid"]
                .as_str()
                .or_else(|| properties["id"].as_str())
                .map_or_else(|| label.clone(), str::to_string);
            let address = properties["street"].as_str().map(|street| {
                properties["housenumber"]
                    .as_str()
                    .map_or_else(|| street.to_string(), |n| format!("{n} {street}"))
            });

            Ok(Place {
                id,
                label,
                position,
                address,
                category: None,
            })
        })
        .collect()
}

/// Parses the first route of a directions `GeoJSON` response.
fn parse_route_response(body: &serde_json::Value) -> Result<RouteGeometry, LocationError> {
    let feature = body["features"]
        .as_array()
        .and_then(|features| features.first())
        .ok_or_else(|| LocationError::Parse {
            message: "Directions response contains no routes".to_string(),
        })?;

    let coordinates = feature["geometry"]["coordinates"]
        .as_array()
        .ok_or_else(|| LocationError::Parse {
            message: "Route geometry is not a LineString".to_string(),
        })?;

    let path = coordinates
        .iter()
        .map(|c| {
            parse_position(c).ok_or_else(|| LocationError::Parse {
                message: format!("Invalid route coordinate: {c}"),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    // Zero-length routes come back without distance/duration.
    let summary = &feature["properties"]["summary"];
    let distance_m = summary["distance"].as_f64().unwrap_or(0.0);
    let duration_s = summary["duration"].as_f64().unwrap_or(0.0);

    Ok(RouteGeometry {
        path,
        distance_m,
        duration_s,
    })
}

fn parse_position(value: &serde_json::Value) -> Option<LngLat> {
    let lng = value.get(0)?.as_f64()?;
    let lat = value.get(1)?.as_f64()?;
    Some(LngLat::new(lng, lat))
}

#[cfg(test)]
mod tests {
    use safety_map_spatial::CellKey;
    use safety_map_spatial::GridSize;

    use super::*;

    #[test]
    fn parses_search_results() {
        let body = serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [77.2295, 28.6129] },
                    "properties": {
                        "gid": "openstreetmap:venue:way/12345",
                        "label": "India Gate, New Delhi, India",
                        "street": "Rajpath"
                    }
                },
                {
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [72.8347, 18.922] },
                    "properties": { "name": "Gateway of India" }
                }
            ]
        });

        let places = parse_search_response(&body).unwrap();
        assert_eq!(places.len(), 2);
        assert_eq!(places[0].id, "openstreetmap:venue:way/12345");
        assert_eq!(places[0].label, "India Gate, New Delhi, India");
        assert_eq!(places[0].position, LngLat::new(77.2295, 28.6129));
        assert_eq!(places[0].address.as_deref(), Some("Rajpath"));
        assert_eq!(places[1].id, "Gateway of India");
    }

    #[test]
    fn parses_empty_search() {
        let body = serde_json::json!({ "type": "FeatureCollection", "features": [] });
        assert!(parse_search_response(&body).unwrap().is_empty());
    }

    #[test]
    fn rejects_search_without_features() {
        let body = serde_json::json!({ "error": "Unauthorized" });
        assert!(matches!(
            parse_search_response(&body),
            Err(LocationError::Parse { .. })
        ));
    }

    #[test]
    fn parses_route() {
        let body = serde_json::json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[77.2167, 28.6315], [77.22, 28.62], [77.2295, 28.6129]]
                },
                "properties": { "summary": { "distance": 2450.3, "duration": 1764.2 } }
            }]
        });

        let route = parse_route_response(&body).unwrap();
        assert_eq!(route.path.len(), 3);
        assert_eq!(route.path[2], LngLat::new(77.2295, 28.6129));
        assert!((route.distance_m - 2450.3).abs() < 1e-9);
        assert!((route.duration_s - 1764.2).abs() < 1e-9);
    }

    #[test]
    fn rejects_route_without_features() {
        let body = serde_json::json!({ "features": [] });
        assert!(parse_route_response(&body).is_err());
    }

    #[test]
    fn request_body_without_avoid_areas() {
        let body = route_request_body(LngLat::new(1.0, 2.0), LngLat::new(3.0, 4.0), &[]);
        assert_eq!(body["coordinates"], serde_json::json!([[1.0, 2.0], [3.0, 4.0]]));
        assert!(body.get("options").is_none());
    }

    #[test]
    fn request_body_avoids_cells_as_multipolygon() {
        let rings = [
            CellKey::new(3, 7).ring(GridSize::DEFAULT),
            CellKey::new(4, 7).ring(GridSize::DEFAULT),
        ];
        let body = route_request_body(LngLat::new(0.0, 0.0), LngLat::new(1.0, 1.0), &rings);
        let avoid = &body["options"]["avoid_polygons"];

        assert_eq!(avoid["type"], "MultiPolygon");
        let polygons = avoid["coordinates"].as_array().unwrap();
        assert_eq!(polygons.len(), 2);

        let ring = polygons[0][0].as_array().unwrap();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring[0], ring[4]);
        let sw = &ring[0];
        let se = &ring[1];
        assert!(se[0].as_f64().unwrap() > sw[0].as_f64().unwrap());
        assert!((se[1].as_f64().unwrap() - sw[1].as_f64().unwrap()).abs() < 1e-12);
    }
}
