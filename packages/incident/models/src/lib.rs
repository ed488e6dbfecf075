#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident point types and severity categories.
//!
//! An [`IncidentPoint`] is a single observed event on the map. Only its
//! position and [`IncidentSeverity`] matter to risk aggregation; every
//! other field is descriptive payload carried through for display.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A longitude/latitude pair in WGS84 degrees.
///
/// Serialized as a two-element `[lng, lat]` array, the `GeoJSON` position
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LngLat {
    /// Longitude in degrees.
    pub lng: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl LngLat {
    #[must_use]
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Whether both components are finite numbers.
    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.lng.is_finite() && self.lat.is_finite()
    }
}

impl From<[f64; 2]> for LngLat {
    fn from([lng, lat]: [f64; 2]) -> Self {
        Self { lng, lat }
    }
}

impl From<LngLat> for [f64; 2] {
    fn from(value: LngLat) -> Self {
        [value.lng, value.lat]
    }
}

impl std::fmt::Display for LngLat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.lng, self.lat)
    }
}

/// Error returned when a `"lng,lat"` string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLngLatError {
    /// The rejected input.
    pub input: String,
}

impl std::fmt::Display for ParseLngLatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid coordinate '{}': expected 'lng,lat'", self.input)
    }
}

impl std::error::Error for ParseLngLatError {}

impl std::str::FromStr for LngLat {
    type Err = ParseLngLatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseLngLatError {
            input: s.to_string(),
        };

        let (lng, lat) = s.split_once(',').ok_or_else(err)?;
        let lng: f64 = lng.trim().parse().map_err(|_| err())?;
        let lat: f64 = lat.trim().parse().map_err(|_| err())?;

        let point = Self::new(lng, lat);
        if point.is_finite() { Ok(point) } else { Err(err()) }
    }
}

/// Ordinal severity of an incident.
///
/// The discriminant is the weight an incident contributes to its grid
/// cell's weighted severity.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IncidentSeverity {
    /// Minor incidents (petty theft, nuisance reports)
    Low = 1,
    /// Incidents that warrant follow-up (burglary, harassment)
    Medium = 2,
    /// Violent or otherwise serious incidents
    High = 3,
}

impl IncidentSeverity {
    /// Returns the weight this severity adds to a cell's weighted severity.
    #[must_use]
    pub const fn weight(self) -> u32 {
        self as u32
    }

    /// Creates a severity from its weight.
    ///
    /// # Errors
    ///
    /// Returns an error if the weight is not in the range 1-3.
    pub const fn from_weight(weight: u32) -> Result<Self, InvalidSeverityError> {
        match weight {
            1 => Ok(Self::Low),
            2 => Ok(Self::Medium),
            3 => Ok(Self::High),
            _ => Err(InvalidSeverityError { weight }),
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Low, Self::Medium, Self::High]
    }
}

/// Error returned when attempting to create an [`IncidentSeverity`] from an
/// invalid weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidSeverityError {
    /// The invalid weight that was provided.
    pub weight: u32,
}

impl std::fmt::Display for InvalidSeverityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid severity weight {}: expected 1-3", self.weight)
    }
}

impl std::error::Error for InvalidSeverityError {}

/// An observed incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentPoint {
    /// Source identifier.
    #[serde(default)]
    pub id: Option<String>,
    /// Where the incident happened.
    #[serde(rename = "location")]
    pub position: LngLat,
    /// How serious the incident was.
    pub severity: IncidentSeverity,
    /// Source-specific incident type (e.g. "theft", "assault").
    #[serde(default, rename = "type")]
    pub incident_type: Option<String>,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// City the incident was reported in.
    #[serde(default)]
    pub city: Option<String>,
    /// District within the city.
    #[serde(default)]
    pub district: Option<String>,
    /// Police station handling the report.
    #[serde(default)]
    pub police_station: Option<String>,
    /// When the incident was reported.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Case status (e.g. "reported", "under_investigation", "resolved").
    #[serde(default)]
    pub status: Option<String>,
}

impl IncidentPoint {
    /// Creates an incident with only the fields used for aggregation.
    #[must_use]
    pub const fn new(position: LngLat, severity: IncidentSeverity) -> Self {
        Self {
            id: None,
            position,
            severity,
            incident_type: None,
            description: None,
            city: None,
            district: None,
            police_station: None,
            timestamp: None,
            status: None,
        }
    }
}

/// City/district selection applied before aggregation.
///
/// `None` means "all".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncidentFilter {
    pub city: Option<String>,
    pub district: Option<String>,
}

impl IncidentFilter {
    /// Whether `incident` passes this filter. Matching is case-insensitive.
    #[must_use]
    pub fn matches(&self, incident: &IncidentPoint) -> bool {
        field_matches(self.city.as_deref(), incident.city.as_deref())
            && field_matches(self.district.as_deref(), incident.district.as_deref())
    }

    /// Returns the incidents that pass this filter.
    #[must_use]
    pub fn apply(&self, incidents: &[IncidentPoint]) -> Vec<IncidentPoint> {
        incidents
            .iter()
            .filter(|incident| self.matches(incident))
            .cloned()
            .collect()
    }
}

fn field_matches(wanted: Option<&str>, actual: Option<&str>) -> bool {
    match (wanted, actual) {
        (None, _) => true,
        (Some(wanted), Some(actual)) => wanted.eq_ignore_ascii_case(actual),
        (Some(_), None) => false,
    }
}

/// Distinct, sorted values of a payload field across `incidents`, e.g. the
/// list of cities to choose from.
#[must_use]
pub fn distinct_values<F>(incidents: &[IncidentPoint], field: F) -> Vec<String>
where
    F: Fn(&IncidentPoint) -> Option<&str>,
{
    let set: std::collections::BTreeSet<&str> = incidents.iter().filter_map(field).collect();
    set.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_weights() {
        assert_eq!(IncidentSeverity::Low.weight(), 1);
        assert_eq!(IncidentSeverity::Medium.weight(), 2);
        assert_eq!(IncidentSeverity::High.weight(), 3);
    }

    #[test]
    fn severity_from_weight_roundtrip() {
        for severity in IncidentSeverity::all() {
            assert_eq!(
                IncidentSeverity::from_weight(severity.weight()).unwrap(),
                *severity
            );
        }
        assert!(IncidentSeverity::from_weight(0).is_err());
        assert!(IncidentSeverity::from_weight(4).is_err());
    }

    #[test]
    fn severity_parses_lowercase() {
        assert_eq!(
            "medium".parse::<IncidentSeverity>().unwrap(),
            IncidentSeverity::Medium
        );
        assert_eq!(IncidentSeverity::High.to_string(), "high");
    }

    #[test]
    fn deserializes_mock_incident() {
        let json = serde_json::json!({
            "id": "INC-001",
            "type": "theft",
            "severity": "high",
            "location": [77.209, 28.6139],
            "description": "Chain snatching near metro station",
            "city": "Delhi",
            "district": "Central Delhi",
            "policeStation": "Connaught Place",
            "timestamp": "2024-03-01T18:30:00Z",
            "status": "under_investigation"
        });

        let incident: IncidentPoint = serde_json::from_value(json).unwrap();
        assert_eq!(incident.position, LngLat::new(77.209, 28.6139));
        assert_eq!(incident.severity, IncidentSeverity::High);
        assert_eq!(incident.police_station.as_deref(), Some("Connaught Place"));
        assert!(incident.timestamp.is_some());
    }

    #[test]
    fn deserializes_minimal_incident() {
        let json = serde_json::json!({ "location": [1.0, 2.0], "severity": "low" });
        let incident: IncidentPoint = serde_json::from_value(json).unwrap();
        assert_eq!(incident, IncidentPoint::new(LngLat::new(1.0, 2.0), IncidentSeverity::Low));
    }

    #[test]
    fn parses_lng_lat() {
        let point: LngLat = "78.9629, 20.5937".parse().unwrap();
        assert_eq!(point, LngLat::new(78.9629, 20.5937));
        assert!("78.9629".parse::<LngLat>().is_err());
        assert!("a,b".parse::<LngLat>().is_err());
        assert!("NaN,1".parse::<LngLat>().is_err());
    }

    #[test]
    fn filter_matches_city_and_district() {
        let mut incident = IncidentPoint::new(LngLat::new(0.0, 0.0), IncidentSeverity::Low);
        incident.city = Some("Mumbai".to_string());
        incident.district = Some("Andheri".to_string());

        assert!(IncidentFilter::default().matches(&incident));
        assert!(
            IncidentFilter {
                city: Some("mumbai".to_string()),
                district: None,
            }
            .matches(&incident)
        );
        assert!(
            !IncidentFilter {
                city: Some("Mumbai".to_string()),
                district: Some("Bandra".to_string()),
            }
            .matches(&incident)
        );
        assert!(
            !IncidentFilter {
                city: Some("Delhi".to_string()),
                district: None,
            }
            .matches(&IncidentPoint::new(LngLat::new(0.0, 0.0), IncidentSeverity::Low))
        );
    }

    #[test]
    fn distinct_cities_sorted() {
        let mut a = IncidentPoint::new(LngLat::new(0.0, 0.0), IncidentSeverity::Low);
        a.city = Some("Mumbai".to_string());
        let mut b = a.clone();
        b.city = Some("Delhi".to_string());
        let c = a.clone();

        let cities = distinct_values(&[a, b, c], |i| i.city.as_deref());
        assert_eq!(cities, vec!["Delhi".to_string(), "Mumbai".to_string()]);
    }
}
