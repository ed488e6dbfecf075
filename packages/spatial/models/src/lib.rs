#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Value types shared by the risk grid and its consumers.
//!
//! A uniform grid of [`GridSize`]-degree squares partitions coordinate
//! space. Each square is addressed by an integer [`CellKey`] and its
//! footprint is a closed [`CellRing`]. [`RiskThresholds`] decide which
//! cells count as high risk.

use safety_map_incident_models::LngLat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by risk grid operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpatialError {
    /// A grid size, threshold or coordinate was outside its valid domain.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the rejected argument.
        message: String,
    },
}

impl SpatialError {
    /// Shorthand for [`SpatialError::InvalidArgument`].
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

/// Edge length of a grid cell in coordinate degrees. Always positive and
/// finite.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct GridSize(f64);

impl GridSize {
    /// 0.01 degrees, roughly 1 km at the equator.
    pub const DEFAULT: Self = Self(0.01);

    /// Validates a grid size.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidArgument`] if `degrees` is zero,
    /// negative or not finite.
    pub fn new(degrees: f64) -> Result<Self, SpatialError> {
        if degrees.is_finite() && degrees > 0.0 {
            Ok(Self(degrees))
        } else {
            Err(SpatialError::invalid(format!(
                "grid size must be a positive number of degrees, got {degrees}"
            )))
        }
    }

    #[must_use]
    pub const fn degrees(self) -> f64 {
        self.0
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl<'de> Deserialize<'de> for GridSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let degrees = f64::deserialize(deserializer)?;
        Self::new(degrees).map_err(serde::de::Error::custom)
    }
}

/// Integer address of a grid cell: `(floor(lng / size), floor(lat / size))`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CellKey {
    /// Column index (longitude axis).
    pub x: i64,
    /// Row index (latitude axis).
    pub y: i64,
}

impl CellKey {
    #[must_use]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Returns the key of the cell containing `position`.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidArgument`] if a coordinate is not
    /// finite or its cell index does not fit in an `i64` (a grid size too
    /// small for the coordinate).
    pub fn containing(position: LngLat, size: GridSize) -> Result<Self, SpatialError> {
        Ok(Self {
            x: cell_index(position.lng, size, position)?,
            y: cell_index(position.lat, size, position)?,
        })
    }

    /// Returns the square footprint of this cell.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ring(self, size: GridSize) -> CellRing {
        let s = size.degrees();
        let west = self.x as f64 * s;
        let south = self.y as f64 * s;
        let east = (self.x as f64 + 1.0) * s;
        let north = (self.y as f64 + 1.0) * s;

        CellRing([
            LngLat::new(west, south),
            LngLat::new(east, south),
            LngLat::new(east, north),
            LngLat::new(west, north),
            LngLat::new(west, south),
        ])
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn cell_index(coordinate: f64, size: GridSize, position: LngLat) -> Result<i64, SpatialError> {
    let index = (coordinate / size.degrees()).floor();

    // `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive.
    if (i64::MIN as f64..i64::MAX as f64).contains(&index) {
        Ok(index as i64)
    } else {
        Err(SpatialError::invalid(format!(
            "cell index of {position} is out of range for grid size {}",
            size.degrees()
        )))
    }
}

impl std::fmt::Display for CellKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Closed ring of a cell's corners: south-west, south-east, north-east,
/// north-west, then south-west again.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellRing(pub [LngLat; 5]);

impl CellRing {
    #[must_use]
    pub const fn points(&self) -> &[LngLat; 5] {
        &self.0
    }

    #[must_use]
    pub const fn south_west(&self) -> LngLat {
        self.0[0]
    }

    #[must_use]
    pub const fn north_east(&self) -> LngLat {
        self.0[2]
    }

    /// Ring as `[lng, lat]` pairs, the layout routing and `GeoJSON` APIs
    /// expect.
    #[must_use]
    pub fn to_positions(&self) -> Vec<Vec<f64>> {
        self.0.iter().map(|p| vec![p.lng, p.lat]).collect()
    }
}

/// Minimum incident count and minimum weighted severity for a cell to be
/// high risk. Either one alone is enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskThresholds {
    min_count: u32,
    min_weighted_severity: u32,
}

impl RiskThresholds {
    /// Validates a threshold pair.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidArgument`] if either threshold is
    /// zero.
    pub fn new(min_count: u32, min_weighted_severity: u32) -> Result<Self, SpatialError> {
        if min_count == 0 {
            return Err(SpatialError::invalid("count threshold must be at least 1"));
        }
        if min_weighted_severity == 0 {
            return Err(SpatialError::invalid(
                "severity threshold must be at least 1",
            ));
        }
        Ok(Self {
            min_count,
            min_weighted_severity,
        })
    }

    #[must_use]
    pub const fn min_count(self) -> u32 {
        self.min_count
    }

    #[must_use]
    pub const fn min_weighted_severity(self) -> u32 {
        self.min_weighted_severity
    }

    /// Whether a cell with these totals qualifies as high risk.
    #[must_use]
    pub const fn is_high_risk(self, count: u32, weighted_severity: u32) -> bool {
        count >= self.min_count || weighted_severity >= self.min_weighted_severity
    }
}

impl Default for RiskThresholds {
    /// Five incidents, or a weighted severity of ten.
    fn default() -> Self {
        Self {
            min_count: 5,
            min_weighted_severity: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    fn assert_close(actual: LngLat, expected: (f64, f64)) {
        assert!(
            (actual.lng - expected.0).abs() < EPSILON && (actual.lat - expected.1).abs() < EPSILON,
            "{actual:?} != {expected:?}"
        );
    }

    #[test]
    fn grid_size_rejects_non_positive() {
        assert!(GridSize::new(0.0).is_err());
        assert!(GridSize::new(-1.0).is_err());
        assert!(GridSize::new(f64::NAN).is_err());
        assert!(GridSize::new(f64::INFINITY).is_err());
        assert_eq!(GridSize::new(0.01).unwrap(), GridSize::DEFAULT);
    }

    #[test]
    fn key_for_position_floors_both_axes() {
        let key = CellKey::containing(LngLat::new(78.961, 20.591), GridSize::DEFAULT).unwrap();
        assert_eq!(key, CellKey::new(7896, 2059));
    }

    #[test]
    fn key_for_negative_position_floors_toward_negative_infinity() {
        let key = CellKey::containing(LngLat::new(-0.005, -73.985), GridSize::DEFAULT).unwrap();
        assert_eq!(key, CellKey::new(-1, -7399));
    }

    #[test]
    fn key_out_of_i64_range_is_rejected() {
        let tiny = GridSize::new(1e-17).unwrap();
        assert!(matches!(
            CellKey::containing(LngLat::new(100.0, 1.0), tiny),
            Err(SpatialError::InvalidArgument { .. })
        ));
        assert!(matches!(
            CellKey::containing(LngLat::new(1.0, -120.0), tiny),
            Err(SpatialError::InvalidArgument { .. })
        ));
        assert!(CellKey::containing(LngLat::new(f64::NAN, 0.0), GridSize::DEFAULT).is_err());

        assert!(CellKey::containing(LngLat::new(0.01, -0.01), tiny).is_ok());
    }

    #[test]
    fn ring_at_largest_key_does_not_overflow() {
        let ring = CellKey::new(i64::MAX, i64::MIN).ring(GridSize::DEFAULT);
        let sw = ring.south_west();
        let ne = ring.north_east();
        assert!(ne.lng >= sw.lng);
        assert!(ne.lat >= sw.lat);
    }

    #[test]
    fn ring_is_closed_and_wound_sw_se_ne_nw() {
        let ring = CellKey::new(3, 7).ring(GridSize::DEFAULT);
        let expected = [
            (0.03, 0.07),
            (0.04, 0.07),
            (0.04, 0.08),
            (0.03, 0.08),
            (0.03, 0.07),
        ];

        for (actual, expected) in ring.points().iter().zip(expected) {
            assert_close(*actual, expected);
        }
        assert_eq!(ring.points()[0], ring.points()[4]);
    }

    #[test]
    fn ring_contains_its_source_position() {
        let position = LngLat::new(78.9629, 20.5937);
        let ring = CellKey::containing(position, GridSize::DEFAULT)
            .unwrap()
            .ring(GridSize::DEFAULT);
        let sw = ring.south_west();
        let ne = ring.north_east();
        assert!(sw.lng <= position.lng && position.lng < ne.lng);
        assert!(sw.lat <= position.lat && position.lat < ne.lat);
    }

    #[test]
    fn thresholds_reject_zero() {
        assert!(RiskThresholds::new(0, 10).is_err());
        assert!(RiskThresholds::new(5, 0).is_err());
        assert_eq!(RiskThresholds::new(5, 10).unwrap(), RiskThresholds::default());
    }

    #[test]
    fn thresholds_are_either_or() {
        let thresholds = RiskThresholds::default();
        assert!(thresholds.is_high_risk(3, 12));
        assert!(thresholds.is_high_risk(6, 2));
        assert!(!thresholds.is_high_risk(3, 9));
    }

    #[test]
    fn grid_size_deserialization_validates() {
        #[derive(Deserialize)]
        struct Wrapper {
            size: GridSize,
        }

        let ok: Wrapper = serde_json::from_str(r#"{"size": 0.02}"#).unwrap();
        assert!((ok.size.degrees() - 0.02).abs() < EPSILON);
        assert!(serde_json::from_str::<Wrapper>(r#"{"size": 0.0}"#).is_err());
    }
}
