#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Risk grid aggregation for the safety map.
//!
//! Incident points are bucketed into a uniform grid ([`grid`]); cells with
//! enough incidents or enough weighted severity become high-risk zones
//! ([`overlay`]) that are either drawn on the map or handed to a routing
//! service as areas to avoid. [`index`] answers point and path queries
//! against those zones.

pub mod grid;
pub mod index;
pub mod overlay;

pub use grid::{GridCell, RiskGrid, RiskGridAggregator, aggregate, cell_to_polygon, select_high_risk};
pub use index::RiskZoneIndex;
pub use overlay::{RiskZone, avoidance_rings, risk_zones, to_feature_collection};
pub use safety_map_spatial_models::{CellKey, CellRing, GridSize, RiskThresholds, SpatialError};
