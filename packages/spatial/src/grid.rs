//! Grid bucketing of incident points into risk cells.
//!
//! [`RiskGridAggregator`] owns the process-wide [`GridSize`] so every
//! consumer (map overlay, route avoidance) agrees on cell identity. Each
//! call to [`RiskGridAggregator::aggregate`] rebuilds the grid from
//! scratch; nothing is cached between calls.

use std::collections::BTreeMap;

use safety_map_incident_models::IncidentPoint;
use safety_map_spatial_models::{CellKey, CellRing, GridSize, RiskThresholds, SpatialError};

/// Incidents that fell into one grid cell.
///
/// Borrows the incidents from the slice passed to
/// [`RiskGridAggregator::aggregate`].
#[derive(Debug, Clone, PartialEq)]
pub struct GridCell<'a> {
    /// Cell address.
    pub key: CellKey,
    /// Sum of [`IncidentSeverity::weight`] over `incidents`.
    ///
    /// [`IncidentSeverity::weight`]: safety_map_incident_models::IncidentSeverity::weight
    pub weighted_severity: u32,
    /// Incidents located in this cell, in input order.
    pub incidents: Vec<&'a IncidentPoint>,
}

impl<'a> GridCell<'a> {
    fn new(key: CellKey) -> Self {
        Self {
            key,
            weighted_severity: 0,
            incidents: Vec::new(),
        }
    }

    fn push(&mut self, incident: &'a IncidentPoint) {
        self.weighted_severity = self
            .weighted_severity
            .saturating_add(incident.severity.weight());
        self.incidents.push(incident);
    }

    /// Number of incidents in this cell. Never zero for cells produced by
    /// aggregation.
    #[must_use]
    pub fn count(&self) -> u32 {
        u32::try_from(self.incidents.len()).unwrap_or(u32::MAX)
    }

    /// Whether this cell meets either of `thresholds`.
    #[must_use]
    pub fn is_high_risk(&self, thresholds: RiskThresholds) -> bool {
        thresholds.is_high_risk(self.count(), self.weighted_severity)
    }
}

/// Result of one aggregation: every non-empty cell keyed by [`CellKey`].
///
/// Iteration follows key order. That order carries no meaning; callers
/// that present cells sort them explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskGrid<'a> {
    size: GridSize,
    cells: BTreeMap<CellKey, GridCell<'a>>,
}

impl<'a> RiskGrid<'a> {
    /// Grid size the cells were bucketed with.
    #[must_use]
    pub const fn size(&self) -> GridSize {
        self.size
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &CellKey) -> Option<&GridCell<'a>> {
        self.cells.get(key)
    }

    pub fn cells(&self) -> impl Iterator<Item = &GridCell<'a>> {
        self.cells.values()
    }

    /// Cells meeting either threshold.
    #[must_use]
    pub fn high_risk(&self, thresholds: RiskThresholds) -> Vec<&GridCell<'a>> {
        self.cells()
            .filter(|cell| cell.is_high_risk(thresholds))
            .collect()
    }

    /// All cells sorted by incident count (descending), then by key.
    #[must_use]
    pub fn by_count(&self) -> Vec<&GridCell<'a>> {
        let mut cells: Vec<_> = self.cells().collect();
        cells.sort_by(|a, b| b.count().cmp(&a.count()).then(a.key.cmp(&b.key)));
        cells
    }

    /// Footprint of `key` in this grid.
    #[must_use]
    pub fn ring(&self, key: CellKey) -> CellRing {
        key.ring(self.size)
    }
}

/// Buckets incidents into a uniform grid.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RiskGridAggregator {
    size: GridSize,
}

impl RiskGridAggregator {
    #[must_use]
    pub const fn new(size: GridSize) -> Self {
        Self { size }
    }

    /// Creates an aggregator from a raw grid size in degrees.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidArgument`] if `degrees` is not a
    /// positive finite number.
    pub fn with_degrees(degrees: f64) -> Result<Self, SpatialError> {
        Ok(Self::new(GridSize::new(degrees)?))
    }

    #[must_use]
    pub const fn size(&self) -> GridSize {
        self.size
    }

    /// Groups `incidents` by the cell containing each one.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidArgument`] if any incident has a
    /// non-finite coordinate, or one whose cell index does not fit in an
    /// `i64` at this grid size.
    pub fn aggregate<'a>(&self, incidents: &'a [IncidentPoint]) -> Result<RiskGrid<'a>, SpatialError> {
        let mut cells: BTreeMap<CellKey, GridCell<'a>> = BTreeMap::new();

        for incident in incidents {
            if !incident.position.is_finite() {
                return Err(SpatialError::invalid(format!(
                    "incident at {} has a non-finite coordinate",
                    incident.position
                )));
            }

            let key = CellKey::containing(incident.position, self.size)?;
            cells
                .entry(key)
                .or_insert_with(|| GridCell::new(key))
                .push(incident);
        }

        log::debug!(
            "Aggregated {} incidents into {} cells (grid size {})",
            incidents.len(),
            cells.len(),
            self.size.degrees()
        );

        Ok(RiskGrid {
            size: self.size,
            cells,
        })
    }

    /// Footprint of the cell `key`.
    #[must_use]
    pub fn cell_to_polygon(&self, key: CellKey) -> CellRing {
        key.ring(self.size)
    }
}

/// Buckets `incidents` into cells of `grid_size` degrees.
///
/// # Errors
///
/// Returns [`SpatialError::InvalidArgument`] if `grid_size` is not positive
/// or an incident has a non-finite coordinate.
pub fn aggregate(incidents: &[IncidentPoint], grid_size: f64) -> Result<RiskGrid<'_>, SpatialError> {
    RiskGridAggregator::with_degrees(grid_size)?.aggregate(incidents)
}

/// Returns the cells with at least `count_threshold` incidents **or** a
/// weighted severity of at least `severity_threshold`.
///
/// # Errors
///
/// Returns [`SpatialError::InvalidArgument`] if either threshold is zero.
pub fn select_high_risk<'g, 'a>(
    grid: &'g RiskGrid<'a>,
    count_threshold: u32,
    severity_threshold: u32,
) -> Result<Vec<&'g GridCell<'a>>, SpatialError> {
    let thresholds = RiskThresholds::new(count_threshold, severity_threshold)?;
    Ok(grid.high_risk(thresholds))
}

/// Closed SW, SE, NE, NW, SW ring for `key` at `grid_size` degrees.
///
/// # Errors
///
/// Returns [`SpatialError::InvalidArgument`] if `grid_size` is not positive.
pub fn cell_to_polygon(key: CellKey, grid_size: f64) -> Result<CellRing, SpatialError> {
    Ok(key.ring(GridSize::new(grid_size)?))
}
