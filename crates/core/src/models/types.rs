//! Core data types for point sets, distance records and result rows.

use std::sync::Arc;

use geo::Coord;

use crate::crs::Crs;
use crate::identifiers::FeatureId;

// ============================================================================
// Enums
// ============================================================================

/// Geometry family of the reference layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum GeometryKind {
    Point,
    Line,
    Polygon,
}

// ============================================================================
// Point Sets
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct PointFeature {
    pub id: FeatureId,
    pub coord: Coord<f64>,
}

impl PointFeature {
    pub fn new(id: impl Into<FeatureId>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            coord: Coord { x, y },
        }
    }

    /// A point is degenerate when either ordinate is not a finite number.
    pub fn is_degenerate(&self) -> bool {
        !(self.coord.x.is_finite() && self.coord.y.is_finite())
    }
}

/// One input point layer.
#[derive(Clone, Debug)]
pub struct PointSet {
    pub name: Arc<str>,
    /// Name of the attribute the identifiers were read from.
    pub id_field: Arc<str>,
    pub crs: Crs,
    pub features: Vec<PointFeature>,
}

impl PointSet {
    pub fn new(
        name: impl AsRef<str>,
        id_field: impl AsRef<str>,
        crs: Crs,
        features: Vec<PointFeature>,
    ) -> Self {
        Self {
            name: name.as_ref().into(),
            id_field: id_field.as_ref().into(),
            crs,
            features,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Split off degenerate points, returning their ids.
    pub fn take_degenerate(&mut self) -> Vec<FeatureId> {
        let (valid, degenerate): (Vec<_>, Vec<_>) = std::mem::take(&mut self.features)
            .into_iter()
            .partition(|f| !f.is_degenerate());
        self.features = valid;
        degenerate.into_iter().map(|f| f.id).collect()
    }
}

/// A point's orthogonal projection onto the reference axis.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectedPoint {
    pub id: FeatureId,
    pub coord: Coord<f64>,
    /// Length of the shortest segment from the source point to the axis.
    pub offset: f64,
}

#[derive(Clone, Debug)]
pub struct ProjectedPointSet {
    pub name: Arc<str>,
    pub id_field: Arc<str>,
    /// Always the axis CRS.
    pub crs: Crs,
    pub points: Vec<ProjectedPoint>,
    /// Ids whose projection was indeterminate.
    pub skipped: Vec<FeatureId>,
}

// ============================================================================
// Distance Tables
// ============================================================================

/// One row of an outer-join distance table.
///
/// At least one id is present, and `distance` is `None` exactly when one of
/// the ids is missing.
#[derive(Clone, Debug, PartialEq)]
pub struct DistanceRecord {
    pub id1: Option<FeatureId>,
    pub id2: Option<FeatureId>,
    pub distance: Option<f64>,
}

impl DistanceRecord {
    pub fn matched(id: FeatureId, distance: f64) -> Self {
        Self {
            id1: Some(id.clone()),
            id2: Some(id),
            distance: Some(distance),
        }
    }

    pub fn only_first(id: FeatureId) -> Self {
        Self {
            id1: Some(id),
            id2: None,
            distance: None,
        }
    }

    pub fn only_second(id: FeatureId) -> Self {
        Self {
            id1: None,
            id2: Some(id),
            distance: None,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.id1.is_some() && self.id2.is_some()
    }

    pub fn same_pair(&self, other: &Self) -> bool {
        self.id1 == other.id1 && self.id2 == other.id2
    }
}

/// Final merged row.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultRow {
    pub id1: Option<FeatureId>,
    pub id2: Option<FeatureId>,
    pub straight_distance: Option<f64>,
    pub along_axis_distance: Option<f64>,
}

/// Column names of the result table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnNames {
    pub id1: String,
    pub id2: String,
    pub straight_distance: String,
    pub along_axis_distance: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            id1: "ID1".into(),
            id2: "ID2".into(),
            straight_distance: "straight_dist".into(),
            along_axis_distance: "river_dist".into(),
        }
    }
}

impl ColumnNames {
    pub fn as_array(&self) -> [&str; 4] {
        [
            &self.id1,
            &self.id2,
            &self.straight_distance,
            &self.along_axis_distance,
        ]
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RiverDistanceError {
    #[error("Invalid input geometry: {0}")]
    InvalidInputGeometry(String),

    #[error("Unsupported geometry: {0}")]
    UnsupportedGeometry(String),

    #[error(
        "Distance tables are misaligned at row {index}: straight line has {straight}, along axis has {along_axis}"
    )]
    ResultAlignment {
        index: usize,
        straight: String,
        along_axis: String,
    },

    #[error("CRS error: {0}")]
    Crs(String),

    #[error("Cannot mix CRS {left} with {right}")]
    CrsMismatch { left: String, right: String },

    #[error("Empty geometry: {0}")]
    EmptyGeometry(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, RiverDistanceError>;
