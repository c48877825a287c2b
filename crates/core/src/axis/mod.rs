//! The reference axis points are projected onto.

pub mod builder;

use std::sync::Arc;

use geo::{LineString, MultiLineString, MultiPoint, MultiPolygon};

use crate::crs::Crs;
use crate::models::types::GeometryKind;

pub use builder::{AxisBuilder, BuiltAxis};

/// How the axis was obtained from the reference layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum AxisOrigin {
    /// A single line used as is.
    PassThrough,
    /// Several line parts merged into one feature.
    Dissolved,
    /// Centre line of a polygon.
    Skeleton,
}

/// One linear feature in a fixed CRS.
///
/// The geometry may hold several line strings, but they are addressed as a
/// single curve: projection always considers all of them.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearAxis {
    pub geometry: MultiLineString<f64>,
    pub crs: Crs,
    pub origin: AxisOrigin,
}

impl LinearAxis {
    pub fn is_derived(&self) -> bool {
        self.origin != AxisOrigin::PassThrough
    }

    pub fn vertex_count(&self) -> usize {
        self.geometry.0.iter().map(|l| l.0.len()).sum()
    }

    /// Planar length in CRS units.
    pub fn planar_length(&self) -> f64 {
        self.geometry
            .0
            .iter()
            .flat_map(|l| l.lines())
            .map(|seg| {
                let d = seg.delta();
                d.x.hypot(d.y)
            })
            .sum()
    }
}

/// Reference geometry, tagged by kind.
#[derive(Clone, Debug, PartialEq)]
pub enum ReferenceGeometry {
    Point(MultiPoint<f64>),
    Line(Vec<LineString<f64>>),
    Polygon(MultiPolygon<f64>),
}

impl ReferenceGeometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            ReferenceGeometry::Point(_) => GeometryKind::Point,
            ReferenceGeometry::Line(_) => GeometryKind::Line,
            ReferenceGeometry::Polygon(_) => GeometryKind::Polygon,
        }
    }
}

/// The river layer as read from the host.
#[derive(Clone, Debug)]
pub struct ReferenceLayer {
    pub name: Arc<str>,
    pub geometry: ReferenceGeometry,
    pub crs: Crs,
}

impl ReferenceLayer {
    pub fn new(name: impl AsRef<str>, geometry: ReferenceGeometry, crs: Crs) -> Self {
        Self {
            name: name.as_ref().into(),
            geometry,
            crs,
        }
    }

    pub fn kind(&self) -> GeometryKind {
        self.geometry.kind()
    }
}
