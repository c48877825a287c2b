//! Collaborator interfaces consumed by the pipeline.
//!
//! Each trait has an in-process default implementation under
//! [`crate::services`]; hosts can substitute their own.

use geo::{Coord, LineString, MultiLineString, MultiPolygon};

use crate::axis::LinearAxis;
use crate::crs::{Crs, Ellipsoid};
use crate::models::types::{ColumnNames, Result, ResultRow};

// ============================================================================
// Geometry Services
// ============================================================================

/// Derives a centre line from a polygon's interior.
pub trait Skeletonizer: Send + Sync {
    /// `smoothness` is the boundary densification spacing in map units.
    /// A negative `thin` keeps only the centre line; otherwise dangling
    /// branches shorter than `thin` are pruned.
    fn skeletonize(
        &self,
        polygon: &MultiPolygon<f64>,
        smoothness: f64,
        thin: f64,
    ) -> Result<MultiLineString<f64>>;
}

/// Unions several line parts into one linear feature.
pub trait LineDissolver: Send + Sync {
    fn dissolve(&self, parts: &[LineString<f64>]) -> Result<MultiLineString<f64>>;
}

// ============================================================================
// Geodesy
// ============================================================================

pub trait Geodesy: Send + Sync {
    /// Transform one coordinate. Geographic coordinates are (lon, lat) in degrees.
    fn transform(&self, coord: Coord<f64>, from: &Crs, to: &Crs) -> Result<Coord<f64>>;

    /// Transform a batch in place.
    fn transform_all(&self, coords: &mut [Coord<f64>], from: &Crs, to: &Crs) -> Result<()> {
        for c in coords.iter_mut() {
            *c = self.transform(*c, from, to)?;
        }
        Ok(())
    }

    fn to_geographic(&self, coord: Coord<f64>, crs: &Crs) -> Result<Coord<f64>> {
        if crs.is_geographic() {
            return Ok(coord);
        }
        self.transform(coord, crs, &crs.geographic()?)
    }

    /// Geodesic distance in metres between two (lon, lat) coordinates.
    fn ellipsoidal_distance(&self, a: Coord<f64>, b: Coord<f64>, ellipsoid: Ellipsoid) -> f64;
}

// ============================================================================
// Host Collaborators
// ============================================================================

/// Opaque handle returned by [`LayerRegistry::register`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayerHandle(pub u64);

/// Transient registry of layers visible to the host.
pub trait LayerRegistry: Send + Sync {
    fn register(&self, name: &str, axis: &LinearAxis) -> LayerHandle;
    fn unregister(&self, handle: LayerHandle);
}

/// User-facing progress, error reporting and cancellation.
pub trait Feedback: Send + Sync {
    fn push_info(&self, message: &str);
    fn report_error(&self, message: &str);
    fn is_canceled(&self) -> bool;
}

/// Destination for the result table.
pub trait ResultSink {
    fn write_header(&mut self, columns: &ColumnNames) -> Result<()>;
    fn write_row(&mut self, row: &ResultRow) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}
