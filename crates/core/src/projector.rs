//! Orthogonal projection of point sets onto the reference axis.

use geo::{Closest, ClosestPoint, Point};
use rayon::prelude::*;

use crate::axis::LinearAxis;
use crate::identifiers::FeatureId;
use crate::models::types::{
    PointFeature, PointSet, ProjectedPoint, ProjectedPointSet, Result, RiverDistanceError,
    round_to,
};

/// Projects every point onto the axis.
///
/// The projected point is the axis end of the shortest segment from the
/// point to the axis, and the offset is that segment's length rounded to
/// `offset_decimals` places. Points whose projection is indeterminate are
/// listed in [`ProjectedPointSet::skipped`]. Output order follows input order.
pub fn project(
    points: &PointSet,
    axis: &LinearAxis,
    offset_decimals: u32,
) -> Result<ProjectedPointSet> {
    if points.crs != axis.crs {
        return Err(RiverDistanceError::CrsMismatch {
            left: points.crs.to_string(),
            right: axis.crs.to_string(),
        });
    }

    let results: Vec<std::result::Result<ProjectedPoint, FeatureId>> = points
        .features
        .par_iter()
        .map(|feature| project_one(feature, axis, offset_decimals).ok_or(feature.id.clone()))
        .collect();

    let mut projected = Vec::with_capacity(results.len());
    let mut skipped = Vec::new();
    for result in results {
        match result {
            Ok(p) => projected.push(p),
            Err(id) => {
                log::warn!("Point {} in '{}' has no projection, skipped", id, points.name);
                skipped.push(id);
            }
        }
    }

    log::debug!(
        "Projected {} of {} points from '{}'",
        projected.len(),
        points.len(),
        points.name
    );

    Ok(ProjectedPointSet {
        name: points.name.clone(),
        id_field: points.id_field.clone(),
        crs: axis.crs.clone(),
        points: projected,
        skipped,
    })
}

/// Projection of one point, `None` when indeterminate.
pub fn project_one(
    feature: &PointFeature,
    axis: &LinearAxis,
    offset_decimals: u32,
) -> Option<ProjectedPoint> {
    if feature.is_degenerate() {
        return None;
    }

    let source = Point::from(feature.coord);
    let foot = match axis.geometry.closest_point(&source) {
        Closest::Intersection(p) | Closest::SinglePoint(p) => p,
        Closest::Indeterminate => return None,
    };

    let offset = (source.x() - foot.x()).hypot(source.y() - foot.y());

    Some(ProjectedPoint {
        id: feature.id.clone(),
        coord: foot.0,
        offset: round_to(offset, offset_decimals),
    })
}
