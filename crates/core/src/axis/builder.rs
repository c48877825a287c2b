use geo::{LineString, MultiLineString};

use crate::axis::{AxisOrigin, LinearAxis, ReferenceGeometry, ReferenceLayer};
use crate::models::traits::{LayerRegistry, LineDissolver, Skeletonizer};
use crate::models::types::{GeometryKind, Result, RiverDistanceError};
use crate::services::registry::StagedLayer;

/// Layer name a derived axis is staged under.
pub const CENTERLINE_LAYER: &str = "centerline";

/// An axis plus the registration of its intermediate layer, if any.
///
/// The layer stays registered until this value (or its `staged` guard) is
/// dropped.
pub struct BuiltAxis<'r> {
    pub axis: LinearAxis,
    pub staged: Option<StagedLayer<'r>>,
}

impl BuiltAxis<'_> {
    /// Unregister the intermediate layer and keep the axis.
    pub fn into_axis(self) -> LinearAxis {
        if let Some(staged) = self.staged {
            staged.release();
        }
        self.axis
    }
}

/// Normalises a reference layer into a single linear axis.
pub struct AxisBuilder<'a> {
    skeletonizer: &'a dyn Skeletonizer,
    dissolver: &'a dyn LineDissolver,
    registry: &'a dyn LayerRegistry,
    smoothness: f64,
    thin: f64,
}

impl<'a> AxisBuilder<'a> {
    pub fn new(
        skeletonizer: &'a dyn Skeletonizer,
        dissolver: &'a dyn LineDissolver,
        registry: &'a dyn LayerRegistry,
    ) -> Self {
        Self {
            skeletonizer,
            dissolver,
            registry,
            smoothness: 0.1,
            thin: -1.0,
        }
    }

    pub fn with_skeleton_parameters(mut self, smoothness: f64, thin: f64) -> Self {
        self.smoothness = smoothness;
        self.thin = thin;
        self
    }

    pub fn build(&self, reference: &ReferenceLayer) -> Result<BuiltAxis<'a>> {
        let (geometry, origin) = match &reference.geometry {
            ReferenceGeometry::Point(_) => {
                return Err(RiverDistanceError::InvalidInputGeometry(format!(
                    "River layer '{}' is of {} type, a line or polygon layer is required",
                    reference.name,
                    GeometryKind::Point
                )));
            }
            ReferenceGeometry::Polygon(polygon) => {
                log::info!(
                    "Skeletonizing river polygon ({} parts, smoothness {}, thin {})",
                    polygon.0.len(),
                    self.smoothness,
                    self.thin
                );
                let lines = self
                    .skeletonizer
                    .skeletonize(polygon, self.smoothness, self.thin)?;
                (non_empty(lines, "Skeletonization")?, AxisOrigin::Skeleton)
            }
            ReferenceGeometry::Line(parts) => {
                let parts: Vec<LineString<f64>> =
                    parts.iter().filter(|p| has_length(p)).cloned().collect();
                match parts.len() {
                    0 => {
                        return Err(RiverDistanceError::EmptyGeometry(format!(
                            "River layer '{}' has no line of non-zero length",
                            reference.name
                        )));
                    }
                    1 => (MultiLineString::new(parts), AxisOrigin::PassThrough),
                    n => {
                        log::info!("Dissolving {} river line parts", n);
                        let lines = self.dissolver.dissolve(&parts)?;
                        (non_empty(lines, "Dissolve")?, AxisOrigin::Dissolved)
                    }
                }
            }
        };

        let axis = LinearAxis {
            geometry,
            crs: reference.crs.clone(),
            origin,
        };
        log::debug!(
            "Axis ({}): {} line strings, {} vertices",
            axis.origin,
            axis.geometry.0.len(),
            axis.vertex_count()
        );

        let staged = axis
            .is_derived()
            .then(|| StagedLayer::stage(self.registry, CENTERLINE_LAYER, &axis));

        Ok(BuiltAxis { axis, staged })
    }
}

/// At least one segment with distinct end points.
fn has_length(line: &LineString<f64>) -> bool {
    line.lines().any(|segment| segment.start != segment.end)
}

fn non_empty(lines: MultiLineString<f64>, step: &str) -> Result<MultiLineString<f64>> {
    let lines: Vec<LineString<f64>> = lines.0.into_iter().filter(has_length).collect();
    if lines.is_empty() {
        return Err(RiverDistanceError::UnsupportedGeometry(format!(
            "{} produced no linear feature",
            step
        )));
    }
    Ok(MultiLineString::new(lines))
}
