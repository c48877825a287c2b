//! End-to-end run: axis, projections, both distance tables, result table.

use std::sync::Arc;

use hashbrown::HashSet;

use crate::assembler::assemble;
use crate::axis::{AxisBuilder, AxisOrigin, BuiltAxis, LinearAxis, ReferenceLayer};
use crate::config::PipelineConfig;
use crate::crs::Crs;
use crate::identifiers::FeatureId;
use crate::models::traits::{
    Feedback, Geodesy, LayerRegistry, LineDissolver, ResultSink, Skeletonizer,
};
use crate::models::types::{PointSet, ProjectedPointSet, Result, ResultRow};
use crate::pairwise::{KeyedCoordinates, pairwise};
use crate::projector::project;
use crate::services::{
    EndpointDissolver, GeodesyContext, NullRegistry, ProjGeodesy, VoronoiSkeletonizer,
    check_compatible,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum PipelineState {
    Start,
    AxisReady,
    Projected,
    DistancesComputed,
    Assembled,
    Done,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// Stopped at a cancellation check; outputs are partial.
    Canceled,
}

/// A point left out of both distance tables.
#[derive(Clone, Debug, PartialEq)]
pub struct SkippedPoint {
    pub layer: Arc<str>,
    pub id: FeatureId,
}

pub struct PipelineInputs {
    pub points1: PointSet,
    pub points2: PointSet,
    pub reference: ReferenceLayer,
}

#[derive(Debug)]
pub struct PipelineOutput {
    pub status: RunStatus,
    pub rows: Vec<ResultRow>,
    /// Only set for polygon rivers.
    pub centerline: Option<LinearAxis>,
    pub projected1: Option<ProjectedPointSet>,
    pub projected2: Option<ProjectedPointSet>,
    pub skipped: Vec<SkippedPoint>,
    pub final_state: PipelineState,
}

impl PipelineOutput {
    fn canceled(state: PipelineState, skipped: Vec<SkippedPoint>) -> Self {
        Self {
            status: RunStatus::Canceled,
            rows: Vec::new(),
            centerline: None,
            projected1: None,
            projected2: None,
            skipped,
            final_state: state,
        }
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    skeletonizer: Arc<dyn Skeletonizer>,
    dissolver: Arc<dyn LineDissolver>,
    geodesy: Arc<dyn Geodesy>,
    registry: Arc<dyn LayerRegistry>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let skeletonizer = VoronoiSkeletonizer {
            max_sites: config.max_skeleton_sites,
        };
        Self {
            config,
            skeletonizer: Arc::new(skeletonizer),
            dissolver: Arc::new(EndpointDissolver),
            geodesy: Arc::new(ProjGeodesy),
            registry: Arc::new(NullRegistry),
        }
    }

    pub fn with_skeletonizer(mut self, skeletonizer: Arc<dyn Skeletonizer>) -> Self {
        self.skeletonizer = skeletonizer;
        self
    }

    pub fn with_dissolver(mut self, dissolver: Arc<dyn LineDissolver>) -> Self {
        self.dissolver = dissolver;
        self
    }

    pub fn with_geodesy(mut self, geodesy: Arc<dyn Geodesy>) -> Self {
        self.geodesy = geodesy;
        self
    }

    pub fn with_registry(mut self, registry: Arc<dyn LayerRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline and write the result table to `sink`.
    ///
    /// Fatal errors are reported through `feedback` before being returned.
    /// Cancellation is not an error: the run stops at the next check and
    /// returns [`RunStatus::Canceled`] with nothing written to `sink`.
    pub fn run(
        &self,
        inputs: PipelineInputs,
        feedback: &dyn Feedback,
        sink: &mut dyn ResultSink,
    ) -> Result<PipelineOutput> {
        let mut state = PipelineState::Start;
        match self.execute(inputs, feedback, sink, &mut state) {
            Ok(output) => Ok(output),
            Err(e) => {
                log::debug!("Pipeline failed in state {}", state);
                advance(&mut state, PipelineState::Error);
                feedback.report_error(&e.to_string());
                Err(e)
            }
        }
    }

    fn execute(
        &self,
        inputs: PipelineInputs,
        feedback: &dyn Feedback,
        sink: &mut dyn ResultSink,
        state: &mut PipelineState,
    ) -> Result<PipelineOutput> {
        let PipelineInputs {
            mut points1,
            mut points2,
            reference,
        } = inputs;
        let config = &self.config;

        // Start -> AxisReady
        feedback.push_info(&format!(
            "Building reference axis from {} layer '{}'",
            reference.kind(),
            reference.name
        ));
        let builder = AxisBuilder::new(
            self.skeletonizer.as_ref(),
            self.dissolver.as_ref(),
            self.registry.as_ref(),
        )
        .with_skeleton_parameters(config.skeleton_smoothness, config.skeleton_thin);
        let BuiltAxis { axis, staged } = builder.build(&reference)?;
        advance(state, PipelineState::AxisReady);
        if feedback.is_canceled() {
            return Ok(PipelineOutput::canceled(*state, Vec::new()));
        }

        let mut skipped = Vec::new();
        for set in [&mut points1, &mut points2] {
            for id in set.take_degenerate() {
                log::warn!("Point {} in '{}' has no valid coordinate, skipped", id, set.name);
                skipped.push(SkippedPoint {
                    layer: set.name.clone(),
                    id,
                });
            }
        }

        // AxisReady -> Projected
        feedback.push_info("Projecting points onto the reference axis");
        let on_axis1 = reproject(&points1, &axis.crs, self.geodesy.as_ref())?;
        let on_axis2 = reproject(&points2, &axis.crs, self.geodesy.as_ref())?;
        let offset_decimals = config.offset_decimals;
        let (projected1, projected2) = rayon::join(
            || project(&on_axis1, &axis, offset_decimals),
            || project(&on_axis2, &axis, offset_decimals),
        );
        let (projected1, projected2) = (projected1?, projected2?);
        advance(state, PipelineState::Projected);
        if feedback.is_canceled() {
            return Ok(PipelineOutput::canceled(*state, skipped));
        }

        // Unprojectable points leave the straight-line table too
        for (set, projected) in [(&mut points1, &projected1), (&mut points2, &projected2)] {
            if projected.skipped.is_empty() {
                continue;
            }
            let unprojectable: HashSet<&FeatureId> = projected.skipped.iter().collect();
            set.features.retain(|f| !unprojectable.contains(&f.id));
            skipped.extend(projected.skipped.iter().map(|id| SkippedPoint {
                layer: set.name.clone(),
                id: id.clone(),
            }));
        }

        // Projected -> DistancesComputed
        feedback.push_info("Computing straight and along-river distances");
        let points2 = reproject(&points2, &points1.crs, self.geodesy.as_ref())?;
        let straight_context = GeodesyContext::new(&points1.crs, self.geodesy.as_ref())?;
        let axis_context = GeodesyContext::new(&axis.crs, self.geodesy.as_ref())?;
        let raw1 = KeyedCoordinates::from(&points1);
        let raw2 = KeyedCoordinates::from(&points2);
        let keyed1 = KeyedCoordinates::from(&projected1);
        let keyed2 = KeyedCoordinates::from(&projected2);

        let (straight, along_axis) = rayon::join(
            || pairwise(&raw1, &raw2, &straight_context),
            || pairwise(&keyed1, &keyed2, &axis_context),
        );
        let (straight, along_axis) = (straight?, along_axis?);
        advance(state, PipelineState::DistancesComputed);
        if feedback.is_canceled() {
            return Ok(PipelineOutput::canceled(*state, skipped));
        }

        // DistancesComputed -> Assembled
        let rows = assemble(&straight, &along_axis, config.result_decimals)?;
        advance(state, PipelineState::Assembled);

        // Assembled -> Done
        sink.write_header(&config.columns)?;
        for row in &rows {
            sink.write_row(row)?;
        }
        sink.finish()?;

        // Hand-off: the intermediate layer must be gone before returning
        if let Some(staged) = staged {
            staged.release();
        }
        advance(state, PipelineState::Done);
        feedback.push_info(&format!("Wrote {} result rows", rows.len()));

        let centerline = (config.emit_centerline && axis.origin == AxisOrigin::Skeleton)
            .then_some(axis);
        let (projected1, projected2) = if config.emit_projected {
            (Some(projected1), Some(projected2))
        } else {
            (None, None)
        };

        Ok(PipelineOutput {
            status: RunStatus::Completed,
            rows,
            centerline,
            projected1,
            projected2,
            skipped,
            final_state: *state,
        })
    }
}

fn advance(state: &mut PipelineState, next: PipelineState) {
    log::debug!("Pipeline: {} -> {}", state, next);
    *state = next;
}

/// Copy of `set` with coordinates in `crs`.
fn reproject(set: &PointSet, crs: &Crs, geodesy: &dyn Geodesy) -> Result<PointSet> {
    if set.crs == *crs {
        return Ok(set.clone());
    }
    check_compatible(&set.crs, crs)?;
    log::debug!("Transforming '{}' from {} to {}", set.name, set.crs, crs);

    let mut coords: Vec<_> = set.features.iter().map(|f| f.coord).collect();
    geodesy.transform_all(&mut coords, &set.crs, crs)?;

    let mut out = set.clone();
    out.crs = crs.clone();
    for (feature, coord) in out.features.iter_mut().zip(coords) {
        feature.coord = coord;
    }
    Ok(out)
}
