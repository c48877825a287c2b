//! # river-distance-core
//!
//! Straight-line and along-river distances between two point sets paired by
//! identifier.
//!
//! ## Pipeline
//!
//! - **Axis**: the river layer becomes one linear axis. Polygons are
//!   skeletonized to their centre line, multi-part lines are dissolved,
//!   a single line is used as is. Point layers are rejected.
//! - **Projection**: every point is snapped to its closest point on the axis.
//! - **Distances**: an outer join on the identifiers gives one straight-line
//!   table on the raw points and one along-axis table on the projections.
//! - **Assembly**: both tables are zipped into `ID1, ID2, straight_dist,
//!   river_dist` rows rounded to 2 decimals.
//!
//! Skeletonization, dissolving, geodesy, the host layer registry and the
//! output table are traits with in-process defaults under [`services`] and
//! [`sink`].
//!
//! ## Example
//!
//! ```
//! use river_distance_core::prelude::*;
//! use geo::line_string;
//!
//! let inputs = PipelineInputs {
//!     points1: PointSet::new(
//!         "a",
//!         "id",
//!         Crs::engineering(),
//!         vec![PointFeature::new("p1", 0.0, 0.0), PointFeature::new("p2", 10.0, 0.0)],
//!     ),
//!     points2: PointSet::new(
//!         "b",
//!         "id",
//!         Crs::engineering(),
//!         vec![PointFeature::new("p1", 0.0, 5.0), PointFeature::new("p3", 10.0, 5.0)],
//!     ),
//!     reference: ReferenceLayer::new(
//!         "river",
//!         ReferenceGeometry::Line(vec![line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)]]),
//!         Crs::engineering(),
//!     ),
//! };
//!
//! let mut table = InMemoryTable::new();
//! let output = Pipeline::default()
//!     .run(inputs, &LogFeedback::new(), &mut table)
//!     .unwrap();
//!
//! assert_eq!(output.rows.len(), 3);
//! assert_eq!(output.rows[0].straight_distance, Some(5.0));
//! assert_eq!(output.rows[0].along_axis_distance, Some(0.0));
//! ```

pub mod assembler;
pub mod axis;
pub mod config;
pub mod crs;
pub mod identifiers;
pub mod models;
pub mod pairwise;
pub mod pipeline;
pub mod projector;
pub mod services;
pub mod sink;

// Re-exports for convenience
pub mod prelude {
    pub use crate::assembler::assemble;
    pub use crate::axis::{
        AxisBuilder, AxisOrigin, BuiltAxis, LinearAxis, ReferenceGeometry, ReferenceLayer,
    };
    pub use crate::config::PipelineConfig;
    pub use crate::crs::{Crs, Ellipsoid};
    pub use crate::identifiers::FeatureId;
    pub use crate::models::{traits::*, types::*};
    pub use crate::pairwise::{KeyedCoordinates, pairwise};
    pub use crate::pipeline::{
        Pipeline, PipelineInputs, PipelineOutput, PipelineState, RunStatus, SkippedPoint,
    };
    pub use crate::projector::project;
    pub use crate::services::{
        EndpointDissolver, GeodesyContext, LogFeedback, MemoryRegistry, NullRegistry,
        ProjGeodesy, VoronoiSkeletonizer,
    };
    pub use crate::sink::{DelimitedFile, InMemoryTable};
}

pub use prelude::*;
