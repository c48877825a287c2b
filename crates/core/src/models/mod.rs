//! Data model, errors and collaborator traits.

pub mod traits;
pub mod types;

// Re-exports for convenience
pub use traits::{
    Feedback, Geodesy, LayerHandle, LayerRegistry, LineDissolver, ResultSink, Skeletonizer,
};
pub use types::{
    ColumnNames, DistanceRecord, GeometryKind, PointFeature, PointSet, ProjectedPoint,
    ProjectedPointSet, Result, ResultRow, RiverDistanceError, round_to,
};
