//! Default in-process implementations of the collaborator traits.

pub mod dissolve;
pub mod feedback;
pub mod geodesy;
pub mod registry;
pub mod skeleton;

pub use dissolve::{EndpointDissolver, merge_parts};
pub use feedback::LogFeedback;
pub use geodesy::{GeodesyContext, Metric, ProjGeodesy, check_compatible};
pub use registry::{MemoryRegistry, NullRegistry, StagedLayer};
pub use skeleton::VoronoiSkeletonizer;
