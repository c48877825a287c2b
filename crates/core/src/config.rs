use crate::models::types::ColumnNames;

/// Tunables for one pipeline run.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Boundary densification spacing for skeletonization, in map units.
    pub skeleton_smoothness: f64,
    /// Negative keeps only the centre line; otherwise the dangle pruning length.
    pub skeleton_thin: f64,
    pub max_skeleton_sites: usize,
    /// Decimal places kept on projection offsets.
    pub offset_decimals: u32,
    /// Decimal places kept on result distances.
    pub result_decimals: u32,
    pub columns: ColumnNames,
    /// Attribute name of the offset on projected point layers.
    pub offset_field: String,
    /// Return the derived centre line when the river is a polygon.
    pub emit_centerline: bool,
    /// Return the projected point sets.
    pub emit_projected: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            skeleton_smoothness: 0.1,
            skeleton_thin: -1.0,
            max_skeleton_sites: 100_000,
            offset_decimals: 6,
            result_decimals: 2,
            columns: ColumnNames::default(),
            offset_field: "distance".into(),
            emit_centerline: true,
            emit_projected: true,
        }
    }
}
