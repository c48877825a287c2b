//! Merges the straight-line and along-axis distance tables.

use crate::identifiers::FeatureId;
use crate::models::types::{DistanceRecord, Result, ResultRow, RiverDistanceError, round_to};

/// Zip two distance tables into result rows.
///
/// Both tables must list the same (id1, id2) pairs in the same order;
/// otherwise the first differing row is reported as a
/// [`RiverDistanceError::ResultAlignment`]. Distances are rounded to
/// `decimals` places independently, nulls stay null.
pub fn assemble(
    straight: &[DistanceRecord],
    along_axis: &[DistanceRecord],
    decimals: u32,
) -> Result<Vec<ResultRow>> {
    if let Some(index) = first_misaligned(straight, along_axis) {
        return Err(RiverDistanceError::ResultAlignment {
            index,
            straight: describe(straight.get(index)),
            along_axis: describe(along_axis.get(index)),
        });
    }

    Ok(straight
        .iter()
        .zip(along_axis)
        .map(|(s, a)| ResultRow {
            id1: s.id1.clone(),
            id2: s.id2.clone(),
            straight_distance: s.distance.map(|d| round_to(d, decimals)),
            along_axis_distance: a.distance.map(|d| round_to(d, decimals)),
        })
        .collect())
}

fn first_misaligned(straight: &[DistanceRecord], along_axis: &[DistanceRecord]) -> Option<usize> {
    straight
        .iter()
        .zip(along_axis)
        .position(|(s, a)| !s.same_pair(a))
        .or_else(|| {
            (straight.len() != along_axis.len()).then(|| straight.len().min(along_axis.len()))
        })
}

fn describe(record: Option<&DistanceRecord>) -> String {
    fn id(id: &Option<FeatureId>) -> String {
        id.as_ref().map_or_else(|| "null".to_string(), |i| i.to_string())
    }

    match record {
        Some(r) => format!("({}, {})", id(&r.id1), id(&r.id2)),
        None => "no row".to_string(),
    }
}
