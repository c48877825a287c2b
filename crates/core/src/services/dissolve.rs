use geo::{Coord, LineString, MultiLineString};
use hashbrown::HashMap;

use crate::models::traits::LineDissolver;
use crate::models::types::{Result, RiverDistanceError};

/// Key for coordinate-based endpoint matching
/// Uses fixed-point representation to avoid floating point issues
pub(crate) fn coord_key(coord: &Coord<f64>) -> (i64, i64) {
    // 7 decimal places
    let x = (coord.x * 10_000_000.0).round() as i64;
    let y = (coord.y * 10_000_000.0).round() as i64;
    (x, y)
}

/// Dissolves line parts by chaining those that share endpoints.
///
/// The output is always a single multi-part feature. Parts that touch end to
/// end are joined into one line string, reversing a part when its end
/// meets the chain's end; parts that touch nothing stay separate.
#[derive(Clone, Copy, Debug, Default)]
pub struct EndpointDissolver;

impl LineDissolver for EndpointDissolver {
    fn dissolve(&self, parts: &[LineString<f64>]) -> Result<MultiLineString<f64>> {
        let merged = merge_parts(parts);
        if merged.0.is_empty() {
            return Err(RiverDistanceError::UnsupportedGeometry(
                "Dissolving the river lines produced no linear feature".into(),
            ));
        }
        Ok(merged)
    }
}

/// Chain parts end to end.
pub fn merge_parts(parts: &[LineString<f64>]) -> MultiLineString<f64> {
    let parts: Vec<&LineString<f64>> = parts.iter().filter(|p| p.0.len() >= 2).collect();

    // Maps coordinate key -> list of part indices that start/end at that coord
    let mut start_index: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    let mut end_index: HashMap<(i64, i64), Vec<usize>> = HashMap::new();

    for (idx, part) in parts.iter().enumerate() {
        if let (Some(first), Some(last)) = (part.0.first(), part.0.last()) {
            start_index.entry(coord_key(first)).or_default().push(idx);
            end_index.entry(coord_key(last)).or_default().push(idx);
        }
    }

    let mut used = vec![false; parts.len()];
    let mut lines = Vec::new();

    for seed_idx in 0..parts.len() {
        if used[seed_idx] {
            continue;
        }
        used[seed_idx] = true;

        let mut coords: Vec<Coord<f64>> = parts[seed_idx].0.clone();

        // Grow forward, then flip and grow from the other end.
        extend_chain(&mut coords, &parts, &start_index, &end_index, &mut used);
        coords.reverse();
        extend_chain(&mut coords, &parts, &start_index, &end_index, &mut used);
        coords.reverse();

        lines.push(LineString::new(coords));
    }

    log::debug!("Dissolved {} parts into {} lines", parts.len(), lines.len());

    MultiLineString::new(lines)
}

fn extend_chain(
    coords: &mut Vec<Coord<f64>>,
    parts: &[&LineString<f64>],
    start_index: &HashMap<(i64, i64), Vec<usize>>,
    end_index: &HashMap<(i64, i64), Vec<usize>>,
    used: &mut [bool],
) {
    let Some(first) = coords.first() else {
        return;
    };
    let chain_start = coord_key(first);

    while let Some(last) = coords.last() {
        let current_end = coord_key(last);

        // Closed ring, nothing left to attach
        if coords.len() >= 4 && current_end == chain_start {
            return;
        }

        // A part that starts where we end
        let forward = start_index
            .get(&current_end)
            .and_then(|candidates| candidates.iter().copied().find(|&i| !used[i]));
        if let Some(next_idx) = forward {
            coords.extend(parts[next_idx].0.iter().skip(1).copied());
            used[next_idx] = true;
            continue;
        }

        // A part that ends where we end, appended reversed
        let backward = end_index
            .get(&current_end)
            .and_then(|candidates| candidates.iter().copied().find(|&i| !used[i]));
        if let Some(next_idx) = backward {
            coords.extend(parts[next_idx].0.iter().rev().skip(1).copied());
            used[next_idx] = true;
            continue;
        }

        return;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    fn line(coords: &[(f64, f64)]) -> LineString<f64> {
        LineString::new(coords.iter().map(|&(x, y)| coord(x, y)).collect())
    }

    #[test]
    fn test_merge_chained_parts() {
        let parts = vec![
            line(&[(0.0, 0.0), (1.0, 0.0)]),
            line(&[(1.0, 0.0), (2.0, 0.0)]),
            line(&[(2.0, 0.0), (3.0, 1.0)]),
        ];

        let merged = merge_parts(&parts);
        assert_eq!(merged.0.len(), 1);
        assert_eq!(merged.0[0].0.len(), 4);
        assert_eq!(merged.0[0].0.first(), Some(&coord(0.0, 0.0)));
        assert_eq!(merged.0[0].0.last(), Some(&coord(3.0, 1.0)));
    }

    #[test]
    fn test_merge_reversed_part() {
        // Second part digitised the other way round
        let parts = vec![
            line(&[(0.0, 0.0), (1.0, 0.0)]),
            line(&[(2.0, 0.0), (1.0, 0.0)]),
        ];

        let merged = merge_parts(&parts);
        assert_eq!(merged.0.len(), 1);
        assert_eq!(
            merged.0[0].0,
            vec![coord(0.0, 0.0), coord(1.0, 0.0), coord(2.0, 0.0)]
        );
    }

    #[test]
    fn test_merge_grows_both_ends() {
        // Seed is the middle part
        let parts = vec![
            line(&[(1.0, 0.0), (2.0, 0.0)]),
            line(&[(0.0, 0.0), (1.0, 0.0)]),
            line(&[(2.0, 0.0), (3.0, 0.0)]),
        ];

        let merged = merge_parts(&parts);
        assert_eq!(merged.0.len(), 1);
        assert_eq!(merged.0[0].0.len(), 4);
    }

    #[test]
    fn test_disjoint_parts_stay_in_one_feature() {
        let parts = vec![
            line(&[(0.0, 0.0), (1.0, 0.0)]),
            line(&[(5.0, 0.0), (6.0, 0.0)]),
            line(&[(10.0, 0.0), (11.0, 0.0)]),
        ];

        let dissolved = EndpointDissolver.dissolve(&parts).unwrap();
        assert_eq!(dissolved.0.len(), 3);
    }

    #[test]
    fn test_dissolve_nothing_is_unsupported() {
        let err = EndpointDissolver.dissolve(&[line(&[(0.0, 0.0)])]).unwrap_err();
        assert!(matches!(err, RiverDistanceError::UnsupportedGeometry(_)));
    }

    #[test]
    fn test_coord_key_precision() {
        let c1 = coord(0.1234567, 0.1234567);
        let c2 = coord(0.12345671, 0.12345671);
        let c3 = coord(0.1234568, 0.1234568);

        assert_eq!(coord_key(&c1), coord_key(&c2));
        assert_ne!(coord_key(&c1), coord_key(&c3));
    }
}
