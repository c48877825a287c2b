//! Outer-join distances between two keyed coordinate maps.

use geo::Coord;
use hashbrown::HashMap;

use crate::identifiers::FeatureId;
use crate::models::types::{DistanceRecord, PointSet, ProjectedPointSet, Result};
use crate::services::geodesy::GeodesyContext;

/// Coordinates keyed by feature id, remembering first-appearance order.
///
/// A repeated id overwrites the coordinate but keeps its first position.
#[derive(Clone, Debug, Default)]
pub struct KeyedCoordinates {
    order: Vec<FeatureId>,
    coords: HashMap<FeatureId, Coord<f64>>,
}

impl KeyedCoordinates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: FeatureId, coord: Coord<f64>) {
        if self.coords.insert(id.clone(), coord).is_some() {
            log::warn!("Duplicate id {}, keeping the last coordinate", id);
        } else {
            self.order.push(id);
        }
    }

    pub fn get(&self, id: &FeatureId) -> Option<Coord<f64>> {
        self.coords.get(id).copied()
    }

    pub fn contains(&self, id: &FeatureId) -> bool {
        self.coords.contains_key(id)
    }

    /// Ids in first-appearance order.
    pub fn ids(&self) -> &[FeatureId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl FromIterator<(FeatureId, Coord<f64>)> for KeyedCoordinates {
    fn from_iter<I: IntoIterator<Item = (FeatureId, Coord<f64>)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (id, coord) in iter {
            map.insert(id, coord);
        }
        map
    }
}

impl From<&PointSet> for KeyedCoordinates {
    fn from(set: &PointSet) -> Self {
        set.features.iter().map(|f| (f.id.clone(), f.coord)).collect()
    }
}

impl From<&ProjectedPointSet> for KeyedCoordinates {
    fn from(set: &ProjectedPointSet) -> Self {
        set.points.iter().map(|p| (p.id.clone(), p.coord)).collect()
    }
}

/// Distance per identifier over the union of both maps.
///
/// Ids of `map1` come first in their order, followed by ids only found in
/// `map2`. Matched ids get the distance measured in `context`; an id present
/// on one side only gets a record with the other id and the distance null.
/// Both maps must hold coordinates in the context's CRS.
pub fn pairwise(
    map1: &KeyedCoordinates,
    map2: &KeyedCoordinates,
    context: &GeodesyContext<'_>,
) -> Result<Vec<DistanceRecord>> {
    let matched: Vec<&FeatureId> = map1.ids().iter().filter(|id| map2.contains(id)).collect();

    let mut left = Vec::with_capacity(matched.len());
    let mut right = Vec::with_capacity(matched.len());
    for id in &matched {
        if let (Some(a), Some(b)) = (map1.get(id), map2.get(id)) {
            left.push(a);
            right.push(b);
        }
    }
    context.normalise(&mut left)?;
    context.normalise(&mut right)?;

    let mut distances: HashMap<&FeatureId, f64> = HashMap::with_capacity(matched.len());
    for ((id, a), b) in matched.iter().zip(left).zip(right) {
        distances.insert(*id, context.measure(a, b));
    }

    let mut records = Vec::with_capacity(map1.len() + map2.len() - matched.len());
    for id in map1.ids() {
        records.push(match distances.get(id) {
            Some(&d) => DistanceRecord::matched(id.clone(), d),
            None => DistanceRecord::only_first(id.clone()),
        });
    }
    for id in map2.ids() {
        if !map1.contains(id) {
            records.push(DistanceRecord::only_second(id.clone()));
        }
    }

    log::debug!(
        "Pairwise: {} matched, {} records",
        matched.len(),
        records.len()
    );

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::Crs;
    use crate::models::types::RiverDistanceError;
    use crate::services::geodesy::ProjGeodesy;
    use approx::assert_abs_diff_eq;
    use hashbrown::HashSet;

    fn keyed(entries: &[(&str, f64, f64)]) -> KeyedCoordinates {
        entries
            .iter()
            .map(|&(id, x, y)| (FeatureId::text(id), Coord { x, y }))
            .collect()
    }

    fn engineering<'a>(geodesy: &'a ProjGeodesy) -> GeodesyContext<'a> {
        GeodesyContext::new(&Crs::engineering(), geodesy).unwrap()
    }

    #[test]
    fn test_outer_join_example() {
        let geodesy = ProjGeodesy;
        let a = keyed(&[("p1", 0.0, 0.0), ("p2", 10.0, 0.0)]);
        let b = keyed(&[("p1", 0.0, 5.0), ("p3", 10.0, 5.0)]);

        let records = pairwise(&a, &b, &engineering(&geodesy)).unwrap();

        assert_eq!(
            records,
            vec![
                DistanceRecord::matched(FeatureId::text("p1"), 5.0),
                DistanceRecord::only_first(FeatureId::text("p2")),
                DistanceRecord::only_second(FeatureId::text("p3")),
            ]
        );
    }

    #[test]
    fn test_union_completeness_and_null_correctness() {
        let geodesy = ProjGeodesy;
        let a = keyed(&[("a", 0.0, 0.0), ("b", 1.0, 1.0), ("c", 2.0, 2.0), ("d", 3.0, 3.0)]);
        let b = keyed(&[("c", 2.0, 3.0), ("e", 0.0, 0.0), ("a", 5.0, 0.0), ("f", 1.0, 0.0)]);

        let records = pairwise(&a, &b, &engineering(&geodesy)).unwrap();

        let expected: HashSet<FeatureId> = a.ids().iter().chain(b.ids()).cloned().collect();
        let got: HashSet<FeatureId> = records
            .iter()
            .flat_map(|r| r.id1.iter().chain(r.id2.iter()))
            .cloned()
            .collect();
        assert_eq!(got, expected);
        assert_eq!(records.len(), expected.len());

        for r in &records {
            assert!(r.id1.is_some() || r.id2.is_some());
            match (&r.id1, &r.id2) {
                (Some(x), Some(y)) => {
                    assert_eq!(x, y);
                    assert!(r.distance.is_some_and(|d| d >= 0.0));
                }
                _ => assert!(r.distance.is_none()),
            }
        }
    }

    #[test]
    fn test_both_runs_share_identifier_sequence() {
        let geodesy = ProjGeodesy;
        let ctx = engineering(&geodesy);
        let raw1 = keyed(&[("x", 1.0, 1.0), ("y", 2.0, 2.0)]);
        let raw2 = keyed(&[("y", 0.0, 0.0), ("z", 3.0, 3.0)]);
        let proj1 = keyed(&[("x", 1.0, 0.0), ("y", 2.0, 0.0)]);
        let proj2 = keyed(&[("y", 0.0, 0.0), ("z", 3.0, 0.0)]);

        let straight = pairwise(&raw1, &raw2, &ctx).unwrap();
        let along = pairwise(&proj1, &proj2, &ctx).unwrap();

        assert_eq!(straight.len(), along.len());
        assert!(straight.iter().zip(&along).all(|(s, a)| s.same_pair(a)));
    }

    #[test]
    fn test_integer_and_text_ids_join() {
        let geodesy = ProjGeodesy;
        let a: KeyedCoordinates = [(FeatureId::from(7i64), Coord { x: 0.0, y: 0.0 })]
            .into_iter()
            .collect();
        let b: KeyedCoordinates = [(FeatureId::text("7"), Coord { x: 3.0, y: 4.0 })]
            .into_iter()
            .collect();

        let records = pairwise(&a, &b, &engineering(&geodesy)).unwrap();
        assert_eq!(records.len(), 1);
        assert_abs_diff_eq!(records[0].distance.unwrap(), 5.0);
    }

    #[test]
    fn test_duplicate_id_keeps_last_value_first_position() {
        let map = keyed(&[("a", 0.0, 0.0), ("b", 1.0, 1.0), ("a", 9.0, 9.0)]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.ids()[0], FeatureId::text("a"));
        assert_eq!(map.get(&FeatureId::text("a")), Some(Coord { x: 9.0, y: 9.0 }));
    }

    #[test]
    fn test_empty_maps() {
        let geodesy = ProjGeodesy;
        let records =
            pairwise(&KeyedCoordinates::new(), &KeyedCoordinates::new(), &engineering(&geodesy))
                .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_geographic_distance() {
        let geodesy = ProjGeodesy;
        let ctx = GeodesyContext::new(&Crs::wgs84(), &geodesy).unwrap();
        let a = keyed(&[("p", 0.0, 0.0)]);
        let b = keyed(&[("p", 1.0, 0.0)]);

        let records = pairwise(&a, &b, &ctx).unwrap();
        assert_abs_diff_eq!(records[0].distance.unwrap(), 111_319.49, epsilon = 0.01);
    }

    #[test]
    fn test_out_of_range_geographic_coordinates_fail() {
        let geodesy = ProjGeodesy;
        let ctx = GeodesyContext::new(&Crs::wgs84(), &geodesy).unwrap();
        let a = keyed(&[("p1", 500_000.0, 5_000_000.0)]);
        let b = keyed(&[("p1", 500_100.0, 5_000_100.0)]);

        let err = pairwise(&a, &b, &ctx).unwrap_err();
        assert!(matches!(err, RiverDistanceError::Crs(_)));

        // Unmatched ids are never measured
        let c = keyed(&[("p2", 500_100.0, 5_000_100.0)]);
        assert_eq!(pairwise(&a, &c, &ctx).unwrap().len(), 2);
    }
}
