//! Voronoi-based polygon skeletons.
//!
//! The polygon boundary is densified into sites, the Voronoi diagram of the
//! sites is built with `voronoice`, and the Voronoi edges lying inside the
//! polygon form the skeleton graph. With a negative thinning value only the
//! longest path through that graph (the centre line) is kept.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use geo::{BoundingRect, Contains, Coord, Line, LineString, MultiLineString, MultiPolygon};
use hashbrown::{HashMap, HashSet};
use itertools::Itertools;
use voronoice::{BoundingBox, Point as Site, VoronoiBuilder};

use crate::models::traits::Skeletonizer;
use crate::models::types::{Result, RiverDistanceError};
use crate::services::dissolve::{coord_key, merge_parts};

#[derive(Clone, Copy, Debug)]
pub struct VoronoiSkeletonizer {
    /// Densification spacing is widened so the site count stays below this.
    pub max_sites: usize,
}

impl Default for VoronoiSkeletonizer {
    fn default() -> Self {
        Self { max_sites: 100_000 }
    }
}

impl Skeletonizer for VoronoiSkeletonizer {
    fn skeletonize(
        &self,
        polygon: &MultiPolygon<f64>,
        smoothness: f64,
        thin: f64,
    ) -> Result<MultiLineString<f64>> {
        let rect = polygon.bounding_rect().ok_or_else(|| {
            RiverDistanceError::EmptyGeometry("River polygon has no vertices".into())
        })?;

        let sites = self.boundary_sites(polygon, smoothness);
        if sites.len() < 3 {
            return Err(RiverDistanceError::UnsupportedGeometry(format!(
                "River polygon yields only {} boundary sites",
                sites.len()
            )));
        }
        log::debug!("Skeleton: {} boundary sites", sites.len());

        // Pad the clip box so no interior edge gets clipped
        let center = rect.center();
        let width = rect.width().max(f64::EPSILON) * 1.2;
        let height = rect.height().max(f64::EPSILON) * 1.2;

        let voronoi = VoronoiBuilder::default()
            .set_sites(sites)
            .set_bounding_box(BoundingBox::new(
                Site {
                    x: center.x,
                    y: center.y,
                },
                width,
                height,
            ))
            .build()
            .ok_or_else(|| {
                RiverDistanceError::UnsupportedGeometry(
                    "Failed to build Voronoi diagram of the river polygon".into(),
                )
            })?;

        let mut seen = HashSet::new();
        let mut graph = SkeletonGraph::default();

        for cell in voronoi.iter_cells() {
            let vertices: Vec<Coord<f64>> = cell
                .iter_vertices()
                .map(|p| Coord { x: p.x, y: p.y })
                .collect();

            for (a, b) in vertices.iter().circular_tuple_windows() {
                let (ka, kb) = (coord_key(a), coord_key(b));
                if ka == kb || !seen.insert(if ka < kb { (ka, kb) } else { (kb, ka) }) {
                    continue;
                }

                let line = Line::new(*a, *b);
                if polygon.0.iter().any(|p| p.contains(&line)) {
                    graph.add_edge(*a, *b);
                }
            }
        }

        log::debug!(
            "Skeleton: {} nodes, {} interior edges",
            graph.nodes.len(),
            graph.edges.len()
        );

        if graph.edges.is_empty() {
            return Err(RiverDistanceError::UnsupportedGeometry(
                "Skeletonization produced no linear feature".into(),
            ));
        }

        if thin < 0.0 {
            Ok(MultiLineString::new(vec![graph.longest_path()]))
        } else {
            graph.prune_dangles(thin);
            Ok(merge_parts(&graph.alive_lines()))
        }
    }
}

impl VoronoiSkeletonizer {
    fn boundary_sites(&self, polygon: &MultiPolygon<f64>, smoothness: f64) -> Vec<Site> {
        let rings: Vec<&LineString<f64>> = polygon
            .0
            .iter()
            .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
            .collect();

        let perimeter: f64 = rings
            .iter()
            .flat_map(|r| r.lines())
            .map(|l| segment_length(&l))
            .sum();

        let mut spacing = smoothness;
        if spacing > 0.0 && perimeter / spacing > self.max_sites as f64 {
            spacing = perimeter / self.max_sites as f64;
            log::warn!(
                "Densification at {} would exceed {} sites, using spacing {:.6}",
                smoothness,
                self.max_sites,
                spacing
            );
        }

        let mut seen = HashSet::new();
        let mut sites = Vec::new();
        let mut push = |c: Coord<f64>| {
            if seen.insert(coord_key(&c)) {
                sites.push(Site { x: c.x, y: c.y });
            }
        };

        for ring in rings {
            for segment in ring.lines() {
                let steps = if spacing > 0.0 {
                    (segment_length(&segment) / spacing).ceil().max(1.0) as usize
                } else {
                    1
                };
                for k in 0..steps {
                    let t = k as f64 / steps as f64;
                    push(segment.start + segment.delta() * t);
                }
            }
        }

        sites
    }
}

fn segment_length(line: &Line<f64>) -> f64 {
    let d = line.delta();
    d.x.hypot(d.y)
}

// ============================================================================
// Skeleton Graph
// ============================================================================

struct Edge {
    a: usize,
    b: usize,
    length: f64,
    alive: bool,
}

impl Edge {
    fn other(&self, node: usize) -> usize {
        if self.a == node { self.b } else { self.a }
    }
}

#[derive(Default)]
struct SkeletonGraph {
    nodes: Vec<Coord<f64>>,
    index: HashMap<(i64, i64), usize>,
    edges: Vec<Edge>,
    incident: Vec<Vec<usize>>,
}

#[derive(Copy, Clone, PartialEq)]
struct State {
    cost: f64,
    node: usize,
}

impl Eq for State {}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on cost
        other.cost.total_cmp(&self.cost)
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl SkeletonGraph {
    fn node(&mut self, c: Coord<f64>) -> usize {
        let key = coord_key(&c);
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(c);
        self.incident.push(Vec::new());
        self.index.insert(key, idx);
        idx
    }

    fn add_edge(&mut self, a: Coord<f64>, b: Coord<f64>) {
        let (ia, ib) = (self.node(a), self.node(b));
        let id = self.edges.len();
        self.edges.push(Edge {
            a: ia,
            b: ib,
            length: (a.x - b.x).hypot(a.y - b.y),
            alive: true,
        });
        self.incident[ia].push(id);
        self.incident[ib].push(id);
    }

    fn degree(&self, node: usize) -> usize {
        self.incident[node]
            .iter()
            .filter(|&&e| self.edges[e].alive)
            .count()
    }

    /// Shortest distances from `source`, with the edge used to reach each node.
    fn dijkstra(&self, source: usize) -> (Vec<f64>, Vec<Option<usize>>) {
        let mut dist = vec![f64::INFINITY; self.nodes.len()];
        let mut via = vec![None; self.nodes.len()];
        let mut heap = BinaryHeap::new();

        dist[source] = 0.0;
        heap.push(State {
            cost: 0.0,
            node: source,
        });

        while let Some(State { cost, node }) = heap.pop() {
            if cost > dist[node] {
                continue;
            }
            for &e in &self.incident[node] {
                let edge = &self.edges[e];
                let next = edge.other(node);
                let candidate = cost + edge.length;
                if candidate < dist[next] {
                    dist[next] = candidate;
                    via[next] = Some(e);
                    heap.push(State {
                        cost: candidate,
                        node: next,
                    });
                }
            }
        }

        (dist, via)
    }

    fn farthest(dist: &[f64]) -> Option<(usize, f64)> {
        dist.iter()
            .copied()
            .enumerate()
            .filter(|(_, d)| d.is_finite())
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Longest shortest path, by double sweep in every connected component.
    fn longest_path(&self) -> LineString<f64> {
        let mut visited = vec![false; self.nodes.len()];
        let mut best: Option<(f64, usize, Vec<Option<usize>>, usize)> = None;

        for seed in 0..self.nodes.len() {
            if visited[seed] || self.incident[seed].is_empty() {
                continue;
            }

            let (dist, _) = self.dijkstra(seed);
            for (n, d) in dist.iter().enumerate() {
                if d.is_finite() {
                    visited[n] = true;
                }
            }

            let Some((start, _)) = Self::farthest(&dist) else {
                continue;
            };
            let (dist, via) = self.dijkstra(start);
            let Some((end, length)) = Self::farthest(&dist) else {
                continue;
            };

            if best.as_ref().is_none_or(|(l, ..)| length > *l) {
                best = Some((length, start, via, end));
            }
        }

        let Some((_, start, via, end)) = best else {
            return LineString::new(Vec::new());
        };

        let mut coords = vec![self.nodes[end]];
        let mut node = end;
        while node != start {
            let Some(e) = via[node] else {
                break;
            };
            node = self.edges[e].other(node);
            coords.push(self.nodes[node]);
        }
        coords.reverse();

        LineString::new(coords)
    }

    /// Repeatedly drop dangling branches shorter than `max_length`.
    fn prune_dangles(&mut self, max_length: f64) {
        loop {
            let mut pruned = 0;

            for leaf in 0..self.nodes.len() {
                if self.degree(leaf) != 1 {
                    continue;
                }

                let mut chain = Vec::new();
                let mut length = 0.0;
                let mut node = leaf;
                let mut came_from: Option<usize> = None;

                loop {
                    let next_edge = self.incident[node]
                        .iter()
                        .copied()
                        .find(|&e| self.edges[e].alive && Some(e) != came_from);
                    let Some(e) = next_edge else {
                        break;
                    };
                    chain.push(e);
                    length += self.edges[e].length;
                    node = self.edges[e].other(node);
                    came_from = Some(e);
                    if self.degree(node) != 2 {
                        break;
                    }
                }

                // A whole isolated path is not a dangle
                if self.degree(node) <= 1 || length >= max_length {
                    continue;
                }

                for e in chain {
                    self.edges[e].alive = false;
                }
                pruned += 1;
            }

            if pruned == 0 {
                break;
            }
            log::debug!("Pruned {} dangles shorter than {}", pruned, max_length);
        }
    }

    fn alive_lines(&self) -> Vec<LineString<f64>> {
        self.edges
            .iter()
            .filter(|e| e.alive)
            .map(|e| LineString::new(vec![self.nodes[e.a], self.nodes[e.b]]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Polygon, polygon};

    fn channel() -> MultiPolygon<f64> {
        // A straight 10 x 1 channel
        MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 1.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ]])
    }

    #[test]
    fn test_centre_line_of_channel() {
        let skeleton = VoronoiSkeletonizer::default()
            .skeletonize(&channel(), 0.1, -1.0)
            .unwrap();

        assert_eq!(skeleton.0.len(), 1);
        let line = &skeleton.0[0];
        assert!(line.0.len() >= 2);

        // Interior vertices of the centre line run along y = 0.5
        let inner: Vec<_> = line
            .0
            .iter()
            .filter(|c| c.x > 1.0 && c.x < 9.0)
            .collect();
        assert!(!inner.is_empty());
        for c in inner {
            assert!((c.y - 0.5).abs() < 0.05, "vertex off centre: {:?}", c);
        }

        // The centre line spans most of the channel
        let xs: Vec<f64> = line.0.iter().map(|c| c.x).collect();
        let span = xs.iter().cloned().fold(f64::MIN, f64::max)
            - xs.iter().cloned().fold(f64::MAX, f64::min);
        assert!(span > 8.0);
    }

    #[test]
    fn test_pruned_skeleton_is_single_feature() {
        let skeleton = VoronoiSkeletonizer::default()
            .skeletonize(&channel(), 0.1, 0.0)
            .unwrap();
        assert!(!skeleton.0.is_empty());
    }

    #[test]
    fn test_site_cap_widens_spacing() {
        let skeletonizer = VoronoiSkeletonizer { max_sites: 100 };
        let sites = skeletonizer.boundary_sites(&channel(), 0.001);
        assert!(sites.len() <= 110, "got {} sites", sites.len());
    }

    #[test]
    fn test_empty_polygon_is_rejected() {
        let empty = MultiPolygon::<f64>::new(vec![Polygon::new(LineString::new(vec![]), vec![])]);
        assert!(VoronoiSkeletonizer::default().skeletonize(&empty, 0.1, -1.0).is_err());
    }

    #[test]
    fn test_longest_path_picks_trunk() {
        // A T: trunk of length 10 with a branch of length 1
        let mut graph = SkeletonGraph::default();
        graph.add_edge(Coord { x: 0.0, y: 0.0 }, Coord { x: 5.0, y: 0.0 });
        graph.add_edge(Coord { x: 5.0, y: 0.0 }, Coord { x: 10.0, y: 0.0 });
        graph.add_edge(Coord { x: 5.0, y: 0.0 }, Coord { x: 5.0, y: 1.0 });

        let path = graph.longest_path();
        assert_eq!(path.0.len(), 3);
        let ends = [path.0[0].x, path.0[2].x];
        assert!(ends.contains(&0.0) && ends.contains(&10.0));
    }

    #[test]
    fn test_prune_dangles() {
        let mut graph = SkeletonGraph::default();
        graph.add_edge(Coord { x: 0.0, y: 0.0 }, Coord { x: 5.0, y: 0.0 });
        graph.add_edge(Coord { x: 5.0, y: 0.0 }, Coord { x: 10.0, y: 0.0 });
        graph.add_edge(Coord { x: 5.0, y: 0.0 }, Coord { x: 5.0, y: 1.0 });

        graph.prune_dangles(2.0);
        let lines = merge_parts(&graph.alive_lines());

        assert_eq!(lines.0.len(), 1);
        assert_eq!(lines.0[0].0.len(), 3);
    }
}
