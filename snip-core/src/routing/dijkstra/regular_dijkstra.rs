use std::collections::BinaryHeap;

use geo::{Euclidean, line_measures::Distance};
use hashbrown::{HashMap, hash_map::Entry};

use super::{SearchBounds, SolvedPath, state::State};
use crate::{NodeId, model::SewerGraph};

#[derive(Debug, Clone, Copy)]
struct Label {
    cost: f64,
    gain: f64,
    predecessor: Option<NodeId>,
    /// Source the label was grown from
    origin: NodeId,
}

impl Label {
    fn state(&self, node: NodeId) -> State {
        State {
            cost: self.cost,
            gain: self.gain,
            node,
        }
    }
}

/// Settled labels of a multi-source search
#[derive(Debug, Clone, Default)]
pub struct ShortestPaths {
    labels: HashMap<NodeId, Label>,
}

impl ShortestPaths {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn reached(&self, node: NodeId) -> bool {
        self.labels.contains_key(&node)
    }

    /// Routing weight from the closest source
    pub fn cost(&self, node: NodeId) -> Option<f64> {
        self.labels.get(&node).map(|label| label.cost)
    }

    /// Source the cheapest path to `node` starts from
    pub fn origin(&self, node: NodeId) -> Option<NodeId> {
        self.labels.get(&node).map(|label| label.origin)
    }

    /// Path from `node` back to its source, `node` first
    pub fn path_from(&self, node: NodeId) -> Option<SolvedPath> {
        let label = self.labels.get(&node)?;
        let mut nodes = vec![node];
        let mut current = label.predecessor;
        while let Some(previous) = current {
            nodes.push(previous);
            current = self.labels.get(&previous)?.predecessor;
        }
        Some(SolvedPath {
            nodes,
            cost: label.cost,
            elevation_gain: label.gain,
        })
    }

    /// Reached nodes with their cost, in node order
    pub fn costs(&self) -> Vec<(NodeId, f64)> {
        let mut costs: Vec<(NodeId, f64)> = self
            .labels
            .iter()
            .map(|(node, label)| (*node, label.cost))
            .collect();
        costs.sort_unstable_by_key(|(node, _)| *node);
        costs
    }
}

/// Dijkstra's algorithm from several sources at once
///
/// Every node is labelled with its cheapest path to any source, ties broken
/// by smaller elevation gain. With a radius, nodes farther than the radius
/// from the source of their label are never expanded. Bounds restricted to
/// streets never relax a terrain mesh edge.
pub fn cost_to_all(graph: &SewerGraph, sources: &[NodeId], bounds: SearchBounds) -> ShortestPaths {
    let estimated_nodes = graph.node_count().min(4096);
    let mut labels: HashMap<NodeId, Label> = HashMap::with_capacity(estimated_nodes);
    let mut heap = BinaryHeap::with_capacity(estimated_nodes / 4);

    for &source in sources {
        if graph.node(source).is_none() || labels.contains_key(&source) {
            continue;
        }
        let label = Label {
            cost: 0.0,
            gain: 0.0,
            predecessor: None,
            origin: source,
        };
        labels.insert(source, label);
        heap.push(label.state(source));
    }

    while let Some(state) = heap.pop() {
        let Some(label) = labels.get(&state.node).copied() else {
            continue;
        };
        // Skip if we've found a better path
        if label.state(state.node) != state {
            continue;
        }

        let origin = graph.position(label.origin);
        for (next, edge) in graph.neighbors(state.node) {
            if !bounds.allows(edge) {
                continue;
            }
            if bounds
                .radius
                .is_some_and(|radius| Euclidean.distance(&origin, &graph.position(next)) > radius)
            {
                continue;
            }
            let climb = (graph.elevation(next) - graph.elevation(state.node)).max(0.0);
            let candidate = State {
                cost: state.cost + edge.weight,
                gain: state.gain + climb,
                node: next,
            };
            if bounds.max_cost.is_some_and(|max| candidate.cost > max) {
                continue;
            }
            let next_label = Label {
                cost: candidate.cost,
                gain: candidate.gain,
                predecessor: Some(state.node),
                origin: label.origin,
            };

            match labels.entry(next) {
                Entry::Vacant(entry) => {
                    entry.insert(next_label);
                    heap.push(candidate);
                }
                Entry::Occupied(mut entry) => {
                    if candidate.improves(&entry.get().state(next)) {
                        *entry.get_mut() = next_label;
                        heap.push(candidate);
                    }
                }
            }
        }
    }

    ShortestPaths { labels }
}

#[cfg(test)]
mod tests {
    use geo::line_string;
    use rstest::rstest;

    use super::*;
    use crate::{
        build_graph,
        config::RoutingFactors,
        model::{EdgeKind, NodeKind, StreetSegment, TerrainSample},
    };

    /// Square block where the northern detour climbs over a hill
    fn block() -> SewerGraph {
        let streets = vec![
            StreetSegment::new("south", line_string![(x: 0.0, y: 0.0), (x: 100.0, y: 0.0)]),
            StreetSegment::new(
                "north",
                line_string![(x: 0.0, y: 0.0), (x: 0.0, y: 50.0), (x: 100.0, y: 50.0), (x: 100.0, y: 0.0)],
            ),
        ];
        let terrain = vec![
            TerrainSample::new(0.0, 0.0, 10.0),
            TerrainSample::new(100.0, 0.0, 10.0),
            TerrainSample::new(0.0, 50.0, 20.0),
            TerrainSample::new(100.0, 50.0, 20.0),
        ];
        let factors = RoutingFactors {
            f_street: 1.0,
            f_topo: 3.0,
            mesh_radius: Some(1.0),
        };
        build_graph(&streets, &terrain, &factors).unwrap()
    }

    fn vertex_at(graph: &SewerGraph, x: f64, y: f64) -> NodeId {
        graph
            .graph
            .node_indices()
            .find(|node| {
                let node_weight = &graph.graph[*node];
                node_weight.kind == NodeKind::StreetVertex
                    && (node_weight.geometry.x() - x).abs() < 1e-9
                    && (node_weight.geometry.y() - y).abs() < 1e-9
            })
            .unwrap()
    }

    #[test]
    fn takes_the_direct_street() {
        let graph = block();
        let source = vertex_at(&graph, 0.0, 0.0);
        let target = vertex_at(&graph, 100.0, 0.0);

        let paths = cost_to_all(&graph, &[source], SearchBounds::default());
        let path = paths.path_from(target).unwrap();

        assert!((path.cost - 100.0).abs() < 1e-9);
        assert_eq!(path.nodes, vec![target, source]);
        assert!(path.elevation_gain.abs() < 1e-9);
    }

    #[test]
    fn nearest_source_wins() {
        let graph = block();
        let west = vertex_at(&graph, 0.0, 0.0);
        let east = vertex_at(&graph, 100.0, 0.0);
        let north_east = vertex_at(&graph, 100.0, 50.0);

        let paths = cost_to_all(&graph, &[west, east], SearchBounds::default());
        assert_eq!(paths.origin(north_east), Some(east));
        assert_eq!(paths.cost(west), Some(0.0));
    }

    #[test]
    fn radius_limits_expansion() {
        let graph = block();
        let source = vertex_at(&graph, 0.0, 0.0);

        let paths = cost_to_all(&graph, &[source], SearchBounds::within(60.0));
        assert!(paths.reached(vertex_at(&graph, 0.0, 50.0)));
        assert!(!paths.reached(vertex_at(&graph, 100.0, 0.0)));
    }

    #[test]
    fn max_cost_limits_labels() {
        let graph = block();
        let source = vertex_at(&graph, 0.0, 0.0);
        let bounds = SearchBounds {
            max_cost: Some(75.0),
            ..SearchBounds::default()
        };

        let paths = cost_to_all(&graph, &[source], bounds);
        assert!(paths.costs().iter().all(|(_, cost)| *cost <= 75.0));
        assert!(!paths.reached(vertex_at(&graph, 100.0, 0.0)));
    }

    /// Two parallel streets 20 m apart over a flat 10 m terrain grid
    fn parallel_streets() -> SewerGraph {
        let streets = vec![
            StreetSegment::new("south", line_string![(x: 0.0, y: 0.0), (x: 100.0, y: 0.0)]),
            StreetSegment::new("north", line_string![(x: 0.0, y: 20.0), (x: 100.0, y: 20.0)]),
        ];
        let mut terrain = Vec::new();
        for row in 0..=2 {
            for col in 0..=10 {
                terrain.push(TerrainSample::new(
                    f64::from(col) * 10.0,
                    f64::from(row) * 10.0,
                    50.0,
                ));
            }
        }
        let factors = RoutingFactors {
            f_street: 5.0,
            f_topo: 1.2,
            mesh_radius: Some(15.0),
        };
        build_graph(&streets, &terrain, &factors).unwrap()
    }

    #[rstest]
    #[case::whole_mesh(false)]
    #[case::streets_only(true)]
    fn street_bounds_ignore_the_terrain_mesh(#[case] streets_only: bool) {
        let graph = parallel_streets();
        let source = vertex_at(&graph, 0.0, 0.0);
        let east = vertex_at(&graph, 100.0, 0.0);
        let north = vertex_at(&graph, 0.0, 20.0);
        let bounds = SearchBounds {
            streets_only,
            ..SearchBounds::default()
        };

        let paths = cost_to_all(&graph, &[source], bounds);
        let path = paths.path_from(east).unwrap();

        if streets_only {
            assert!((path.cost - 500.0).abs() < 1e-9);
            assert_eq!(path.nodes, vec![east, source]);
            assert_eq!(graph.edge_between(east, source).unwrap().kind, EdgeKind::Street);
            assert!(!paths.reached(north));
        } else {
            assert!(path.cost < 500.0);
            assert!(paths.reached(north));
        }
    }
}
