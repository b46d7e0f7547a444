use std::collections::BinaryHeap;

use geo::{Euclidean, line_measures::Distance};
use hashbrown::{HashMap, hash_map::Entry};

use super::{PathError, SearchBounds, SolvedPath, state::State};
use crate::{NodeId, model::SewerGraph};

/// Dijkstra's algorithm from `start` until the first node accepted by
/// `is_target` is settled. Returns the path `start -> target`.
///
/// The radius of `bounds` is measured around `start`.
///
/// # Errors
///
/// [`PathError::Unreachable`] if no target is settled within the bounds.
pub fn search_towards(
    graph: &SewerGraph,
    start: NodeId,
    is_target: impl Fn(NodeId) -> bool,
    bounds: SearchBounds,
) -> Result<SolvedPath, PathError> {
    let unreachable = PathError::Unreachable {
        from: start,
        radius: bounds.radius,
    };
    if graph.node(start).is_none() {
        return Err(unreachable);
    }

    let origin = graph.position(start);
    let mut best: HashMap<NodeId, State> = HashMap::new();
    let mut predecessors: HashMap<NodeId, NodeId> = HashMap::new();
    let mut heap = BinaryHeap::new();

    let initial = State {
        cost: 0.0,
        gain: 0.0,
        node: start,
    };
    best.insert(start, initial);
    heap.push(initial);

    while let Some(state) = heap.pop() {
        if best.get(&state.node).is_some_and(|known| *known != state) {
            continue;
        }
        if is_target(state.node) {
            return Ok(trace_back(&predecessors, start, state));
        }

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

            let improved = match best.entry(next) {
                Entry::Vacant(entry) => {
                    entry.insert(candidate);
                    true
                }
                Entry::Occupied(mut entry) => {
                    let better = candidate.improves(entry.get());
                    if better {
                        *entry.get_mut() = candidate;
                    }
                    better
                }
            };
            if improved {
                predecessors.insert(next, state.node);
                heap.push(candidate);
            }
        }
    }

    Err(unreachable)
}

fn trace_back(predecessors: &HashMap<NodeId, NodeId>, start: NodeId, end: State) -> SolvedPath {
    let mut nodes = vec![end.node];
    let mut current = end.node;
    while current != start {
        match predecessors.get(&current) {
            Some(&previous) => {
                nodes.push(previous);
                current = previous;
            }
            None => break,
        }
    }
    nodes.reverse();

    SolvedPath {
        nodes,
        cost: end.cost,
        elevation_gain: end.gain,
    }
}

#[cfg(test)]
mod tests {
    use geo::line_string;

    use super::*;
    use crate::{
        build_graph,
        config::RoutingFactors,
        model::{StreetSegment, TerrainSample},
    };

    /// Two parallel streets of equal length, the southern one flat and the
    /// northern one climbing
    fn twin_streets() -> (SewerGraph, NodeId, NodeId) {
        let streets = vec![
            StreetSegment::new(
                "north",
                line_string![(x: 0.0, y: 0.0), (x: 30.0, y: 40.0), (x: 60.0, y: 0.0)],
            ),
            StreetSegment::new(
                "south",
                line_string![(x: 0.0, y: 0.0), (x: 30.0, y: -40.0), (x: 60.0, y: 0.0)],
            ),
        ];
        let terrain = vec![
            TerrainSample::new(0.0, 0.0, 0.0),
            TerrainSample::new(60.0, 0.0, 0.0),
            TerrainSample::new(30.0, 40.0, 8.0),
            TerrainSample::new(30.0, -40.0, 0.0),
        ];
        let factors = RoutingFactors {
            f_street: 1.0,
            f_topo: 2.0,
            mesh_radius: Some(1.0),
        };
        let graph = build_graph(&streets, &terrain, &factors).unwrap();
        let start = graph.nearest_street(&geo::point!(x: 0.0, y: 0.0)).unwrap();
        let west = [start.from, start.to]
            .into_iter()
            .find(|node| graph.position(*node).x().abs() < 1e-9)
            .unwrap();
        let east = graph
            .graph
            .node_indices()
            .find(|node| (graph.position(*node).x() - 60.0).abs() < 1e-9 && graph.neighbors(*node).count() == 2)
            .unwrap();
        (graph, west, east)
    }

    #[test]
    fn prefers_the_flatter_of_equal_paths() {
        let (graph, west, east) = twin_streets();
        let path = search_towards(&graph, west, |node| node == east, SearchBounds::default())
            .unwrap();

        assert_eq!(path.start(), Some(west));
        assert_eq!(path.end(), Some(east));
        assert!((path.cost - 100.0).abs() < 1e-9);
        assert!(path.elevation_gain.abs() < 1e-9);
        assert!(path.nodes.iter().all(|node| graph.position(*node).y() <= 0.0));
    }

    #[test]
    fn start_can_be_its_own_target() {
        let (graph, west, _) = twin_streets();
        let path = search_towards(&graph, west, |node| node == west, SearchBounds::default())
            .unwrap();
        assert_eq!(path.nodes, vec![west]);
        assert!(path.cost.abs() < f64::EPSILON);
    }

    #[test]
    fn fails_outside_radius() {
        let (graph, west, east) = twin_streets();
        let err = search_towards(&graph, west, |node| node == east, SearchBounds::within(45.0))
            .unwrap_err();
        assert_eq!(
            err,
            PathError::Unreachable {
                from: west,
                radius: Some(45.0)
            }
        );
    }
}
