//! Sewer routing graph with spatial indices over streets and terrain

use geo::{Closest, ClosestPoint, Euclidean, Line, Point, line_measures::Distance};
use log::trace;
use petgraph::{graph::UnGraph, visit::EdgeRef};
use rstar::{RTree, primitives::GeomWithData};

use super::components::{EdgeKind, NodeKind, SewerEdge, SewerNode};
use crate::{Error, NodeId, SNAP_TOLERANCE, config::RoutingFactors, model::TerrainIndex};

/// Street segment stored in the R-tree together with its end nodes
pub type IndexedSegment = GeomWithData<Line<f64>, (NodeId, NodeId)>;

/// Closest point of the street network to a query location
#[derive(Debug, Clone, Copy)]
pub struct StreetSnap {
    pub from: NodeId,
    pub to: NodeId,
    pub point: Point<f64>,
    pub distance: f64,
}

/// Weighted graph over street vertices, terrain samples, inlets and
/// buildings away from the street network.
#[derive(Debug, Clone)]
pub struct SewerGraph {
    pub graph: UnGraph<SewerNode, SewerEdge>,
    pub(crate) street_index: RTree<IndexedSegment>,
    pub(crate) terrain: TerrainIndex,
    pub(crate) routing: RoutingFactors,
    pub(crate) mesh_radius: f64,
}

impl SewerGraph {
    pub(crate) fn new(
        graph: UnGraph<SewerNode, SewerEdge>,
        street_index: RTree<IndexedSegment>,
        terrain: TerrainIndex,
        routing: RoutingFactors,
        mesh_radius: f64,
    ) -> Self {
        Self {
            graph,
            street_index,
            terrain,
            routing,
            mesh_radius,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, node: NodeId) -> Option<&SewerNode> {
        self.graph.node_weight(node)
    }

    /// # Panics
    ///
    /// If `node` is not part of the graph
    pub fn position(&self, node: NodeId) -> Point<f64> {
        self.graph[node].geometry
    }

    /// # Panics
    ///
    /// If `node` is not part of the graph
    pub fn elevation(&self, node: NodeId) -> f64 {
        self.graph[node].elevation
    }

    pub fn routing(&self) -> &RoutingFactors {
        &self.routing
    }

    /// Link radius of the terrain mesh [m]
    pub fn mesh_radius(&self) -> f64 {
        self.mesh_radius
    }

    pub fn terrain(&self) -> &TerrainIndex {
        &self.terrain
    }

    /// Neighbours of `node` with the connecting edge
    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = (NodeId, &SewerEdge)> + '_ {
        self.graph.edges(node).map(move |edge| {
            let other = if edge.source() == node {
                edge.target()
            } else {
                edge.source()
            };
            (other, edge.weight())
        })
    }

    /// Cheapest edge between two nodes
    pub fn edge_between(&self, a: NodeId, b: NodeId) -> Option<&SewerEdge> {
        self.graph
            .edges_connecting(a, b)
            .map(|edge| edge.weight())
            .min_by(|x, y| x.weight.total_cmp(&y.weight))
    }

    /// Number of nodes of the given kind
    pub fn count_kind(&self, kind: NodeKind) -> usize {
        self.graph
            .node_weights()
            .filter(|node| node.kind == kind)
            .count()
    }

    /// Projects `point` on the closest street segment
    pub fn nearest_street(&self, point: &Point<f64>) -> Option<StreetSnap> {
        let entry = self.street_index.nearest_neighbor(point)?;
        let (from, to) = entry.data;
        let line = entry.geom();
        let snapped = match line.closest_point(point) {
            Closest::Intersection(p) | Closest::SinglePoint(p) => p,
            Closest::Indeterminate => line.start_point(),
        };

        Some(StreetSnap {
            from,
            to,
            point: snapped,
            distance: Euclidean.distance(&snapped, point),
        })
    }

    /// Ground elevation at `point` taken from the closest terrain sample
    pub fn elevation_at(&self, point: &Point<f64>) -> Option<f64> {
        self.terrain.elevation_at(point)
    }

    pub(crate) fn segment(&self, a: NodeId, b: NodeId) -> IndexedSegment {
        let line = Line::new(self.position(a), self.position(b));
        IndexedSegment::new(line, (a, b))
    }

    pub(crate) fn add_edge(&mut self, a: NodeId, b: NodeId, kind: EdgeKind) -> Option<f64> {
        let length = Euclidean.distance(&self.position(a), &self.position(b));
        if length < SNAP_TOLERANCE {
            return None;
        }
        let factor = match kind {
            EdgeKind::Street => self.routing.f_street,
            EdgeKind::Terrain => self.routing.f_topo,
        };
        let delta = self.elevation(b) - self.elevation(a);
        let edge = SewerEdge::new(kind, length, factor, delta);
        self.graph.add_edge(a, b, edge);
        Some(length)
    }

    /// Connects `node` to every terrain sample within the mesh radius.
    /// Returns the number of links added.
    pub(crate) fn link_to_terrain(&mut self, node: NodeId) -> usize {
        if self.mesh_radius <= 0.0 {
            return 0;
        }
        let neighbours = self.terrain.within(self.position(node), self.mesh_radius);

        let mut linked = 0;
        for (terrain_node, _) in neighbours {
            if terrain_node == node || self.graph.find_edge(node, terrain_node).is_some() {
                continue;
            }
            if self.add_edge(node, terrain_node, EdgeKind::Terrain).is_some() {
                linked += 1;
            }
        }
        linked
    }

    /// Returns the inlet node for a street projection, reusing an end vertex
    /// when the projection falls onto it and splitting the segment otherwise.
    pub(crate) fn inlet_at(&mut self, snap: &StreetSnap) -> Result<NodeId, Error> {
        for vertex in [snap.from, snap.to] {
            if Euclidean.distance(&self.position(vertex), &snap.point) <= SNAP_TOLERANCE {
                self.mark_inlet(vertex);
                return Ok(vertex);
            }
        }
        self.split_edge(snap.from, snap.to, snap.point)
    }

    fn mark_inlet(&mut self, node: NodeId) {
        let weight = &mut self.graph[node];
        if weight.kind == NodeKind::StreetVertex {
            weight.kind = NodeKind::Inlet;
        }
    }

    /// Splits the street edge `a - b` at `point` into two edges meeting at a
    /// new inlet. The routing weight is divided proportionally to length.
    pub(crate) fn split_edge(
        &mut self,
        a: NodeId,
        b: NodeId,
        point: Point<f64>,
    ) -> Result<NodeId, Error> {
        let edge = self.graph.find_edge(a, b).ok_or(Error::InvalidNodeIndex)?;
        let original = self
            .graph
            .remove_edge(edge)
            .ok_or(Error::InvalidNodeIndex)?;
        let (forward, backward) = (self.segment(a, b), self.segment(b, a));
        let removed = self.street_index.remove(&forward).is_some()
            || self.street_index.remove(&backward).is_some();
        if !removed {
            trace!("Street segment {a:?}-{b:?} was not indexed");
        }

        let (position_a, position_b) = (self.position(a), self.position(b));
        let length_a = Euclidean.distance(&position_a, &point);
        let length_b = Euclidean.distance(&point, &position_b);
        let share = length_a / (length_a + length_b);

        let (elevation_a, elevation_b) = (self.elevation(a), self.elevation(b));
        let elevation = elevation_a + (elevation_b - elevation_a) * share;

        let node = self
            .graph
            .add_node(SewerNode::new(point, elevation, NodeKind::Inlet));
        let weight_per_metre = original.weight / original.length;
        self.graph.add_edge(
            a,
            node,
            SewerEdge::with_weight(
                original.kind,
                length_a,
                length_a * weight_per_metre,
                elevation - elevation_a,
            ),
        );
        self.graph.add_edge(
            node,
            b,
            SewerEdge::with_weight(
                original.kind,
                length_b,
                length_b * weight_per_metre,
                elevation_b - elevation,
            ),
        );
        let first = self.segment(a, node);
        let second = self.segment(node, b);
        self.street_index.insert(first);
        self.street_index.insert(second);
        self.link_to_terrain(node);

        Ok(node)
    }
}
