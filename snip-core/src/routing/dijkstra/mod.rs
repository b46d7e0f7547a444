mod state;

pub mod regular_dijkstra;
pub mod traced_dijkstra;

use thiserror::Error;

use crate::{
    NodeId,
    model::{EdgeKind, SewerEdge, SewerGraph},
};

pub use regular_dijkstra::{ShortestPaths, cost_to_all};
pub use traced_dijkstra::search_towards;

/// Limits applied to a search
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchBounds {
    /// Routing weight beyond which nodes are not settled
    pub max_cost: Option<f64>,
    /// Euclidean distance from the search origin beyond which nodes are not expanded [m]
    pub radius: Option<f64>,
    /// Ignore terrain mesh edges
    pub streets_only: bool,
}

impl SearchBounds {
    pub fn within(radius: f64) -> Self {
        Self {
            radius: Some(radius),
            ..Self::default()
        }
    }

    /// Same bounds restricted to street edges
    pub fn on_streets(self) -> Self {
        Self {
            streets_only: true,
            ..self
        }
    }

    pub(crate) fn allows(&self, edge: &SewerEdge) -> bool {
        !self.streets_only || edge.kind == EdgeKind::Street
    }
}

/// Node sequence found by a search with its accumulated weight and climb
#[derive(Debug, Clone, PartialEq)]
pub struct SolvedPath {
    pub nodes: Vec<NodeId>,
    pub cost: f64,
    /// Summed positive elevation differences along the path [m]
    pub elevation_gain: f64,
}

impl SolvedPath {
    /// Weighs an existing node sequence, `None` if two consecutive nodes are
    /// not adjacent
    pub fn from_nodes(graph: &SewerGraph, nodes: Vec<NodeId>) -> Option<Self> {
        let mut cost = 0.0;
        let mut elevation_gain = 0.0;
        for pair in nodes.windows(2) {
            let edge = graph.edge_between(pair[0], pair[1])?;
            cost += edge.weight;
            elevation_gain += (graph.elevation(pair[1]) - graph.elevation(pair[0])).max(0.0);
        }
        Some(Self {
            nodes,
            cost,
            elevation_gain,
        })
    }

    pub fn start(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    pub fn end(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathError {
    #[error("Node {from:?} cannot reach the network within {radius:?} m")]
    Unreachable { from: NodeId, radius: Option<f64> },
}
