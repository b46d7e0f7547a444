//! Sewer graph components - nodes and edges

use geo::Point;

/// Origin of a graph node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Vertex of the street layer
    StreetVertex,
    /// Terrain sample of the elevation layer
    Terrain,
    /// Building too far from any street to be aggregated
    Building,
    /// Street vertex or split point receiving building laterals
    Inlet,
}

/// Sewer graph node
#[derive(Debug, Clone)]
pub struct SewerNode {
    pub geometry: Point<f64>,
    /// Ground elevation [m]
    pub elevation: f64,
    pub kind: NodeKind,
}

impl SewerNode {
    pub fn new(geometry: Point<f64>, elevation: f64, kind: NodeKind) -> Self {
        Self {
            geometry,
            elevation,
            kind,
        }
    }
}

/// Layer an edge was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Street,
    Terrain,
}

/// Undirected sewer graph edge
#[derive(Debug, Clone)]
pub struct SewerEdge {
    /// Geometric length [m]
    pub length: f64,
    /// Routing weight, `length` times the layer penalty
    pub weight: f64,
    pub kind: EdgeKind,
    /// Absolute elevation difference over length [-]
    pub gradient: f64,
}

impl SewerEdge {
    pub(crate) fn new(kind: EdgeKind, length: f64, factor: f64, elevation_delta: f64) -> Self {
        Self::with_weight(kind, length, length * factor, elevation_delta)
    }

    pub(crate) fn with_weight(
        kind: EdgeKind,
        length: f64,
        weight: f64,
        elevation_delta: f64,
    ) -> Self {
        Self {
            length,
            weight,
            kind,
            gradient: elevation_delta.abs() / length,
        }
    }

    /// Penalty factor applied on top of the geometric length
    pub fn factor(&self) -> f64 {
        self.weight / self.length
    }
}
