//! Sewer forest produced by the network assembly

use geo::{Line, Point};
use serde::{Deserialize, Serialize};

use crate::{NodeId, Population};

/// Role of a node within a sewer tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkRole {
    StreetVertex,
    Terrain,
    Building,
    Inlet,
    Pump,
    TreatmentPlant,
}

/// Why a treatment plant was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlantOrigin {
    /// Root of the first tree, at the density seed
    Seed,
    /// Connecting the subtree was dearer than treating it locally
    Split,
    /// No path to any tree within the search radius
    Unreachable,
}

#[derive(Debug, Clone)]
pub struct NetworkNode {
    pub id: NodeId,
    pub geometry: Point<f64>,
    /// Ground elevation [m]
    pub elevation: f64,
    pub role: NetworkRole,
    /// Equivalent population passing through the node
    pub flow: Population,
    /// Depth of the pipe invert below ground where flow leaves the node [m]
    pub trench_depth: f64,
    /// Next node towards the plant, `None` for the plant itself
    pub parent: Option<NodeId>,
}

/// Public sewer pipe between two neighbouring tree nodes
#[derive(Debug, Clone)]
pub struct SewerPipe {
    pub upstream: NodeId,
    pub downstream: NodeId,
    /// [m]
    pub length: f64,
    /// Equivalent population conveyed
    pub flow: Population,
    /// Trench depth at the upstream end [m]
    pub upstream_depth: f64,
    /// Trench depth at the downstream end [m]
    pub downstream_depth: f64,
    /// Invert drop over length [-], negative for rising pressure mains
    pub slope: f64,
    /// Pressure main leaving a pump
    pub pressurized: bool,
    pub geometry: Line<f64>,
}

impl SewerPipe {
    pub fn mean_depth(&self) -> f64 {
        (self.upstream_depth + self.downstream_depth) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pump {
    pub node: NodeId,
    /// [m]
    pub lift_height: f64,
    pub flow: Population,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreatmentPlant {
    pub node: NodeId,
    /// Total connected equivalent population
    pub flow: Population,
    pub origin: PlantOrigin,
}

/// One sewer tree rooted at its treatment plant
#[derive(Debug, Clone)]
pub struct NetworkTree {
    pub plant: TreatmentPlant,
    /// Tree nodes ordered by id
    pub nodes: Vec<NetworkNode>,
    /// One pipe per non-root node, towards its parent
    pub pipes: Vec<SewerPipe>,
    pub pumps: Vec<Pump>,
    /// Inlets of aggregated points drained by this tree
    pub inlets: Vec<NodeId>,
}

impl NetworkTree {
    pub fn node(&self, id: NodeId) -> Option<&NetworkNode> {
        self.nodes
            .binary_search_by_key(&id, |node| node.id)
            .ok()
            .map(|idx| &self.nodes[idx])
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Pipe leaving `id` towards the plant
    pub fn pipe_from(&self, id: NodeId) -> Option<&SewerPipe> {
        self.pipes.iter().find(|pipe| pipe.upstream == id)
    }

    /// Node sequence from `id` down to the plant
    pub fn path_to_plant(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = self.node(id);
        while let Some(node) = current {
            path.push(node.id);
            if path.len() > self.nodes.len() {
                break;
            }
            current = node.parent.and_then(|parent| self.node(parent));
        }
        path
    }

    /// Summed length of all public pipes [m]
    pub fn pipe_length(&self) -> f64 {
        self.pipes.iter().map(|pipe| pipe.length).sum()
    }
}

/// Set of disjoint sewer trees covering every aggregated point
#[derive(Debug, Clone, Default)]
pub struct Forest {
    pub trees: Vec<NetworkTree>,
}

impl Forest {
    pub fn plant_count(&self) -> usize {
        self.trees.len()
    }

    pub fn pump_count(&self) -> usize {
        self.trees.iter().map(|tree| tree.pumps.len()).sum()
    }

    pub fn inlet_count(&self) -> usize {
        self.trees.iter().map(|tree| tree.inlets.len()).sum()
    }

    pub fn plants(&self) -> impl Iterator<Item = &TreatmentPlant> {
        self.trees.iter().map(|tree| &tree.plant)
    }

    pub fn pipes(&self) -> impl Iterator<Item = &SewerPipe> {
        self.trees.iter().flat_map(|tree| tree.pipes.iter())
    }

    pub fn pumps(&self) -> impl Iterator<Item = &Pump> {
        self.trees.iter().flat_map(|tree| tree.pumps.iter())
    }

    /// Tree draining the given inlet
    pub fn tree_of(&self, inlet: NodeId) -> Option<&NetworkTree> {
        self.trees
            .iter()
            .find(|tree| tree.inlets.binary_search(&inlet).is_ok())
    }

    /// Equivalent population treated by all plants
    pub fn connected_population(&self) -> Population {
        self.plants().map(|plant| plant.flow).sum()
    }
}
