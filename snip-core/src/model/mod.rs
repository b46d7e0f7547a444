//! Data model of the sewer planner
//!
//! Contains the routing graph built from street and terrain layers, the
//! input records it is built from and the forest produced by the assembly.

pub mod forest;
pub mod inputs;
pub mod network;
pub mod points;
pub mod terrain;

pub use forest::{
    Forest, NetworkNode, NetworkRole, NetworkTree, PlantOrigin, Pump, SewerPipe, TreatmentPlant,
};
pub use inputs::{Building, StreetSegment, TerrainSample};
pub use network::{EdgeKind, NodeKind, SewerEdge, SewerGraph, SewerNode, StreetSnap};
pub use points::{AggregatedPoint, Lateral};
pub use terrain::TerrainIndex;
