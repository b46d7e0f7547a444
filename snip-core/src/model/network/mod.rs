//! Routing graph over streets and terrain

pub mod components;
pub mod graph;

pub use components::{EdgeKind, NodeKind, SewerEdge, SewerNode};
pub use graph::{IndexedSegment, SewerGraph, StreetSnap};
