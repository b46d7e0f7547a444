// Re-export key components
pub use crate::algo::{
    CostTotals, NetworkStatistics, SeedSelection, assemble_network, density_seed, select_seed,
};
pub use crate::config::{AlgorithmParameters, CostParameters, SewerParameters, SnipConfig};
pub use crate::costs::{AnnualCost, CostModel, CostSummary, TreeCost};
pub use crate::loading::{aggregate, build_graph};
pub use crate::model::{
    AggregatedPoint, Building, EdgeKind, Forest, NetworkNode, NetworkRole, NetworkTree, NodeKind,
    PlantOrigin, Pump, SewerGraph, SewerPipe, StreetSegment, TerrainSample, TreatmentPlant,
};
pub use crate::routing::{PathError, SearchBounds, SolvedPath};

// Core types
pub use crate::Error;
pub use crate::NodeId;
pub use crate::Population;
