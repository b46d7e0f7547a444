//! Core engine of the SNIP sewer network planner.
//!
//! The pipeline runs in four stages that hand values to each other:
//! [`build_graph`] turns street segments and terrain samples into a routing
//! graph, [`aggregate`] snaps buildings onto sewer inlets, [`select_seed`]
//! picks the densest spot to start from and [`assemble_network`] grows the
//! sewer forest, deciding where pumps and treatment plants go.

pub mod algo;
pub mod config;
pub mod costs;
pub mod error;
pub mod loading;
pub mod model;
pub mod prelude;
pub mod routing;

pub use algo::{assemble_network, select_seed};
pub use config::SnipConfig;
pub use error::Error;
pub use loading::{aggregate, build_graph};

/// Index of a node in the sewer graph
pub type NodeId = petgraph::graph::NodeIndex;

/// Equivalent population, the flow unit used to size pipes and plants
pub type Population = f64;

/// Projected inlets closer than this to a street vertex reuse the vertex [m]
pub const SNAP_TOLERANCE: f64 = 0.01;
