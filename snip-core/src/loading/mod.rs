//! Graph construction and building aggregation

mod aggregation;
mod builder;

pub use aggregation::aggregate;
pub use builder::build_graph;
