//! Shortest path search over the sewer graph

pub mod dijkstra;

pub use dijkstra::{
    PathError, SearchBounds, ShortestPaths, SolvedPath, cost_to_all, search_towards,
};
