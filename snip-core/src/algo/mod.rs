pub mod assembly;
pub mod seed;
pub mod statistics;

pub use assembly::assemble_network;
pub use seed::{DensityCell, SeedSelection, density_seed, select_seed};
pub use statistics::{CostTotals, NetworkStatistics};
