//! SNIP, sewer network planning for rural settlements.
//!
//! This crate wraps [`snip_core`] with everything around the engine: reading
//! street, building and terrain layers, running a scenario end to end,
//! writing the planned network as GeoJSON layers and running sensitivity
//! sweeps in parallel.
//!
//! ```no_run
//! use std::path::Path;
//! use snip::{InputOptions, ScenarioInputs, SnipConfig, run_scenario, write_results};
//!
//! let config = SnipConfig::default();
//! let inputs = ScenarioInputs::from_files(
//!     Path::new("streets.geojson"),
//!     Path::new("terrain.csv"),
//!     Path::new("buildings.geojson"),
//!     &InputOptions::default(),
//! )?;
//! let result = run_scenario(inputs, &config)?;
//! write_results(Path::new("out"), &result, &config.sewer, true)?;
//! # Ok::<(), snip::Error>(())
//! ```

pub mod error;
pub mod export;
pub mod input;
pub mod scenario;
pub mod sweep;

pub use error::Error;
pub use export::write_results;
pub use input::InputOptions;
pub use scenario::{ScenarioInputs, ScenarioResult, run_scenario, run_with_deadline};
pub use snip_core::{self, SnipConfig};
pub use sweep::{SweepCase, SweepRow, run_sweep, write_sweep_csv};
