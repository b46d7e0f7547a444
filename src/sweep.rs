//! Sensitivity sweeps over cost factors and merge factor
//!
//! Every case is an independent run with its own copy of the inputs, so the
//! cases are spread over the rayon thread pool.

use std::{
    io::Write,
    path::{Component, Path},
};

use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use snip_core::SnipConfig;

use crate::{
    Error,
    export::write_results,
    scenario::{ScenarioInputs, run_scenario},
};

/// Overrides applied on top of the base configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepCase {
    pub name: String,
    #[serde(default)]
    pub fc_sewer_cost: Option<f64>,
    #[serde(default)]
    pub fc_wwtp_opex: Option<f64>,
    #[serde(default)]
    pub fc_wwtp_capex: Option<f64>,
    #[serde(default)]
    pub pe_flow: Option<f64>,
    #[serde(default)]
    pub f_merge: Option<f64>,
}

impl SweepCase {
    pub fn apply(&self, base: &SnipConfig) -> SnipConfig {
        let mut config = base.clone();
        if let Some(value) = self.fc_sewer_cost {
            config.costs.fc_sewer_cost = value;
        }
        if let Some(value) = self.fc_wwtp_opex {
            config.costs.fc_wwtp_opex = value;
        }
        if let Some(value) = self.fc_wwtp_capex {
            config.costs.fc_wwtp_capex = value;
        }
        if let Some(value) = self.pe_flow {
            config.sewer.pe_flow = value;
        }
        if let Some(value) = self.f_merge {
            config.algorithm.f_merge = value;
        }
        config
    }
}

/// Key figures of one sweep case, one CSV row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepRow {
    pub name: String,
    pub plants: usize,
    pub pumps: usize,
    pub pipe_length: f64,
    pub degree_of_centralization: f64,
    pub total_without_private: f64,
    pub total_with_private: f64,
    pub cost_per_pe: f64,
}

/// Runs every case in parallel, results keep the order of `cases`.
///
/// With `output` set, each case writes its layers to `output/<name>`, and a
/// case whose name is not a single plain path component fails with
/// [`Error::CaseName`] without running.
pub fn run_sweep(
    inputs: &ScenarioInputs,
    base: &SnipConfig,
    cases: &[SweepCase],
    output: Option<&Path>,
) -> Vec<Result<SweepRow, Error>> {
    info!("Running {} sweep cases", cases.len());
    cases
        .par_iter()
        .map(|case| {
            if output.is_some() && !is_plain_name(&case.name) {
                warn!("Sweep case {:?} skipped, its name is not a directory name", case.name);
                return Err(Error::CaseName(case.name.clone()));
            }
            let config = case.apply(base);
            let result = run_scenario(inputs.clone(), &config).inspect_err(|e| {
                warn!("Sweep case {} failed: {e}", case.name);
            })?;
            if let Some(dir) = output {
                write_results(&dir.join(&case.name), &result, &config.sewer, false)?;
            }
            let stats = &result.statistics;
            Ok(SweepRow {
                name: case.name.clone(),
                plants: stats.plants,
                pumps: stats.pumps,
                pipe_length: stats.pipe_length,
                degree_of_centralization: stats.degree_of_centralization,
                total_without_private: stats.costs.total_without_private,
                total_with_private: stats.costs.total_with_private,
                cost_per_pe: stats.cost_per_pe,
            })
        })
        .collect()
}

/// `name` stays inside its parent directory when joined to it
fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(part)), None) if part == name
    )
}

pub fn write_sweep_csv(writer: impl Write, rows: &[SweepRow]) -> Result<(), Error> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
