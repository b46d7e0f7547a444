//! One-call planning pipeline

use std::{path::Path, sync::mpsc, thread, time::Duration};

use log::info;
use snip_core::{
    algo::{NetworkStatistics, SeedSelection, density_seed},
    model::{AggregatedPoint, Building, Forest, SewerGraph, StreetSegment, TerrainSample},
    prelude::{CostSummary, SnipConfig},
};

use crate::{
    Error,
    input::{InputOptions, read_buildings, read_streets, read_terrain},
};

/// Input layers of one scenario, owned by the run
#[derive(Debug, Clone, Default)]
pub struct ScenarioInputs {
    pub streets: Vec<StreetSegment>,
    pub terrain: Vec<TerrainSample>,
    pub buildings: Vec<Building>,
}

impl ScenarioInputs {
    /// Loads streets and buildings from GeoJSON files and terrain from CSV
    pub fn from_files(
        streets: &Path,
        terrain: &Path,
        buildings: &Path,
        options: &InputOptions,
    ) -> Result<Self, Error> {
        Ok(Self {
            streets: read_streets(streets, options)?,
            terrain: read_terrain(terrain)?,
            buildings: read_buildings(buildings, options)?,
        })
    }
}

/// Everything a results sink needs from a finished run
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub graph: SewerGraph,
    pub buildings: Vec<Building>,
    pub points: Vec<AggregatedPoint>,
    pub seed: SeedSelection,
    pub forest: Forest,
    pub summary: CostSummary,
    pub statistics: NetworkStatistics,
}

/// Runs graph construction, aggregation, seed selection and assembly.
///
/// The configuration is validated before the first stage.
pub fn run_scenario(inputs: ScenarioInputs, config: &SnipConfig) -> Result<ScenarioResult, Error> {
    config.validate()?;
    let ScenarioInputs {
        streets,
        terrain,
        buildings,
    } = inputs;

    let graph = snip_core::build_graph(&streets, &terrain, &config.algorithm.routing_factors())?;
    let (points, graph) =
        snip_core::aggregate(&buildings, graph, config.algorithm.aggregation_threshold)?;
    let seed = density_seed(&points, config.algorithm.tile_size)?;
    info!(
        "Seed inlet {} in tile ({}, {}) with {} points",
        seed.node.index(),
        seed.cell.row,
        seed.cell.col,
        seed.cell.count
    );

    let (forest, summary) = snip_core::assemble_network(&graph, seed.node, &points, config)?;
    let statistics = NetworkStatistics::compute(&forest, &summary, &points, Some(&seed), config);
    info!(
        "Planned {} plants and {} pumps, {:.0} per equivalent population and year",
        statistics.plants, statistics.pumps, statistics.cost_per_pe
    );

    Ok(ScenarioResult {
        graph,
        buildings,
        points,
        seed,
        forest,
        summary,
        statistics,
    })
}

/// Runs a scenario on a worker thread and gives up after `deadline`.
///
/// The worker is detached on timeout and finishes in the background; its
/// result is dropped.
pub fn run_with_deadline(
    inputs: ScenarioInputs,
    config: &SnipConfig,
    deadline: Duration,
) -> Result<ScenarioResult, Error> {
    let (sender, receiver) = mpsc::channel();
    let config = config.clone();
    thread::spawn(move || {
        // the receiver is gone once the deadline passed
        let _ = sender.send(run_scenario(inputs, &config));
    });

    match receiver.recv_timeout(deadline) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(Error::Timeout(deadline)),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(Error::Io(std::io::Error::other(
            "scenario worker stopped without a result",
        ))),
    }
}
