//! Key figures of an assembled network

use serde::Serialize;

use super::seed::SeedSelection;
use crate::{
    Population,
    config::SnipConfig,
    costs::{CostModel, CostSummary},
    model::{AggregatedPoint, Forest},
};

/// Yearly cost totals per asset class
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostTotals {
    pub pumps: f64,
    pub plants: f64,
    pub public_pipes: f64,
    pub private_sewers: f64,
    pub total_without_private: f64,
    pub total_with_private: f64,
}

impl From<&CostSummary> for CostTotals {
    fn from(summary: &CostSummary) -> Self {
        Self {
            pumps: summary.pumps.total(),
            plants: summary.plants.total(),
            public_pipes: summary.public_pipes.total(),
            private_sewers: summary.private_sewers.total(),
            total_without_private: summary.total_without_private(),
            total_with_private: summary.total_with_private(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkStatistics {
    pub plants: usize,
    pub pumps: usize,
    pub inlets: usize,
    pub buildings: usize,
    /// Buildings connected away from the streets
    pub standalone_buildings: usize,
    pub connected_population: Population,
    /// Public pipe length [m]
    pub pipe_length: f64,
    /// Length of pressure mains leaving pumps [m]
    pub pressurized_length: f64,
    /// Length weighted mean trench depth of public pipes [m]
    pub average_trench_depth: f64,
    pub seed_node: Option<usize>,
    /// Aggregated points in the density tile of the seed
    pub seed_tile_points: Option<usize>,
    /// Share of the equivalent population treated by the largest plant
    pub degree_of_centralization: f64,
    /// Yearly cost per connected equivalent population, private sewers included
    pub cost_per_pe: f64,
    /// Reasonable capital cost per equivalent population spread over the sewer lifespan
    pub reasonable_cost_per_pe: f64,
    pub exceeds_reasonable_costs: bool,
    pub costs: CostTotals,
}

impl NetworkStatistics {
    pub fn compute(
        forest: &Forest,
        summary: &CostSummary,
        points: &[AggregatedPoint],
        seed: Option<&SeedSelection>,
        config: &SnipConfig,
    ) -> Self {
        let connected_population = forest.connected_population();
        let pipe_length: f64 = forest.pipes().map(|pipe| pipe.length).sum();
        let pressurized_length = forest
            .pipes()
            .filter(|pipe| pipe.pressurized)
            .map(|pipe| pipe.length)
            .sum();
        let average_trench_depth = if pipe_length > 0.0 {
            forest
                .pipes()
                .map(|pipe| pipe.mean_depth() * pipe.length)
                .sum::<f64>()
                / pipe_length
        } else {
            0.0
        };

        let largest_plant = forest
            .plants()
            .map(|plant| plant.flow)
            .fold(0.0, f64::max);
        let degree_of_centralization = ratio(largest_plant, connected_population);

        let costs = CostTotals::from(summary);
        let cost_per_pe = ratio(costs.total_with_private, connected_population);
        let reasonable_cost_per_pe = CostModel::new(config).reasonable_annual_cost_per_pe();

        Self {
            plants: forest.plant_count(),
            pumps: forest.pump_count(),
            inlets: forest.inlet_count(),
            buildings: points.iter().map(AggregatedPoint::building_count).sum(),
            standalone_buildings: points.iter().filter(|point| point.standalone).count(),
            connected_population,
            pipe_length,
            pressurized_length,
            average_trench_depth,
            seed_node: seed.map(|seed| seed.node.index()),
            seed_tile_points: seed.map(|seed| seed.cell.count),
            degree_of_centralization,
            cost_per_pe,
            reasonable_cost_per_pe,
            exceeds_reasonable_costs: cost_per_pe > reasonable_cost_per_pe,
            costs,
        }
    }
}

fn ratio(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole } else { 0.0 }
}
