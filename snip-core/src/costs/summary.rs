use serde::Serialize;

use super::{AnnualCost, CostModel};
use crate::{
    NodeId,
    config::SnipConfig,
    model::{AggregatedPoint, Forest, NetworkTree},
};

/// Yearly costs of one tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TreeCost {
    pub plant: NodeId,
    pub pipes: AnnualCost,
    pub pumps: AnnualCost,
    pub treatment: AnnualCost,
    pub private_sewers: AnnualCost,
}

impl TreeCost {
    pub fn total_without_private(&self) -> f64 {
        (self.pipes + self.pumps + self.treatment).total()
    }
}

/// Yearly costs of a whole forest, per tree and per asset class
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CostSummary {
    pub trees: Vec<TreeCost>,
    pub public_pipes: AnnualCost,
    pub pumps: AnnualCost,
    pub plants: AnnualCost,
    pub private_sewers: AnnualCost,
}

impl CostSummary {
    /// Prices every pipe, pump, plant and private lateral of `forest`
    ///
    /// Depends only on the forest, the points and the parameters, never on
    /// the order the forest was assembled in.
    pub fn evaluate(forest: &Forest, points: &[AggregatedPoint], config: &SnipConfig) -> Self {
        let model = CostModel::new(config);
        let trees: Vec<TreeCost> = forest
            .trees
            .iter()
            .map(|tree| tree_cost(&model, tree, points))
            .collect();

        Self {
            public_pipes: trees.iter().map(|tree| tree.pipes).sum(),
            pumps: trees.iter().map(|tree| tree.pumps).sum(),
            plants: trees.iter().map(|tree| tree.treatment).sum(),
            private_sewers: trees.iter().map(|tree| tree.private_sewers).sum(),
            trees,
        }
    }

    pub fn total_without_private(&self) -> f64 {
        (self.public_pipes + self.pumps + self.plants).total()
    }

    pub fn total_with_private(&self) -> f64 {
        self.total_without_private() + self.private_sewers.total()
    }
}

fn tree_cost(model: &CostModel<'_>, tree: &NetworkTree, points: &[AggregatedPoint]) -> TreeCost {
    let pipes = tree
        .pipes
        .iter()
        .map(|pipe| model.pipe(pipe.length, pipe.flow, pipe.mean_depth(), pipe.slope))
        .sum();
    let pumps = tree
        .pumps
        .iter()
        .map(|pump| model.pump(pump.lift_height, pump.flow))
        .sum();
    let private_sewers = points
        .iter()
        .filter(|point| tree.inlets.binary_search(&point.inlet).is_ok())
        .flat_map(|point| point.laterals.iter())
        .map(|lateral| model.private_sewer(lateral.length))
        .sum();

    TreeCost {
        plant: tree.plant.node,
        pipes,
        pumps,
        treatment: model.plant(tree.plant.flow),
        private_sewers,
    }
}
