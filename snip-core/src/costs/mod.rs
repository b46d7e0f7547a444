//! Annuitized cost model
//!
//! Every cost is expressed per year: investments are spread over the asset
//! lifespan with [`annuity::annuity`], running costs are added as they are.

pub mod annuity;
pub mod hydraulics;
pub mod summary;

use std::{
    iter::Sum,
    ops::{Add, AddAssign},
};

use serde::Serialize;

use crate::{
    Population,
    config::{CostParameters, SewerParameters, SnipConfig},
};

pub use summary::{CostSummary, TreeCost};

/// Yearly cost split into annuitized investment and running costs
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AnnualCost {
    pub capital: f64,
    pub operation: f64,
}

impl AnnualCost {
    pub fn total(&self) -> f64 {
        self.capital + self.operation
    }
}

impl Add for AnnualCost {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            capital: self.capital + other.capital,
            operation: self.operation + other.operation,
        }
    }
}

impl AddAssign for AnnualCost {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sum for AnnualCost {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Cost functions bound to one parameter set
#[derive(Debug, Clone, Copy)]
pub struct CostModel<'a> {
    sewer: &'a SewerParameters,
    costs: &'a CostParameters,
}

impl<'a> CostModel<'a> {
    pub fn new(config: &'a SnipConfig) -> Self {
        Self {
            sewer: &config.sewer,
            costs: &config.costs,
        }
    }

    fn rate(&self) -> f64 {
        self.costs.interest_fraction()
    }

    /// Construction cost of one metre of pipe of `diameter` laid at `depth`
    fn pipe_cost_per_metre(&self, diameter: f64, depth: f64) -> f64 {
        let excavation =
            self.costs.excavation_cost * depth.max(0.0) * (diameter + self.costs.trench_allowance);
        self.costs.pipe_base_cost + self.costs.pipe_diameter_cost * diameter + excavation
    }

    fn sewer_cost(&self, length: f64, diameter: f64, depth: f64) -> AnnualCost {
        let shift = 1.0 + self.costs.fc_sewer_cost;
        let investment = self.pipe_cost_per_metre(diameter, depth) * length * shift;
        AnnualCost {
            capital: annuity::annuity(investment, self.rate(), self.costs.discount_years_sewers),
            operation: self.costs.operation_costs * length * shift,
        }
    }

    /// Public pipe conveying `population` at `slope`, with average trench depth `depth`
    pub fn pipe(&self, length: f64, population: Population, depth: f64, slope: f64) -> AnnualCost {
        let flow = hydraulics::design_flow(population, self.sewer);
        let diameter = hydraulics::pipe_diameter(flow, slope, self.sewer);
        self.sewer_cost(length, diameter, depth)
    }

    /// Pump lifting the flow of `population` by `lift` metres
    pub fn pump(&self, lift: f64, population: Population) -> AnnualCost {
        let flow = hydraulics::design_flow(population, self.sewer);
        let energy = hydraulics::pump_energy(flow, lift, self.sewer);
        AnnualCost {
            capital: annuity::annuity(
                self.costs.pump_investment_costs,
                self.rate(),
                self.costs.pumping_years,
            ),
            operation: energy * self.costs.price_kwh,
        }
    }

    /// Treatment plant serving `population`
    pub fn plant(&self, population: Population) -> AnnualCost {
        let population = population.max(0.0);
        let capex = self.costs.wwtp_capex_coefficient
            * population.powf(self.costs.wwtp_capex_exponent)
            * (1.0 + self.costs.fc_wwtp_capex);
        let opex = self.costs.wwtp_opex_coefficient
            * population.powf(self.costs.wwtp_opex_exponent)
            * (1.0 + self.costs.fc_wwtp_opex);
        AnnualCost {
            capital: annuity::annuity(capex, self.rate(), self.costs.wwtp_lifespan),
            operation: opex,
        }
    }

    /// Private lateral of fixed diameter and trench depth
    pub fn private_sewer(&self, length: f64) -> AnnualCost {
        self.sewer_cost(
            length,
            self.costs.private_pipe_diameter,
            self.costs.private_trench_depth,
        )
    }

    /// Reasonable capital cost per equivalent population, per year of sewer life
    pub fn reasonable_annual_cost_per_pe(&self) -> f64 {
        annuity::annuity(
            self.costs.reasonable_costs_per_pe,
            self.rate(),
            self.costs.discount_years_sewers,
        )
    }
}
