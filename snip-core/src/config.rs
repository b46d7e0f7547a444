//! Scenario parameters.
//!
//! One [`SnipConfig`] value is loaded per run and passed by reference to every
//! stage. Defaults follow the calibration used for rural settlements: 100 US
//! gallons of wastewater per equivalent population and a real interest rate
//! of 2.75 %.

use serde::{Deserialize, Serialize};

use crate::Error;

/// Complete, immutable parameter set of one scenario run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnipConfig {
    pub sewer: SewerParameters,
    pub costs: CostParameters,
    pub algorithm: AlgorithmParameters,
}

/// Engineering constraints of gravity sewers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SewerParameters {
    /// Minimum trench depth [m]
    pub min_trench_depth: f64,
    /// Maximum trench depth before a pump is required [m]
    pub max_trench_depth: f64,
    /// Minimum slope of gravity pipes [%]
    pub min_slope: f64,
    /// Strickler roughness coefficient [m^(1/3)/s]
    pub strickler: f64,
    /// Wastewater per equivalent population [m3/day]
    pub pe_flow: f64,
    /// Smallest public pipe diameter laid [m]
    pub min_pipe_diameter: f64,
    /// Wire-to-water efficiency of pumps [-]
    pub pump_efficiency: f64,
}

impl Default for SewerParameters {
    fn default() -> Self {
        Self {
            min_trench_depth: 0.9,
            max_trench_depth: 4.0,
            min_slope: 1.0,
            strickler: 85.0,
            pe_flow: 0.3785,
            min_pipe_diameter: 0.25,
            pump_efficiency: 0.6,
        }
    }
}

impl SewerParameters {
    /// Minimum slope as a fraction (1 % = 0.01)
    pub fn min_slope_fraction(&self) -> f64 {
        self.min_slope / 100.0
    }
}

/// Cost curves, lifespans and sensitivity shifts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostParameters {
    /// Capital cost per equivalent population considered reasonable
    pub reasonable_costs_per_pe: f64,
    /// Electricity price [currency/kWh]
    pub price_kwh: f64,
    /// Pump lifespan [years]
    pub pumping_years: u32,
    /// Sewer lifespan [years]
    pub discount_years_sewers: u32,
    /// Treatment plant lifespan [years]
    pub wwtp_lifespan: u32,
    /// Real interest rate [%]
    pub interest_rate: f64,
    /// Operation cost per metre of pipe and year
    pub operation_costs: f64,
    /// Fixed installation cost of one pump
    pub pump_investment_costs: f64,
    /// Pipe construction: fixed part per metre
    pub pipe_base_cost: f64,
    /// Pipe construction: cost per metre of pipe and metre of diameter
    pub pipe_diameter_cost: f64,
    /// Excavation cost per cubic metre of trench
    pub excavation_cost: f64,
    /// Trench width in excess of the pipe diameter [m]
    pub trench_allowance: f64,
    /// Plant capex: `coefficient * pe^exponent`
    pub wwtp_capex_coefficient: f64,
    pub wwtp_capex_exponent: f64,
    /// Plant opex per year: `coefficient * pe^exponent`
    pub wwtp_opex_coefficient: f64,
    pub wwtp_opex_exponent: f64,
    /// Diameter of private laterals [m]
    pub private_pipe_diameter: f64,
    /// Average trench depth of private laterals [m]
    pub private_trench_depth: f64,
    /// Sensitivity shift of the sewer cost curve (0.1 = +10 %)
    pub fc_sewer_cost: f64,
    /// Sensitivity shift of plant operation costs
    pub fc_wwtp_opex: f64,
    /// Sensitivity shift of plant replacement costs
    pub fc_wwtp_capex: f64,
}

impl Default for CostParameters {
    fn default() -> Self {
        Self {
            reasonable_costs_per_pe: 4220.0,
            price_kwh: 0.12,
            pumping_years: 30,
            discount_years_sewers: 50,
            wwtp_lifespan: 25,
            interest_rate: 2.75,
            operation_costs: 5.0,
            pump_investment_costs: 500.0,
            pipe_base_cost: 150.0,
            pipe_diameter_cost: 1000.0,
            excavation_cost: 80.0,
            trench_allowance: 0.6,
            wwtp_capex_coefficient: 12_000.0,
            wwtp_capex_exponent: 0.6,
            wwtp_opex_coefficient: 300.0,
            wwtp_opex_exponent: 0.7,
            private_pipe_diameter: 0.1,
            private_trench_depth: 0.9,
            fc_sewer_cost: 0.0,
            fc_wwtp_opex: 0.0,
            fc_wwtp_capex: 0.0,
        }
    }
}

impl CostParameters {
    /// Interest rate as a fraction (2.75 % = 0.0275)
    pub fn interest_fraction(&self) -> f64 {
        self.interest_rate / 100.0
    }
}

/// Parameters steering graph construction and network growth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlgorithmParameters {
    /// Routing penalty of street edges
    pub f_street: f64,
    /// Weight of the standalone plant side of the centralization test
    pub f_merge: f64,
    /// Routing penalty of terrain edges
    pub f_topo: f64,
    /// Radius of bounded path searches [m]
    pub neighborhood: f64,
    /// Maximum building to inlet distance [m]
    pub aggregation_threshold: f64,
    /// Tile edge of the density grid used for seed selection [m]
    pub tile_size: f64,
    /// Link radius of the terrain mesh [m], derived from the raster when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh_radius: Option<f64>,
}

impl Default for AlgorithmParameters {
    fn default() -> Self {
        Self {
            f_street: 5.0,
            f_merge: 2.4,
            f_topo: 1.2,
            neighborhood: 180.0,
            aggregation_threshold: 50.0,
            tile_size: 50.0,
            mesh_radius: None,
        }
    }
}

impl AlgorithmParameters {
    pub fn routing_factors(&self) -> RoutingFactors {
        RoutingFactors {
            f_street: self.f_street,
            f_topo: self.f_topo,
            mesh_radius: self.mesh_radius,
        }
    }
}

/// Edge weighting used by the graph builder
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutingFactors {
    pub f_street: f64,
    pub f_topo: f64,
    pub mesh_radius: Option<f64>,
}

impl Default for RoutingFactors {
    fn default() -> Self {
        AlgorithmParameters::default().routing_factors()
    }
}

impl RoutingFactors {
    pub(crate) fn validate(&self) -> Result<(), Error> {
        at_least("f_street", self.f_street, 1.0)?;
        at_least("f_topo", self.f_topo, 1.0)?;
        if let Some(radius) = self.mesh_radius {
            positive("mesh_radius", radius)?;
        }
        Ok(())
    }
}

impl SnipConfig {
    /// Checks every parameter before any algorithmic work starts
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] naming the first offending field
    pub fn validate(&self) -> Result<(), Error> {
        let sewer = &self.sewer;
        positive("min_trench_depth", sewer.min_trench_depth)?;
        finite("max_trench_depth", sewer.max_trench_depth)?;
        if sewer.max_trench_depth <= sewer.min_trench_depth {
            return Err(Error::parameter(
                "max_trench_depth",
                format!(
                    "must exceed min_trench_depth ({} <= {})",
                    sewer.max_trench_depth, sewer.min_trench_depth
                ),
            ));
        }
        positive("min_slope", sewer.min_slope)?;
        positive("strickler", sewer.strickler)?;
        positive("pe_flow", sewer.pe_flow)?;
        positive("min_pipe_diameter", sewer.min_pipe_diameter)?;
        positive("pump_efficiency", sewer.pump_efficiency)?;
        if sewer.pump_efficiency > 1.0 {
            return Err(Error::parameter("pump_efficiency", "must not exceed 1"));
        }

        let costs = &self.costs;
        non_negative("reasonable_costs_per_pe", costs.reasonable_costs_per_pe)?;
        non_negative("price_kwh", costs.price_kwh)?;
        lifespan("pumping_years", costs.pumping_years)?;
        lifespan("discount_years_sewers", costs.discount_years_sewers)?;
        lifespan("wwtp_lifespan", costs.wwtp_lifespan)?;
        finite("interest_rate", costs.interest_rate)?;
        if costs.interest_rate <= -100.0 {
            return Err(Error::parameter(
                "interest_rate",
                "annuity factor is undefined at or below -100 %",
            ));
        }
        for (name, value) in [
            ("operation_costs", costs.operation_costs),
            ("pump_investment_costs", costs.pump_investment_costs),
            ("pipe_base_cost", costs.pipe_base_cost),
            ("pipe_diameter_cost", costs.pipe_diameter_cost),
            ("excavation_cost", costs.excavation_cost),
            ("trench_allowance", costs.trench_allowance),
            ("wwtp_capex_coefficient", costs.wwtp_capex_coefficient),
            ("wwtp_capex_exponent", costs.wwtp_capex_exponent),
            ("wwtp_opex_coefficient", costs.wwtp_opex_coefficient),
            ("wwtp_opex_exponent", costs.wwtp_opex_exponent),
        ] {
            non_negative(name, value)?;
        }
        positive("private_pipe_diameter", costs.private_pipe_diameter)?;
        positive("private_trench_depth", costs.private_trench_depth)?;
        shift("fc_sewer_cost", costs.fc_sewer_cost)?;
        shift("fc_wwtp_opex", costs.fc_wwtp_opex)?;
        shift("fc_wwtp_capex", costs.fc_wwtp_capex)?;

        let algorithm = &self.algorithm;
        algorithm.routing_factors().validate()?;
        non_negative("f_merge", algorithm.f_merge)?;
        positive("neighborhood", algorithm.neighborhood)?;
        positive("aggregation_threshold", algorithm.aggregation_threshold)?;
        positive("tile_size", algorithm.tile_size)?;
        Ok(())
    }
}

fn finite(name: &'static str, value: f64) -> Result<(), Error> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::parameter(name, format!("must be finite, got {value}")))
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), Error> {
    finite(name, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(Error::parameter(name, format!("must be positive, got {value}")))
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), Error> {
    finite(name, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(Error::parameter(name, format!("must not be negative, got {value}")))
    }
}

fn at_least(name: &'static str, value: f64, min: f64) -> Result<(), Error> {
    finite(name, value)?;
    if value >= min {
        Ok(())
    } else {
        Err(Error::parameter(name, format!("must be at least {min}, got {value}")))
    }
}

fn lifespan(name: &'static str, years: u32) -> Result<(), Error> {
    if years == 0 {
        Err(Error::parameter(name, "lifespan must be at least one year"))
    } else {
        Ok(())
    }
}

fn shift(name: &'static str, value: f64) -> Result<(), Error> {
    finite(name, value)?;
    if value > -1.0 {
        Ok(())
    } else {
        Err(Error::parameter(name, format!("shift of {value} makes costs negative")))
    }
}
