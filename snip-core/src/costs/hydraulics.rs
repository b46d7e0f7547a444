//! Flow and pipe sizing

use std::f64::consts::PI;

use crate::{Population, config::SewerParameters};

const SECONDS_PER_DAY: f64 = 86_400.0;
const WATER_DENSITY: f64 = 1000.0;
const GRAVITY: f64 = 9.81;
const HOURS_PER_YEAR: f64 = 8760.0;

/// Average dry weather flow of `population` [m3/s]
pub fn design_flow(population: Population, sewer: &SewerParameters) -> f64 {
    population.max(0.0) * sewer.pe_flow / SECONDS_PER_DAY
}

/// Smallest circular diameter carrying `flow` [m3/s] full at `slope` [-]
/// according to Manning-Strickler, never below `min_pipe_diameter`.
///
/// Slopes flatter than the minimum slope, as well as rising pressure mains,
/// are sized at the minimum slope.
pub fn pipe_diameter(flow: f64, slope: f64, sewer: &SewerParameters) -> f64 {
    if flow <= 0.0 {
        return sewer.min_pipe_diameter;
    }
    let slope = slope.max(sewer.min_slope_fraction());
    // Q = k * (pi / 4) * D^2 * (D / 4)^(2/3) * sqrt(S)
    let capacity_per_diameter =
        sewer.strickler * PI / 4.0 * 0.25_f64.powf(2.0 / 3.0) * slope.sqrt();
    let diameter = (flow / capacity_per_diameter).powf(3.0 / 8.0);
    diameter.max(sewer.min_pipe_diameter)
}

/// Yearly electricity use of a pump lifting `flow` [m3/s] by `lift` [m] [kWh]
pub fn pump_energy(flow: f64, lift: f64, sewer: &SewerParameters) -> f64 {
    let power_watts = WATER_DENSITY * GRAVITY * flow * lift.max(0.0) / sewer.pump_efficiency;
    power_watts * HOURS_PER_YEAR / 1000.0
}
