//! Buildings aggregated onto sewer inlets

use geo::Point;

use crate::{NodeId, Population};

/// Private lateral from one building to its inlet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lateral {
    /// Index of the building in the input slice
    pub building: usize,
    /// Building to inlet distance [m]
    pub length: f64,
}

/// One or more buildings draining into a shared inlet node
#[derive(Debug, Clone)]
pub struct AggregatedPoint {
    pub inlet: NodeId,
    pub position: Point<f64>,
    /// Summed equivalent population of all laterals
    pub population: Population,
    pub laterals: Vec<Lateral>,
    /// The inlet is the building itself, away from any street
    pub standalone: bool,
}

impl AggregatedPoint {
    pub(crate) fn new(inlet: NodeId, position: Point<f64>, standalone: bool) -> Self {
        Self {
            inlet,
            position,
            population: 0.0,
            laterals: Vec::new(),
            standalone,
        }
    }

    pub(crate) fn attach(&mut self, building: usize, population: Population, length: f64) {
        self.population += population;
        self.laterals.push(Lateral { building, length });
    }

    /// Largest building to inlet distance justifying the aggregation
    pub fn aggregation_distance(&self) -> f64 {
        self.laterals
            .iter()
            .map(|lateral| lateral.length)
            .fold(0.0, f64::max)
    }

    pub fn building_count(&self) -> usize {
        self.laterals.len()
    }
}
