//! Input records handed to the engine by the layer readers
//!
//! All geometries share one planar coordinate system in metres.

use geo::{LineString, Point};

use crate::Population;

/// Street centreline
#[derive(Debug, Clone)]
pub struct StreetSegment {
    pub id: String,
    pub geometry: LineString<f64>,
}

impl StreetSegment {
    pub fn new(id: impl Into<String>, geometry: LineString<f64>) -> Self {
        Self {
            id: id.into(),
            geometry,
        }
    }
}

/// Terrain elevation sample
#[derive(Debug, Clone, Copy)]
pub struct TerrainSample {
    pub position: Point<f64>,
    /// Ground elevation [m]
    pub elevation: f64,
}

impl TerrainSample {
    pub fn new(x: f64, y: f64, elevation: f64) -> Self {
        Self {
            position: Point::new(x, y),
            elevation,
        }
    }
}

/// Building producing wastewater
#[derive(Debug, Clone)]
pub struct Building {
    pub id: String,
    pub position: Point<f64>,
    /// Connected equivalent population
    pub population: Population,
}

impl Building {
    pub fn new(id: impl Into<String>, position: Point<f64>, population: Population) -> Self {
        Self {
            id: id.into(),
            position,
            population,
        }
    }
}
