//! Trench depth walk along a sewer branch
//!
//! Inverts are absolute elevations of the pipe bottom. Flow leaves a node at
//! its outlet invert and reaches the next node at the arrival invert.

use crate::config::SewerParameters;

/// Lifts below this are rounding noise of the invert arithmetic [m]
const LIFT_TOLERANCE: f64 = 1e-9;

/// How a gravity pipe would sit in the ground at its downstream end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum DepthCheck {
    Within,
    /// Terrain falls faster than the minimum slope, the pipe is deepened
    TooShallow,
    /// The trench would exceed the maximum depth, a pump is needed
    TooDeep,
}

/// One pipe of the depth walk
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Descent {
    pub(super) outlet: f64,
    pub(super) arrival: f64,
    /// Lift height when the upstream node pumps into a pressure main [m]
    pub(super) lift: Option<f64>,
}

impl Descent {
    pub(super) fn slope(&self, length: f64) -> f64 {
        (self.outlet - self.arrival) / length
    }
}

#[derive(Debug, Clone, Copy)]
pub(super) struct TrenchProfile<'a> {
    sewer: &'a SewerParameters,
}

impl<'a> TrenchProfile<'a> {
    pub(super) fn new(sewer: &'a SewerParameters) -> Self {
        Self { sewer }
    }

    /// Invert of a node laid at the minimum trench depth
    pub(super) fn shallowest(&self, ground: f64) -> f64 {
        ground - self.sewer.min_trench_depth
    }

    /// Lays the pipe from a node at `ground_from` with lowest incoming
    /// invert `inflow` to a node at `ground_to`, `length` metres away.
    ///
    /// A `pumped` node keeps pumping even if gravity would now suffice.
    pub(super) fn descend(
        &self,
        inflow: f64,
        ground_from: f64,
        ground_to: f64,
        length: f64,
        pumped: bool,
    ) -> Descent {
        let outlet = inflow.min(self.shallowest(ground_from));
        let (gravity, check) = self.check(outlet, ground_to, length);

        if pumped || check == DepthCheck::TooDeep {
            let gravity_depth = ground_to - gravity;
            let lift = gravity_depth - self.sewer.min_trench_depth;
            return Descent {
                outlet,
                arrival: self.shallowest(ground_to),
                lift: Some(if lift > LIFT_TOLERANCE { lift } else { 0.0 }),
            };
        }
        Descent {
            outlet,
            arrival: gravity,
            lift: None,
        }
    }

    fn check(&self, outlet: f64, ground_to: f64, length: f64) -> (f64, DepthCheck) {
        let gravity = outlet - self.sewer.min_slope_fraction() * length;
        let shallowest = self.shallowest(ground_to);
        if gravity > shallowest {
            return (shallowest, DepthCheck::TooShallow);
        }
        if ground_to - gravity > self.sewer.max_trench_depth {
            return (gravity, DepthCheck::TooDeep);
        }
        (gravity, DepthCheck::Within)
    }
}
