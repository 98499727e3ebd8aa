//! The mapper's cost model.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Index, IndexMut, Mul};

/// The three optimization dimensions, in default priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dimension {
    /// Cell area.
    Area,
    /// Arrival delay.
    Delay,
    /// Leakage power.
    Power,
}

/// An `[area, delay, power]` triple.
///
/// Unknown (not-yet-computed) costs are `f32::MAX`, never `NaN`, so
/// comparisons stay total; NaN from the library is rejected at load.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostVector {
    /// Cell area.
    pub area: f32,
    /// Arrival delay.
    pub delay: f32,
    /// Leakage power.
    pub power: f32,
}

impl CostVector {
    /// The zero vector.
    pub const ZERO: CostVector = CostVector {
        area: 0.0,
        delay: 0.0,
        power: 0.0,
    };

    /// The all-unknown vector.
    pub const UNDEF: CostVector = CostVector {
        area: f32::MAX,
        delay: f32::MAX,
        power: f32::MAX,
    };

    /// The neutral tension vector.
    pub const ONES: CostVector = CostVector {
        area: 1.0,
        delay: 1.0,
        power: 1.0,
    };

    /// Creates a vector from its components.
    pub fn new(area: f32, delay: f32, power: f32) -> Self {
        Self { area, delay, power }
    }

    /// Componentwise multiplication (tension application).
    pub fn scale(&self, other: &CostVector) -> CostVector {
        CostVector {
            area: self.area * other.area,
            delay: self.delay * other.delay,
            power: self.power * other.power,
        }
    }

    /// Componentwise maximum with `other`.
    pub fn max(&self, other: &CostVector) -> CostVector {
        CostVector {
            area: self.area.max(other.area),
            delay: self.delay.max(other.delay),
            power: self.power.max(other.power),
        }
    }
}

impl Index<Dimension> for CostVector {
    type Output = f32;

    fn index(&self, dim: Dimension) -> &f32 {
        match dim {
            Dimension::Area => &self.area,
            Dimension::Delay => &self.delay,
            Dimension::Power => &self.power,
        }
    }
}

impl IndexMut<Dimension> for CostVector {
    fn index_mut(&mut self, dim: Dimension) -> &mut f32 {
        match dim {
            Dimension::Area => &mut self.area,
            Dimension::Delay => &mut self.delay,
            Dimension::Power => &mut self.power,
        }
    }
}

impl Add for CostVector {
    type Output = CostVector;

    fn add(self, rhs: CostVector) -> CostVector {
        CostVector {
            area: self.area + rhs.area,
            delay: self.delay + rhs.delay,
            power: self.power + rhs.power,
        }
    }
}

impl Mul<f32> for CostVector {
    type Output = CostVector;

    fn mul(self, rhs: f32) -> CostVector {
        CostVector {
            area: self.area * rhs,
            delay: self.delay * rhs,
            power: self.power * rhs,
        }
    }
}

/// Aggregates fanin cost vectors of a cut: area and power are summed,
/// delay is the maximum arrival.
pub fn aggregate(vectors: &[CostVector]) -> CostVector {
    let mut result = CostVector::ZERO;
    for v in vectors {
        result.area += v.area;
        result.delay = result.delay.max(v.delay);
        result.power += v.power;
    }
    result
}

/// Propagates a per-cell cost through its fanout: area and power are
/// divided by the fanout (area-flow and power-flow heuristics), delay
/// passes unchanged.
pub fn propagate(vector: &CostVector, fanout: u32) -> CostVector {
    let divisor = fanout.max(1) as f32;
    CostVector {
        area: vector.area / divisor,
        delay: vector.delay,
        power: vector.power / divisor,
    }
}

/// Mapping constraints: per-dimension bounds plus a lexicographic
/// priority for comparisons.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Criterion {
    /// Upper bounds; `f32::MAX` means unconstrained.
    pub bounds: CostVector,
    /// Comparison priority, most significant first.
    pub priority: [Dimension; 3],
}

impl Default for Criterion {
    fn default() -> Self {
        Self {
            bounds: CostVector::UNDEF,
            priority: [Dimension::Area, Dimension::Delay, Dimension::Power],
        }
    }
}

impl Criterion {
    /// An area-first criterion with explicit bounds.
    pub fn with_bounds(bounds: CostVector) -> Self {
        Self {
            bounds,
            ..Self::default()
        }
    }

    /// A delay-first criterion.
    pub fn delay_oriented(bounds: CostVector) -> Self {
        Self {
            bounds,
            priority: [Dimension::Delay, Dimension::Area, Dimension::Power],
        }
    }

    /// Returns `true` if the vector satisfies every bound.
    pub fn check(&self, vector: &CostVector) -> bool {
        vector.area <= self.bounds.area
            && vector.delay <= self.bounds.delay
            && vector.power <= self.bounds.power
    }

    /// Returns the violation magnitudes: per dimension, `value / bound`
    /// when the bound is exceeded, otherwise 1.
    pub fn tension(&self, vector: &CostVector) -> CostVector {
        let component = |value: f32, bound: f32| {
            if bound < f32::MAX && value > bound && bound > 0.0 {
                value / bound
            } else {
                1.0
            }
        };
        CostVector {
            area: component(vector.area, self.bounds.area),
            delay: component(vector.delay, self.bounds.delay),
            power: component(vector.power, self.bounds.power),
        }
    }

    /// Returns `true` if `a` beats `b` under the tension-biased
    /// lexicographic priority.
    ///
    /// Dimensions under tension (> 1 after accumulated recovery updates)
    /// are promoted ahead of the configured priority, most tense first,
    /// so repeated violations steer the comparison toward the binding
    /// constraint; components are also scaled by their tension.
    pub fn better(&self, a: &CostVector, b: &CostVector, tension: &CostVector) -> bool {
        let a = a.scale(tension);
        let b = b.scale(tension);
        let mut dims = self.priority;
        dims.sort_by(|&x, &y| {
            tension[y]
                .partial_cmp(&tension[x])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for dim in dims {
            let (x, y) = (a[dim], b[dim]);
            if (x - y).abs() > f32::EPSILON * (1.0 + x.abs() + y.abs()) {
                return x < y;
            }
        }
        false
    }
}
