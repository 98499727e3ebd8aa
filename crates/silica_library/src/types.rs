//! Loader record types and lookup-table surfaces.
//!
//! These are the contract with the Liberty front-end: the loader emits
//! plain records and the library model does the interpretation
//! (canonization, collision checks, super-cell derivation).

use serde::{Deserialize, Serialize};

/// An input pin as delivered by the loader.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputPinRecord {
    /// Pin name (formula references resolve against it).
    pub name: String,
    /// Input capacitance.
    pub capacitance: f32,
}

/// An output pin as delivered by the loader.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputPinRecord {
    /// Pin name.
    pub name: String,
    /// Boolean function over the cell's input pins.
    pub function: String,
    /// Delay surface per timing arc, if characterized.
    pub delay: Option<DelayLut>,
}

/// One standard cell as delivered by the loader.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CellRecord {
    /// Unique cell name.
    pub name: String,
    /// Input pins in pin order.
    pub input_pins: Vec<InputPinRecord>,
    /// Output pins in pin order.
    pub output_pins: Vec<OutputPinRecord>,
    /// Cell area; `NaN` marks an uncharacterized cell, which is skipped.
    pub area: f32,
    /// Nominal delay used when no surface is characterized.
    pub delay: f32,
    /// Leakage power.
    pub leakage: f32,
}

/// A delay/transition lookup table indexed by input transition (rows)
/// and output capacitance (columns).
///
/// Lookup interpolates bi-linearly inside the grid and extrapolates
/// linearly from the outermost two grid lines outside it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DelayLut {
    /// Row coordinates (input transition), ascending.
    pub transitions: Vec<f32>,
    /// Column coordinates (output capacitance), ascending.
    pub loads: Vec<f32>,
    /// `values[row][col]`.
    pub values: Vec<Vec<f32>>,
}

impl DelayLut {
    /// Evaluates the surface at `(transition, load)`.
    pub fn lookup(&self, transition: f32, load: f32) -> f32 {
        let (r0, r1, rt) = bracket(&self.transitions, transition);
        let (c0, c1, ct) = bracket(&self.loads, load);
        let v00 = self.values[r0][c0];
        let v01 = self.values[r0][c1];
        let v10 = self.values[r1][c0];
        let v11 = self.values[r1][c1];
        let low = v00 + (v01 - v00) * ct;
        let high = v10 + (v11 - v10) * ct;
        low + (high - low) * rt
    }
}

/// Returns bracketing indices and the interpolation parameter for `x` on
/// `axis`; the parameter leaves `[0, 1]` for extrapolation.
fn bracket(axis: &[f32], x: f32) -> (usize, usize, f32) {
    if axis.len() == 1 {
        return (0, 0, 0.0);
    }
    let mut hi = 1;
    while hi + 1 < axis.len() && axis[hi] < x {
        hi += 1;
    }
    let lo = hi - 1;
    let span = axis[hi] - axis[lo];
    let t = if span == 0.0 { 0.0 } else { (x - axis[lo]) / span };
    (lo, hi, t)
}

/// A wire-load model: per-net parasitics estimated from fanout.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WireLoadModel {
    /// Model name.
    pub name: String,
    /// Resistance per unit length.
    pub resistance: f32,
    /// Capacitance per unit length.
    pub capacitance: f32,
    /// Length increment per fanout beyond the table.
    pub slope: f32,
    /// `(fanout, length)` points, ascending by fanout.
    pub fanout_length: Vec<(u32, f32)>,
}

impl WireLoadModel {
    /// Estimates net length for a fanout count, extending the table by
    /// `slope` beyond its last point.
    pub fn length_for_fanout(&self, fanout: u32) -> f32 {
        if self.fanout_length.is_empty() {
            return self.slope * fanout as f32;
        }
        for &(f, length) in &self.fanout_length {
            if f >= fanout {
                return length;
            }
        }
        let &(last_fanout, last_length) = self.fanout_length.last().unwrap();
        last_length + self.slope * (fanout - last_fanout) as f32
    }

    /// Estimated net capacitance for a fanout count.
    pub fn capacitance_for_fanout(&self, fanout: u32) -> f32 {
        self.capacitance * self.length_for_fanout(fanout)
    }
}

/// Area-range selection of wire-load models.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WireLoadSelection {
    /// `(lower_bound, upper_bound, model_name)` rows.
    pub ranges: Vec<(f32, f32, String)>,
}

impl WireLoadSelection {
    /// Returns the model name whose range covers `area`.
    pub fn select(&self, area: f32) -> Option<&str> {
        self.ranges
            .iter()
            .find(|(lo, hi, _)| *lo <= area && area < *hi)
            .map(|(_, _, name)| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lut() -> DelayLut {
        DelayLut {
            transitions: vec![0.1, 0.3],
            loads: vec![1.0, 2.0, 4.0],
            values: vec![vec![10.0, 20.0, 40.0], vec![30.0, 40.0, 60.0]],
        }
    }

    #[test]
    fn exact_grid_points() {
        let lut = lut();
        assert_eq!(lut.lookup(0.1, 1.0), 10.0);
        assert_eq!(lut.lookup(0.3, 4.0), 60.0);
        assert_eq!(lut.lookup(0.1, 2.0), 20.0);
    }

    #[test]
    fn bilinear_interior() {
        let lut = lut();
        // Midpoint between all four corners of the first patch.
        let v = lut.lookup(0.2, 1.5);
        assert!((v - 25.0).abs() < 1e-5);
    }

    #[test]
    fn linear_extrapolation_beyond_grid() {
        let lut = lut();
        // Loads extend 2.0 → 4.0 with slope (60-40)/2 on the second row.
        let v = lut.lookup(0.3, 6.0);
        assert!((v - 80.0).abs() < 1e-4);
        // Below the first transition row.
        let v = lut.lookup(-0.1, 1.0);
        assert!((v - (-10.0)).abs() < 1e-4);
    }

    #[test]
    fn single_point_axis_is_constant() {
        let lut = DelayLut {
            transitions: vec![0.1],
            loads: vec![1.0],
            values: vec![vec![7.0]],
        };
        assert_eq!(lut.lookup(5.0, 5.0), 7.0);
    }

    #[test]
    fn wlm_table_and_slope() {
        let wlm = WireLoadModel {
            name: "small".into(),
            resistance: 0.1,
            capacitance: 2.0,
            slope: 5.0,
            fanout_length: vec![(1, 10.0), (2, 18.0), (4, 30.0)],
        };
        assert_eq!(wlm.length_for_fanout(1), 10.0);
        assert_eq!(wlm.length_for_fanout(3), 30.0);
        assert_eq!(wlm.length_for_fanout(6), 30.0 + 2.0 * 5.0);
        assert_eq!(wlm.capacitance_for_fanout(1), 20.0);
    }

    #[test]
    fn wlm_selection_by_area() {
        let selection = WireLoadSelection {
            ranges: vec![
                (0.0, 100.0, "small".into()),
                (100.0, 1000.0, "big".into()),
            ],
        };
        assert_eq!(selection.select(50.0), Some("small"));
        assert_eq!(selection.select(100.0), Some("big"));
        assert_eq!(selection.select(5000.0), None);
    }
}
