//! Algorithms that produce replacement cones from Boolean functions.

mod akers;
mod factor;
mod reorder;
mod sop;

pub use akers::AkersSynthesizer;
pub use factor::MmFactorSynthesizer;
pub use reorder::AssociativeReorderer;
pub use sop::{synth_from_cube, synth_from_sop, MmSynthesizer};

use silica_subnet::{eval, SubnetView};
use silica_tt::TruthTable;

/// Evaluates a single-output view's function and splits the care-adjusted
/// on-set polarity the SOP synthesizers share: returns `(cover target,
/// don't-care set, output inverted)`, choosing the polarity with fewer
/// care minterms.
pub(crate) fn function_under_care(view: &SubnetView) -> Option<(TruthTable, TruthTable, bool)> {
    if view.out_num() != 1 {
        return None;
    }
    let func = eval::evaluate_view(view).pop()?;
    let num_vars = func.num_vars();
    let care = view
        .care()
        .cloned()
        .unwrap_or_else(|| TruthTable::one(num_vars));
    let on = &func & &care;
    let off = &!&func & &care;
    let inv = on.count_ones() > off.count_ones();
    let target = if inv { off } else { on };
    let dc = !&care;
    Some((target, dc, inv))
}
