//! Canonical forms of Boolean functions under input permutation (P) and
//! input/output negation plus permutation (NPN).
//!
//! The canonizers enumerate the symmetry group outright, which bounds them
//! to small variable counts: P to [`MAX_P_VARS`] and NPN to
//! [`MAX_NPN_VARS`]. Library cells and cuts beyond those bounds are not
//! canonized; the library loader skips such cells with a warning.

use crate::table::TruthTable;
use serde::{Deserialize, Serialize};

/// The largest arity the P-canonizer accepts (7! = 5040 permutations).
pub const MAX_P_VARS: usize = 7;

/// The largest arity the NPN-canonizer accepts.
pub const MAX_NPN_VARS: usize = 6;

/// The input permutation taking an original function to its P-canonical
/// representative: canonical variable `i` is wired to original variable
/// `perm[i]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PTransform {
    /// `perm[canonical_var] = original_var`.
    pub perm: Vec<u8>,
}

impl PTransform {
    /// Applies the transform to a function, producing its canonical form.
    pub fn apply(&self, tt: &TruthTable) -> TruthTable {
        tt.permute_inputs(&self.perm)
    }
}

/// The NPN transform taking an original function to its canonical
/// representative: inputs in `input_neg` are complemented first, then
/// permuted by `perm`, then the output is complemented if `output_neg`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NpnTransform {
    /// `perm[canonical_var] = original_var` (after negation).
    pub perm: Vec<u8>,
    /// Bit `i` complements original variable `i`.
    pub input_neg: u32,
    /// Complements the output.
    pub output_neg: bool,
}

impl NpnTransform {
    /// Applies the transform to a function, producing its canonical form.
    pub fn apply(&self, tt: &TruthTable) -> TruthTable {
        let flipped = tt.flip_inputs(self.input_neg);
        let permuted = flipped.permute_inputs(&self.perm);
        if self.output_neg {
            !&permuted
        } else {
            permuted
        }
    }
}

/// Computes the P-canonical form of `tt` and the permutation that produces
/// it: `canon == transform.apply(tt)`.
///
/// # Panics
///
/// Panics if `tt` has more than [`MAX_P_VARS`] variables.
pub fn p_canonize(tt: &TruthTable) -> (TruthTable, PTransform) {
    let n = tt.num_vars();
    assert!(n <= MAX_P_VARS, "P-canonization is bounded to {MAX_P_VARS} inputs");

    let mut best = tt.clone();
    let mut best_perm: Vec<u8> = (0..n as u8).collect();

    for perm in permutations(n) {
        let candidate = tt.permute_inputs(&perm);
        if candidate.blocks() < best.blocks() {
            best = candidate;
            best_perm = perm;
        }
    }

    (best, PTransform { perm: best_perm })
}

/// Computes the NPN-canonical form of `tt` and the transform that produces
/// it: `canon == transform.apply(tt)`.
///
/// # Panics
///
/// Panics if `tt` has more than [`MAX_NPN_VARS`] variables.
pub fn npn_canonize(tt: &TruthTable) -> (TruthTable, NpnTransform) {
    let n = tt.num_vars();
    assert!(n <= MAX_NPN_VARS, "NPN-canonization is bounded to {MAX_NPN_VARS} inputs");

    let mut best: Option<(TruthTable, NpnTransform)> = None;

    for input_neg in 0..(1u32 << n) {
        let flipped = tt.flip_inputs(input_neg);
        for perm in permutations(n) {
            let permuted = flipped.permute_inputs(&perm);
            for output_neg in [false, true] {
                let candidate = if output_neg { !&permuted } else { permuted.clone() };
                let better = match &best {
                    None => true,
                    Some((current, _)) => candidate.blocks() < current.blocks(),
                };
                if better {
                    best = Some((
                        candidate,
                        NpnTransform {
                            perm: perm.clone(),
                            input_neg,
                            output_neg,
                        },
                    ));
                }
            }
        }
    }

    best.expect("the symmetry group is never empty")
}

/// Enumerates all permutations of `0..n` (Heap's algorithm).
fn permutations(n: usize) -> Vec<Vec<u8>> {
    let mut items: Vec<u8> = (0..n as u8).collect();
    let mut result = Vec::new();
    heap_permute(&mut items, n, &mut result);
    result
}

fn heap_permute(items: &mut Vec<u8>, k: usize, out: &mut Vec<Vec<u8>>) {
    if k <= 1 {
        out.push(items.clone());
        return;
    }
    for i in 0..k {
        heap_permute(items, k - 1, out);
        if k % 2 == 0 {
            items.swap(i, k - 1);
        } else {
            items.swap(0, k - 1);
        }
    }
}
