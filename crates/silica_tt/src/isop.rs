//! Irredundant sum-of-products computation (Minato-Morreale).

use crate::cube::Cube;
use crate::table::TruthTable;

/// Computes an irredundant SOP cover of any function `g` with
/// `on ⊆ g ⊆ on | dc`.
///
/// `on` is the required on-set, `dc` the don't-care set; they must not
/// overlap (callers pass `f & care` and `!care`). The returned cover is
/// irredundant in the Minato-Morreale sense: dropping any cube uncovers
/// part of `on`.
pub fn isop(on: &TruthTable, dc: &TruthTable) -> Vec<Cube> {
    debug_assert_eq!(on.num_vars(), dc.num_vars());
    debug_assert!((on & dc).is_zero(), "on-set and don't-care overlap");
    let upper = on | dc;
    let (cover, _) = isop_rec(on, &upper, on.num_vars());
    cover
}

/// Recursive core: returns a cover of some `g` with `lower ⊆ g ⊆ upper`,
/// together with the function the cover computes.
fn isop_rec(lower: &TruthTable, upper: &TruthTable, num_vars: usize) -> (Vec<Cube>, TruthTable) {
    if lower.is_zero() {
        return (Vec::new(), TruthTable::zero(num_vars));
    }
    if upper.is_one() {
        return (vec![Cube::TAUTOLOGY], TruthTable::one(num_vars));
    }

    // Split on the lowest variable either bound depends on.
    let var = (0..num_vars)
        .find(|&v| lower.depends_on(v) || upper.depends_on(v))
        .expect("non-constant bounds must depend on a variable");

    let l0 = lower.cofactor0(var);
    let l1 = lower.cofactor1(var);
    let u0 = upper.cofactor0(var);
    let u1 = upper.cofactor1(var);

    // Cubes that must carry the negative literal: needed where the
    // function is on with var=0 but may not be on with var=1.
    let (mut cover0, f0) = isop_rec(&(&l0 & &!&u1), &u0, num_vars);
    // Cubes that must carry the positive literal.
    let (mut cover1, f1) = isop_rec(&(&l1 & &!&u0), &u1, num_vars);

    // What remains of the on-set is covered without a literal on var.
    let rest0 = &l0 & &!&f0;
    let rest1 = &l1 & &!&f1;
    let (cover_star, f_star) = isop_rec(&(&rest0 | &rest1), &(&u0 & &u1), num_vars);

    let var_tt = TruthTable::nth_var(num_vars, var);
    let func = &(&(&!&var_tt & &f0) | &(&var_tt & &f1)) | &f_star;

    let mut cover = Vec::with_capacity(cover0.len() + cover1.len() + cover_star.len());
    for c in cover0.drain(..) {
        cover.push(c.with_literal(var, false));
    }
    for c in cover1.drain(..) {
        cover.push(c.with_literal(var, true));
    }
    cover.extend(cover_star);

    (cover, func)
}
