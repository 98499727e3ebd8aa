//! SOP resynthesis with algebraic factoring.

use crate::resynthesis::sop::{synth_from_cube, synth_from_sop};
use crate::transform::Resynthesizer;
use silica_subnet::{CellSymbol, Link, Subnet, SubnetBuilder, SubnetView};
use silica_tt::{isop, Cube};

/// Minato-Morreale cover followed by recursive algebraic factoring.
///
/// The cover is factored on its most frequent literal: cubes containing
/// the literal form the quotient (with the literal removed), the rest the
/// remainder, and both sides recurse. Covers with no repeated literal are
/// emitted flat.
#[derive(Debug, Default)]
pub struct MmFactorSynthesizer;

impl Resynthesizer for MmFactorSynthesizer {
    fn resynthesize(&self, view: &SubnetView, max_arity: u16) -> Option<Subnet> {
        let (target, dc, inv) = super::function_under_care(view)?;
        let num_vars = target.num_vars();

        if target.is_zero() {
            return Some(SubnetBuilder::make_const(num_vars, inv));
        }
        if (&target | &dc).is_one() {
            return Some(SubnetBuilder::make_const(num_vars, !inv));
        }

        let cover = isop(&target, &dc);
        let mut builder = SubnetBuilder::new();
        let inputs: Vec<Link> = (0..num_vars).map(|_| builder.add_input()).collect();
        let root = factor(&cover, &inputs, &mut builder, max_arity);
        builder.add_output(root.invert_if(inv));
        Some(builder.make())
    }
}

/// Recursively factors a cover into `lit & quotient | remainder`.
fn factor(cover: &[Cube], inputs: &[Link], builder: &mut SubnetBuilder, max_arity: u16) -> Link {
    if cover.is_empty() {
        return builder.add_cell(CellSymbol::Zero, vec![]);
    }
    if cover.len() == 1 {
        return synth_from_cube(&cover[0], inputs, builder, max_arity);
    }

    let Some(divisor) = most_frequent_literal(cover) else {
        // No literal shared by two cubes: the flat SOP is already the
        // cheapest algebraic form.
        return synth_from_sop(cover, inputs, builder, max_arity);
    };

    let mut quotient: Vec<Cube> = Vec::new();
    let mut remainder: Vec<Cube> = Vec::new();
    for cube in cover {
        if divisor.covers(cube) {
            quotient.push(cube.without_literals_of(&divisor));
        } else {
            remainder.push(*cube);
        }
    }

    let lit_link = literal_link(&divisor, inputs);
    let quotient_link = factor(&quotient, inputs, builder, max_arity);
    let product = and2(builder, lit_link, quotient_link, max_arity);

    if remainder.is_empty() {
        return product;
    }
    let remainder_link = factor(&remainder, inputs, builder, max_arity);
    // a | b as ~(~a & ~b), staying in the AND/inverter basis.
    !builder.add_cell_tree(CellSymbol::And, vec![!product, !remainder_link], max_arity)
}

fn and2(builder: &mut SubnetBuilder, a: Link, b: Link, max_arity: u16) -> Link {
    builder.add_cell_tree(CellSymbol::And, vec![a, b], max_arity)
}

fn literal_link(divisor: &Cube, inputs: &[Link]) -> Link {
    let var = divisor.vars().next().expect("divisor is a literal cube");
    inputs[var].invert_if(!divisor.polarity(var))
}

/// Returns the literal occurring in the most cubes, if any occurs twice.
fn most_frequent_literal(cover: &[Cube]) -> Option<Cube> {
    let mut best: Option<(usize, Cube)> = None;
    for var in 0..32 {
        for polarity in [true, false] {
            let literal = Cube::literal(var, polarity);
            let count = cover.iter().filter(|cube| literal.covers(cube)).count();
            if count >= 2 && best.as_ref().map_or(true, |(c, _)| count > *c) {
                best = Some((count, literal));
            }
        }
    }
    best.map(|(_, literal)| literal)
}
