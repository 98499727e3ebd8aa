//! Sum-of-products resynthesis (Minato-Morreale ISOP).

use crate::transform::Resynthesizer;
use silica_subnet::{CellSymbol, Link, Subnet, SubnetBuilder, SubnetView};
use silica_tt::{isop, Cube};

/// Synthesizes an AND-of-literals for one cube. Single-literal cubes
/// collapse to the literal's link.
pub fn synth_from_cube(
    cube: &Cube,
    inputs: &[Link],
    builder: &mut SubnetBuilder,
    max_arity: u16,
) -> Link {
    let links: Vec<Link> = cube
        .vars()
        .map(|var| inputs[var].invert_if(!cube.polarity(var)))
        .collect();
    match links.len() {
        0 => builder.add_cell(CellSymbol::One, vec![]),
        1 => links[0],
        _ => builder.add_cell_tree(CellSymbol::And, links, max_arity),
    }
}

/// Synthesizes a cover as OR of cubes, expressed as the complement of an
/// AND over complemented cube outputs so the result stays in the
/// AND/inverter basis.
pub fn synth_from_sop(
    sop: &[Cube],
    inputs: &[Link],
    builder: &mut SubnetBuilder,
    max_arity: u16,
) -> Link {
    match sop.len() {
        0 => builder.add_cell(CellSymbol::Zero, vec![]),
        1 => synth_from_cube(&sop[0], inputs, builder, max_arity),
        _ => {
            let links: Vec<Link> = sop
                .iter()
                .map(|cube| !synth_from_cube(cube, inputs, builder, max_arity))
                .collect();
            !builder.add_cell_tree(CellSymbol::And, links, max_arity)
        }
    }
}

/// Minato-Morreale SOP resynthesis.
///
/// Computes an irredundant cover of the view's function under its care,
/// choosing the cheaper polarity, and emits an AND/inverter network.
#[derive(Debug, Default)]
pub struct MmSynthesizer;

impl Resynthesizer for MmSynthesizer {
    fn resynthesize(&self, view: &SubnetView, max_arity: u16) -> Option<Subnet> {
        let (target, dc, inv) = super::function_under_care(view)?;
        let num_vars = target.num_vars();

        // Constants under care are emitted directly.
        if target.is_zero() {
            return Some(SubnetBuilder::make_const(num_vars, inv));
        }
        if (&target | &dc).is_one() {
            return Some(SubnetBuilder::make_const(num_vars, !inv));
        }

        let cover = isop(&target, &dc);
        let mut builder = SubnetBuilder::new();
        let inputs: Vec<Link> = (0..num_vars).map(|_| builder.add_input()).collect();
        let root = synth_from_sop(&cover, &inputs, &mut builder, max_arity);
        builder.add_output(root.invert_if(inv));
        Some(builder.make())
    }
}
