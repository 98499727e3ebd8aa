//! Premapping into a target logic basis.
//!
//! The mapper expects its input expressed over a restricted gate basis;
//! the premapper lowers arbitrary logic symbols into one of the four
//! standard bases, expressing the dropped symbols structurally (inverted
//! links are free in every basis).

use silica_subnet::{CellSymbol, Link, Subnet, SubnetBuilder};

/// The supported target bases.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Basis {
    /// AND + inverters.
    Aig,
    /// AND + XOR + inverters.
    Xag,
    /// MAJ + inverters.
    Mig,
    /// MAJ + XOR + inverters.
    Xmg,
}

impl Basis {
    fn has_xor(self) -> bool {
        matches!(self, Basis::Xag | Basis::Xmg)
    }

    fn has_maj(self) -> bool {
        matches!(self, Basis::Mig | Basis::Xmg)
    }
}

/// Lowers a subnet into the basis, returning a fresh builder.
pub fn premap(subnet: &Subnet, basis: Basis) -> SubnetBuilder {
    let mut builder = SubnetBuilder::new();
    let mut xlat: Vec<Link> = Vec::with_capacity(subnet.len());

    for entry in subnet.entries() {
        let cell = &entry.cell;
        let fanins: Vec<Link> = cell
            .links
            .iter()
            .map(|l| xlat[l.idx.index()].invert_if(l.inv))
            .collect();
        let link = match cell.symbol {
            CellSymbol::In => builder.add_input(),
            CellSymbol::Out => builder.add_output(fanins[0]),
            CellSymbol::Zero => builder.add_cell(CellSymbol::Zero, vec![]),
            CellSymbol::One => builder.add_cell(CellSymbol::One, vec![]),
            CellSymbol::Buf => fanins[0],
            CellSymbol::Not => !fanins[0],
            CellSymbol::And => lower_and(&mut builder, basis, fanins),
            CellSymbol::Nand => !lower_and(&mut builder, basis, fanins),
            CellSymbol::Or => lower_or(&mut builder, basis, fanins),
            CellSymbol::Nor => !lower_or(&mut builder, basis, fanins),
            CellSymbol::Xor => lower_xor(&mut builder, basis, fanins),
            CellSymbol::Xnor => !lower_xor(&mut builder, basis, fanins),
            CellSymbol::Maj => lower_maj(&mut builder, basis, fanins),
            CellSymbol::Cell(_) => {
                panic!("premapping expects a technology-independent subnet")
            }
        };
        xlat.push(link);
        if let Some(flop) = entry.flop {
            builder.set_flop(link.idx, flop);
        }
    }
    builder
}

fn and2(builder: &mut SubnetBuilder, basis: Basis, a: Link, b: Link) -> Link {
    if basis.has_maj() {
        let zero = builder.add_cell(CellSymbol::Zero, vec![]);
        builder.add_cell(CellSymbol::Maj, vec![a, b, zero])
    } else {
        builder.add_cell(CellSymbol::And, vec![a, b])
    }
}

fn lower_and(builder: &mut SubnetBuilder, basis: Basis, fanins: Vec<Link>) -> Link {
    fanins
        .into_iter()
        .reduce(|acc, link| and2(builder, basis, acc, link))
        .expect("AND has fanins")
}

fn lower_or(builder: &mut SubnetBuilder, basis: Basis, fanins: Vec<Link>) -> Link {
    if basis.has_maj() {
        return fanins
            .into_iter()
            .reduce(|acc, link| {
                let one = builder.add_cell(CellSymbol::One, vec![]);
                builder.add_cell(CellSymbol::Maj, vec![acc, link, one])
            })
            .expect("OR has fanins");
    }
    // a | b = ~(~a & ~b)
    let inverted: Vec<Link> = fanins.into_iter().map(|l| !l).collect();
    !lower_and(builder, basis, inverted)
}

fn lower_xor(builder: &mut SubnetBuilder, basis: Basis, fanins: Vec<Link>) -> Link {
    if basis.has_xor() {
        return fanins
            .into_iter()
            .reduce(|acc, link| builder.add_cell(CellSymbol::Xor, vec![acc, link]))
            .expect("XOR has fanins");
    }
    // a ^ b = ~(~(a & ~b) & ~(~a & b))
    fanins
        .into_iter()
        .reduce(|a, b| {
            let left = and2(builder, basis, a, !b);
            let right = and2(builder, basis, !a, b);
            !and2(builder, basis, !left, !right)
        })
        .expect("XOR has fanins")
}

fn lower_maj(builder: &mut SubnetBuilder, basis: Basis, fanins: Vec<Link>) -> Link {
    assert_eq!(fanins.len(), 3, "MAJ is three-input");
    if basis.has_maj() {
        return builder.add_cell(CellSymbol::Maj, fanins);
    }
    // maj(a,b,c) = ab | ac | bc = ~(~(ab) & ~(ac) & ~(bc))
    let ab = and2(builder, basis, fanins[0], fanins[1]);
    let ac = and2(builder, basis, fanins[0], fanins[2]);
    let bc = and2(builder, basis, fanins[1], fanins[2]);
    let left = and2(builder, basis, !ab, !ac);
    !and2(builder, basis, left, !bc)
}
