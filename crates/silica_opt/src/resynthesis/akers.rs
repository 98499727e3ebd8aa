//! Akers majority-only synthesis via the unitized table.

use crate::transform::Resynthesizer;
use silica_subnet::{eval, CellSymbol, Link, Subnet, SubnetBuilder, SubnetView};
use silica_tt::{isop, TruthTable};

/// What a unitized-table column stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Source {
    Var(usize),
    NotVar(usize),
    Zero,
    One,
    /// A MAJ gate already added to the network.
    Gate,
}

#[derive(Clone, Debug)]
struct Column {
    source: Source,
    link: Option<Link>,
    bits: Vec<bool>,
}

/// The unitized table: one row per care minterm, one column per available
/// signal. A column entry is `true` where the signal agrees with the
/// target function; an all-true column realizes the function.
struct UnitizedTable {
    columns: Vec<Column>,
}

impl UnitizedTable {
    fn initialize(func: &TruthTable, care: &TruthTable) -> Self {
        let num_vars = func.num_vars();
        let rows: Vec<usize> = (0..func.num_bits())
            .filter(|&m| care.get_bit(m))
            .collect();
        let mut columns = Vec::with_capacity(2 * num_vars + 2);
        for var in 0..num_vars {
            let bits = rows
                .iter()
                .map(|&m| ((m >> var) & 1 == 1) == func.get_bit(m))
                .collect();
            columns.push(Column {
                source: Source::Var(var),
                link: None,
                bits,
            });
            let bits = rows
                .iter()
                .map(|&m| ((m >> var) & 1 == 0) == func.get_bit(m))
                .collect();
            columns.push(Column {
                source: Source::NotVar(var),
                link: None,
                bits,
            });
        }
        columns.push(Column {
            source: Source::Zero,
            link: None,
            bits: rows.iter().map(|&m| !func.get_bit(m)).collect(),
        });
        columns.push(Column {
            source: Source::One,
            link: None,
            bits: rows.iter().map(|&m| func.get_bit(m)).collect(),
        });
        Self { columns }
    }

    fn num_columns(&self) -> usize {
        self.columns.len()
    }

    fn solved(&self) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.bits.iter().all(|&b| b))
    }

    /// Removes duplicate and dominated columns (a column whose agreement
    /// set is contained in another's carries no information).
    fn reduce(&mut self) {
        let snapshot = self.columns.clone();
        let mut keep = vec![true; snapshot.len()];
        for i in 0..snapshot.len() {
            if !keep[i] {
                continue;
            }
            for j in 0..snapshot.len() {
                if i == j || !keep[j] {
                    continue;
                }
                let i_subset_j = snapshot[i]
                    .bits
                    .iter()
                    .zip(&snapshot[j].bits)
                    .all(|(&a, &b)| !a || b);
                if i_subset_j {
                    let equal = snapshot[i].bits == snapshot[j].bits;
                    if !equal || i > j {
                        keep[i] = false;
                        break;
                    }
                }
            }
        }
        let mut index = 0;
        self.columns.retain(|_| {
            let kept = keep[index];
            index += 1;
            kept
        });
    }

    fn majority_bits(&self, a: usize, b: usize, c: usize) -> Vec<bool> {
        self.columns[a]
            .bits
            .iter()
            .zip(&self.columns[b].bits)
            .zip(&self.columns[c].bits)
            .map(|((&x, &y), &z)| (x && y) || (x && z) || (y && z))
            .collect()
    }
}

/// Synthesizes a MAJ-only network by the unitized-table algorithm.
///
/// Gates are picked greedily: the MAJ of three columns whose agreement
/// column dominates the most existing columns. When no gate makes
/// progress the cover falls back to a MAJ-expressed SOP
/// (`AND(a,b) = MAJ(a,b,0)`, `OR(a,b) = MAJ(a,b,1)`), which always
/// terminates.
#[derive(Debug, Default)]
pub struct AkersSynthesizer;

impl Resynthesizer for AkersSynthesizer {
    fn resynthesize(&self, view: &SubnetView, max_arity: u16) -> Option<Subnet> {
        assert!(max_arity >= 3, "MAJ gates are three-input");
        if view.out_num() != 1 {
            return None;
        }
        let func = eval::evaluate_view(view).pop()?;
        let num_vars = func.num_vars();
        let care = view
            .care()
            .cloned()
            .unwrap_or_else(|| TruthTable::one(num_vars));
        if care.is_zero() {
            return Some(SubnetBuilder::make_const(num_vars, false));
        }
        let on = &func & &care;
        if on.is_zero() {
            return Some(SubnetBuilder::make_const(num_vars, false));
        }
        if on == care {
            return Some(SubnetBuilder::make_const(num_vars, true));
        }

        run(&func, &care)
    }
}

fn run(func: &TruthTable, care: &TruthTable) -> Option<Subnet> {
    let num_vars = func.num_vars();
    let mut builder = SubnetBuilder::new();
    let inputs: Vec<Link> = (0..num_vars).map(|_| builder.add_input()).collect();

    let mut table = UnitizedTable::initialize(func, care);
    table.reduce();

    let mut iterations = 0usize;
    let bound = 4 * table.num_columns().max(8);
    loop {
        if let Some(solved) = table.solved() {
            let link = column_link(&mut builder, &inputs, &table.columns[solved]);
            builder.add_output(link);
            return Some(builder.make());
        }
        if table.num_columns() <= 3 {
            break;
        }
        iterations += 1;
        if iterations > bound {
            return Some(sop_fallback(func, care));
        }

        let Some((a, b, c)) = best_gate(&table) else {
            return Some(sop_fallback(func, care));
        };
        add_gate(&mut builder, &inputs, &mut table, a, b, c);
        table.reduce();
    }

    // Three (or fewer) columns remain: close with one final MAJ.
    match table.num_columns() {
        1 => {
            let link = column_link(&mut builder, &inputs, &table.columns[0]);
            builder.add_output(link);
        }
        3 => {
            add_gate(&mut builder, &inputs, &mut table, 0, 1, 2);
            let last = table.columns.last().unwrap();
            if !last.bits.iter().all(|&b| b) {
                return Some(sop_fallback(func, care));
            }
            let link = last.link.expect("gate columns carry links");
            builder.add_output(link);
        }
        _ => return Some(sop_fallback(func, care)),
    }
    Some(builder.make())
}

/// Picks the gate whose majority column dominates the most columns; ties
/// broken by the densest majority column.
fn best_gate(table: &UnitizedTable) -> Option<(usize, usize, usize)> {
    let n = table.num_columns();
    let mut best: Option<((usize, usize), (usize, usize, usize))> = None;
    for a in 0..n {
        for b in (a + 1)..n {
            for c in (b + 1)..n {
                let maj = table.majority_bits(a, b, c);
                let dominated = table
                    .columns
                    .iter()
                    .enumerate()
                    .filter(|&(i, col)| {
                        i != a
                            && i != b
                            && i != c
                            && col.bits.iter().zip(&maj).all(|(&x, &m)| !x || m)
                    })
                    .count();
                let ones = maj.iter().filter(|&&m| m).count();
                let score = (dominated, ones);
                if best.as_ref().map_or(true, |(s, _)| score > *s) && dominated > 0 {
                    best = Some((score, (a, b, c)));
                }
            }
        }
    }
    best.map(|(_, gate)| gate)
}

fn add_gate(
    builder: &mut SubnetBuilder,
    inputs: &[Link],
    table: &mut UnitizedTable,
    a: usize,
    b: usize,
    c: usize,
) {
    let la = column_link(builder, inputs, &table.columns[a]);
    let lb = column_link(builder, inputs, &table.columns[b]);
    let lc = column_link(builder, inputs, &table.columns[c]);
    let gate = builder.add_cell(CellSymbol::Maj, vec![la, lb, lc]);
    let bits = table.majority_bits(a, b, c);
    table.columns.push(Column {
        source: Source::Gate,
        link: Some(gate),
        bits,
    });
}

fn column_link(builder: &mut SubnetBuilder, inputs: &[Link], column: &Column) -> Link {
    match column.source {
        Source::Var(v) => inputs[v],
        Source::NotVar(v) => !inputs[v],
        Source::Zero => builder.add_cell(CellSymbol::Zero, vec![]),
        Source::One => builder.add_cell(CellSymbol::One, vec![]),
        Source::Gate => column.link.expect("gate columns carry links"),
    }
}

/// MAJ-expressed SOP: `AND(a,b) = MAJ(a,b,0)`, `OR(a,b) = MAJ(a,b,1)`.
fn sop_fallback(func: &TruthTable, care: &TruthTable) -> Subnet {
    let num_vars = func.num_vars();
    let mut builder = SubnetBuilder::new();
    let inputs: Vec<Link> = (0..num_vars).map(|_| builder.add_input()).collect();
    let on = func & care;
    let dc = !care;
    let cover = isop(&on, &dc);

    if cover.is_empty() {
        return SubnetBuilder::make_const(num_vars, false);
    }

    // Constant voters are created only when a gate needs them; unused
    // constants would survive as junk cells in the snapshot.
    let need_zero = cover.iter().any(|c| c.literal_count() >= 2);
    let need_one = cover.len() >= 2 || cover.iter().any(|c| c.literal_count() == 0);
    let zero = need_zero.then(|| builder.add_cell(CellSymbol::Zero, vec![]));
    let one = need_one.then(|| builder.add_cell(CellSymbol::One, vec![]));
    let maj_and = |builder: &mut SubnetBuilder, x: Link, y: Link| {
        builder.add_cell(CellSymbol::Maj, vec![x, y, zero.expect("zero voter")])
    };
    let maj_or = |builder: &mut SubnetBuilder, x: Link, y: Link| {
        builder.add_cell(CellSymbol::Maj, vec![x, y, one.expect("one voter")])
    };

    let mut cube_links = Vec::with_capacity(cover.len());
    for cube in &cover {
        let literals: Vec<Link> = cube
            .vars()
            .map(|var| inputs[var].invert_if(!cube.polarity(var)))
            .collect();
        let link = match literals.len() {
            0 => one.expect("one voter"),
            _ => literals[1..]
                .iter()
                .fold(literals[0], |acc, &lit| maj_and(&mut builder, acc, lit)),
        };
        cube_links.push(link);
    }
    let root = cube_links[1..]
        .iter()
        .fold(cube_links[0], |acc, &link| maj_or(&mut builder, acc, link));
    builder.add_output(root);
    builder.make()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_maj_only(subnet: &Subnet) {
        for entry in subnet.entries() {
            assert!(
                matches!(
                    entry.cell.symbol,
                    CellSymbol::In
                        | CellSymbol::Out
                        | CellSymbol::Maj
                        | CellSymbol::Zero
                        | CellSymbol::One
                ),
                "non-MAJ cell {:?}",
                entry.cell.symbol
            );
        }
    }

    fn synth_and_check(builder: &SubnetBuilder, root: silica_subnet::EntryId) {
        let view = SubnetView::cone(builder, root);
        let expected = eval::evaluate_view(&view);
        let rhs = AkersSynthesizer.resynthesize(&view, 3).expect("synthesizable");
        assert_maj_only(&rhs);
        let actual = eval::evaluate_subnet(&rhs);
        assert_eq!(actual, expected);
    }

    #[test]
    fn majority_itself_is_one_gate() {
        let mut builder = SubnetBuilder::new();
        let a = builder.add_input();
        let b = builder.add_input();
        let c = builder.add_input();
        let maj = builder.add_cell(CellSymbol::Maj, vec![a, b, c]);
        builder.add_output(maj);

        let view = SubnetView::cone(&builder, maj.idx);
        let rhs = AkersSynthesizer.resynthesize(&view, 3).unwrap();
        assert_maj_only(&rhs);
        let actual = eval::evaluate_subnet(&rhs);
        let expected = eval::evaluate_view(&view);
        assert_eq!(actual, expected);
    }

    #[test]
    fn and_synthesizes_as_maj() {
        let mut builder = SubnetBuilder::new();
        let a = builder.add_input();
        let b = builder.add_input();
        let and = builder.add_cell(CellSymbol::And, vec![a, b]);
        builder.add_output(and);
        synth_and_check(&builder, and.idx);
    }

    #[test]
    fn xor_synthesizes_equivalently() {
        let mut builder = SubnetBuilder::new();
        let a = builder.add_input();
        let b = builder.add_input();
        let xor = builder.add_cell(CellSymbol::Xor, vec![a, b]);
        builder.add_output(xor);
        synth_and_check(&builder, xor.idx);
    }

    #[test]
    fn three_var_functions_roundtrip() {
        // A spread of 3-var functions driven through the synthesizer.
        for bits in [0x96u64, 0xE8, 0x17, 0x6A, 0xFE, 0x01, 0x80] {
            let func = TruthTable::from_u64(bits, 3);
            let mut builder = SubnetBuilder::new();
            let inputs: Vec<Link> = (0..3).map(|_| builder.add_input()).collect();
            // Build the function as a flat SOP so a cone view exists.
            let cover = isop(&func, &TruthTable::zero(3));
            let root = crate::resynthesis::sop::synth_from_sop(
                &cover, &inputs, &mut builder, 8,
            );
            let out = builder.add_output(root);

            let view = SubnetView::cone(&builder, out.idx);
            let rhs = AkersSynthesizer.resynthesize(&view, 3).unwrap();
            assert_maj_only(&rhs);
            let actual = eval::evaluate_subnet(&rhs);
            assert_eq!(actual[0], func, "function {bits:#x}");
        }
    }

    #[test]
    fn care_limits_agreement() {
        // f = XOR(a, b) with care excluding minterm 3: any network equal
        // on the remaining minterms passes.
        let mut builder = SubnetBuilder::new();
        let a = builder.add_input();
        let b = builder.add_input();
        let xor = builder.add_cell(CellSymbol::Xor, vec![a, b]);
        builder.add_output(xor);

        let mut care = TruthTable::one(2);
        care.set_bit(3, false);
        let mut view = SubnetView::from_cut(&builder, &[a.idx, b.idx], xor.idx);
        view.set_care(care.clone());

        let rhs = AkersSynthesizer.resynthesize(&view, 3).unwrap();
        assert_maj_only(&rhs);
        let actual = eval::evaluate_subnet(&rhs);
        let f = &TruthTable::nth_var(2, 0) ^ &TruthTable::nth_var(2, 1);
        assert_eq!(&actual[0] & &care, &f & &care);
    }

    #[test]
    fn sop_fallback_is_maj_only_and_correct() {
        let func = TruthTable::from_u64(0x1E, 3);
        let care = TruthTable::one(3);
        let subnet = sop_fallback(&func, &care);
        assert_maj_only(&subnet);
        let actual = eval::evaluate_subnet(&subnet);
        assert_eq!(actual[0], func);
    }
}
