//! Cut-to-library matching.

use silica_cuts::Cut;
use silica_library::SCLibrary;
use silica_subnet::{eval, CellTypeId, Link, SubnetBuilder, SubnetView};
use silica_tt::{p_canonize, TruthTable};
use std::collections::HashMap;

/// A candidate mapping of a cut onto a library cell: which cell, which
/// of its outputs, and the cut leaves permuted into pin order.
#[derive(Clone, Debug)]
pub struct Match {
    /// The matched library cell.
    pub type_id: CellTypeId,
    /// The matched output of the cell.
    pub out: u16,
    /// One link per cell input pin, in pin order.
    pub links: Vec<Link>,
    /// The match realizes the complement of the cut function.
    pub inversion: bool,
}

/// Finds library matches for a cut.
pub trait Matcher {
    /// Returns every match of `cut` against the library.
    fn find_matches(&self, builder: &SubnetBuilder, cut: &Cut) -> Vec<Match>;
}

/// Matches by P-canonical truth table.
///
/// The cut's function is canonized; each library output indexed under the
/// same canonical key yields a match whose links compose the two
/// permutations: canonical variable `i` is cut leaf `τ_cut[i]` and cell
/// pin `τ_cell[i]`, so pin `τ_cell[i]` is fed leaf `τ_cut[i]`.
pub struct PBoolMatcher<'l> {
    library: &'l SCLibrary,
}

impl<'l> PBoolMatcher<'l> {
    /// Creates a matcher over a library.
    pub fn new(library: &'l SCLibrary) -> Self {
        Self { library }
    }

    /// Matches an already-evaluated cut function.
    pub fn match_function(&self, function: &TruthTable, leaves: &[silica_subnet::EntryId]) -> Vec<Match> {
        if function.num_vars() > silica_library::library::MAX_CANON_VARS {
            return Vec::new();
        }
        let (canon, cut_transform) = p_canonize(function);
        let mut matches = Vec::new();
        for &(type_id, out) in self.library.matches_canon(&canon) {
            let cell = self.library.cell(type_id);
            if cell.arity() != leaves.len() {
                continue;
            }
            let cell_perm = &cell.outputs[out as usize].transform.perm;
            let mut links = vec![Link::to(silica_subnet::EntryId::from_raw(0)); leaves.len()];
            for (i, &pin) in cell_perm.iter().enumerate() {
                links[pin as usize] = Link::to(leaves[cut_transform.perm[i] as usize]);
            }
            matches.push(Match {
                type_id,
                out,
                links,
                inversion: false,
            });
        }
        matches
    }
}

impl Matcher for PBoolMatcher<'_> {
    fn find_matches(&self, builder: &SubnetBuilder, cut: &Cut) -> Vec<Match> {
        let leaves = cut.leaf_vec();
        let view = SubnetView::from_cut(builder, &leaves, cut.root);
        let function = eval::evaluate_view(&view).remove(0);
        self.match_function(&function, &leaves)
    }
}

/// Matches by exact truth table (no canonization): library outputs are
/// indexed by a hash of their raw function, and a cut matches only in
/// leaf order.
pub struct FuncMatcher<'l> {
    library: &'l SCLibrary,
    index: HashMap<silica_common::ContentHash, Vec<(CellTypeId, u16)>>,
}

impl<'l> FuncMatcher<'l> {
    /// Builds the raw-function index over a library.
    pub fn new(library: &'l SCLibrary) -> Self {
        let mut index: HashMap<silica_common::ContentHash, Vec<(CellTypeId, u16)>> =
            HashMap::new();
        for cell in library.cells() {
            for (out, output) in cell.outputs.iter().enumerate() {
                index
                    .entry(output.function.content_hash())
                    .or_default()
                    .push((cell.type_id, out as u16));
            }
        }
        Self { library, index }
    }
}

impl Matcher for FuncMatcher<'_> {
    fn find_matches(&self, builder: &SubnetBuilder, cut: &Cut) -> Vec<Match> {
        let leaves = cut.leaf_vec();
        let view = SubnetView::from_cut(builder, &leaves, cut.root);
        let function = eval::evaluate_view(&view).remove(0);
        let key = function.content_hash();
        let mut matches = Vec::new();
        for &(type_id, out) in self.index.get(&key).map(Vec::as_slice).unwrap_or_default() {
            let cell = self.library.cell(type_id);
            if cell.arity() != leaves.len() {
                continue;
            }
            // Hash equality is necessary but not sufficient.
            if cell.outputs[out as usize].function != function {
                continue;
            }
            matches.push(Match {
                type_id,
                out,
                links: leaves.iter().map(|&l| Link::to(l)).collect(),
                inversion: false,
            });
        }
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silica_diagnostics::DiagnosticSink;
    use silica_library::{CellRecord, InputPinRecord, OutputPinRecord, WireLoadSelection};
    use silica_subnet::CellSymbol;
    use silica_tt::compose;

    fn record(name: &str, inputs: &[&str], function: &str) -> CellRecord {
        CellRecord {
            name: name.into(),
            input_pins: inputs
                .iter()
                .map(|n| InputPinRecord {
                    name: (*n).into(),
                    capacitance: 1.0,
                })
                .collect(),
            output_pins: vec![OutputPinRecord {
                name: "Y".into(),
                function: function.into(),
                delay: None,
            }],
            area: 1.0,
            delay: 1.0,
            leakage: 0.1,
        }
    }

    fn library() -> SCLibrary {
        SCLibrary::build(
            vec![
                record("ANDNOT", &["A", "B"], "A & !B"),
                record("XOR2", &["A", "B"], "A ^ B"),
            ],
            vec![],
            WireLoadSelection::default(),
            None,
            &DiagnosticSink::new(),
        )
        .unwrap()
    }

    #[test]
    fn pbool_matches_up_to_permutation() {
        // The network computes ~a & b; ANDNOT computes A & !B, which is
        // the same function with pins swapped.
        let mut builder = SubnetBuilder::new();
        let a = builder.add_input();
        let b = builder.add_input();
        let gate = builder.add_cell(CellSymbol::And, vec![!a, b]);
        builder.add_output(gate);

        let library = library();
        let matcher = PBoolMatcher::new(&library);
        let cut = Cut::new(gate.idx, [a.idx, b.idx]);
        let matches = matcher.find_matches(&builder, &cut);
        let hit = matches
            .iter()
            .find(|m| library.cell(m.type_id).name == "ANDNOT")
            .expect("ANDNOT must match");

        // Verify pin assignment by composing the cell function with the
        // leaf variables the links select.
        let leaves = cut.leaf_vec();
        let fanins: Vec<silica_tt::TruthTable> = hit
            .links
            .iter()
            .map(|l| {
                let var = leaves.iter().position(|&leaf| leaf == l.idx).unwrap();
                silica_tt::TruthTable::nth_var(2, var)
            })
            .collect();
        let cell_fn = &library.cell(hit.type_id).outputs[hit.out as usize].function;
        let realized = compose(cell_fn, &fanins);
        let expected = &!&silica_tt::TruthTable::nth_var(2, 0) & &silica_tt::TruthTable::nth_var(2, 1);
        assert_eq!(realized, expected);
    }

    #[test]
    fn pbool_misses_foreign_functions() {
        let mut builder = SubnetBuilder::new();
        let a = builder.add_input();
        let b = builder.add_input();
        let gate = builder.add_cell(CellSymbol::Or, vec![a, b]);
        builder.add_output(gate);

        let library = library();
        let matcher = PBoolMatcher::new(&library);
        let cut = Cut::new(gate.idx, [a.idx, b.idx]);
        assert!(matcher.find_matches(&builder, &cut).is_empty());
    }

    #[test]
    fn func_matcher_requires_exact_function() {
        let mut builder = SubnetBuilder::new();
        let a = builder.add_input();
        let b = builder.add_input();
        let xor = builder.add_cell(CellSymbol::Xor, vec![a, b]);
        // ~a & b: P-equivalent to ANDNOT but not identical to A & !B in
        // this leaf order (it is !A & B).
        let andnot_rev = builder.add_cell(CellSymbol::And, vec![!a, b]);
        builder.add_output(xor);
        builder.add_output(andnot_rev);

        let library = library();
        let matcher = FuncMatcher::new(&library);

        let xor_cut = Cut::new(xor.idx, [a.idx, b.idx]);
        assert_eq!(matcher.find_matches(&builder, &xor_cut).len(), 1);

        let rev_cut = Cut::new(andnot_rev.idx, [a.idx, b.idx]);
        assert!(
            matcher.find_matches(&builder, &rev_cut).is_empty(),
            "FuncMatcher does not permute pins"
        );
    }
}
