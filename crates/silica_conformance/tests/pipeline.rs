//! End-to-end scenarios: rewrite followed by technology mapping.

use silica_conformance::{
    equivalent, functions_of, mapped_functions_of, run_map, run_rewrite, small_library,
};
use silica_subnet::{CellSymbol, Link, SubnetBuilder};

fn cell_names(
    library: &silica_library::SCLibrary,
    mapped: &silica_subnet::Subnet,
) -> Vec<String> {
    mapped
        .entries()
        .filter_map(|e| match e.cell.symbol {
            CellSymbol::Cell(id) => Some(library.cell(id).name.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn constant_propagation_through_rewrite_and_map() {
    // y = AND(a, ONE): the rewriter collapses the gate, and the mapper
    // either emits a BUF or absorbs the wire into the output.
    let mut builder = SubnetBuilder::new();
    let a = builder.add_input();
    let one = builder.add_cell(CellSymbol::One, vec![]);
    let and = builder.add_cell(CellSymbol::And, vec![a, one]);
    builder.add_output(and);
    let subnet = builder.make();

    let rewritten = run_rewrite(&subnet);
    assert_eq!(rewritten.inner_num(), 0, "the gate and constant are gone");

    let library = small_library();
    let outcome = run_map(&rewritten, &library).unwrap();
    let names = cell_names(&library, &outcome.mapped);
    assert!(
        names.is_empty() || names == vec!["BUF"],
        "wire absorbed or buffered, got {names:?}"
    );
    assert!(equivalent(&rewritten, &outcome.mapped, &library));
}

#[test]
fn rewrite_then_map_preserves_functions() {
    // A redundant network: y1 = (a & b) | (a & b & c), y2 = a ^ c.
    let mut builder = SubnetBuilder::new();
    let a = builder.add_input();
    let b = builder.add_input();
    let c = builder.add_input();
    let ab = builder.add_cell(CellSymbol::And, vec![a, b]);
    let abc = builder.add_cell(CellSymbol::And, vec![ab, c]);
    let or = builder.add_cell(CellSymbol::Or, vec![ab, abc]);
    let xor = builder.add_cell(CellSymbol::Xor, vec![a, c]);
    builder.add_output(or);
    builder.add_output(xor);
    let subnet = builder.make();

    let rewritten = run_rewrite(&subnet);
    assert_eq!(functions_of(&subnet), functions_of(&rewritten));
    assert!(rewritten.inner_num() < subnet.inner_num());

    let library = small_library();
    let outcome = run_map(&rewritten, &library).unwrap();
    assert!(equivalent(&subnet, &outcome.mapped, &library));
}

#[test]
fn mapped_output_contains_only_library_cells() {
    let mut builder = SubnetBuilder::new();
    let inputs: Vec<Link> = (0..4).map(|_| builder.add_input()).collect();
    let n1 = builder.add_cell(CellSymbol::Nand, vec![inputs[0], inputs[1]]);
    let n2 = builder.add_cell(CellSymbol::Nor, vec![inputs[2], inputs[3]]);
    let n3 = builder.add_cell(CellSymbol::Xnor, vec![n1, n2]);
    let n4 = builder.add_cell(CellSymbol::Maj, vec![n1, n2, n3]);
    builder.add_output(n4);
    let subnet = builder.make();

    let library = small_library();
    let outcome = run_map(&subnet, &library).unwrap();
    for entry in outcome.mapped.entries() {
        assert!(
            matches!(
                entry.cell.symbol,
                CellSymbol::Cell(_) | CellSymbol::In | CellSymbol::Out
            ),
            "unmapped symbol {:?} survived",
            entry.cell.symbol
        );
    }
    assert!(equivalent(&subnet, &outcome.mapped, &library));
}

#[test]
fn rewriter_is_idempotent() {
    let mut builder = SubnetBuilder::new();
    let a = builder.add_input();
    let b = builder.add_input();
    let c = builder.add_input();
    let ab = builder.add_cell(CellSymbol::And, vec![a, b]);
    let redundant = builder.add_cell(CellSymbol::And, vec![ab, b]);
    let root = builder.add_cell(CellSymbol::Or, vec![redundant, c]);
    builder.add_output(root);
    let subnet = builder.make();

    let once = run_rewrite(&subnet);
    let twice = run_rewrite(&once);
    assert_eq!(once, twice, "a second rewriting pass must be a no-op");
}

#[test]
fn shared_fanout_survives_the_whole_pipeline() {
    // One node feeds two outputs; everything downstream must keep both
    // functions intact through rewrite and map.
    let mut builder = SubnetBuilder::new();
    let a = builder.add_input();
    let b = builder.add_input();
    let shared = builder.add_cell(CellSymbol::And, vec![a, b]);
    let negated = builder.add_cell(CellSymbol::Not, vec![shared]);
    builder.add_output(shared);
    builder.add_output(negated);
    let subnet = builder.make();

    let rewritten = run_rewrite(&subnet);
    assert_eq!(functions_of(&subnet), functions_of(&rewritten));

    let library = small_library();
    let outcome = run_map(&rewritten, &library).unwrap();
    assert!(equivalent(&subnet, &outcome.mapped, &library));
}
