//! End-to-end helpers for exercising the full synthesis pipeline in
//! tests: a small in-code standard-cell library, pass drivers, and an
//! equivalence oracle over pairs of subnets.

#![warn(missing_docs)]

use silica_diagnostics::DiagnosticSink;
use silica_library::{
    CellRecord, InputPinRecord, OutputPinRecord, SCLibrary, WireLoadSelection,
};
use silica_map::{
    premap, Basis, Criterion, MapOutcome, MapperConfig, PBoolMatcher, TechMapper,
};
use silica_opt::rewriter::cost_cells;
use silica_opt::{MmSynthesizer, Rewriter, RewriterConfig, SubnetTransformer};
use silica_subnet::{eval, Subnet, SubnetBuilder, SubnetView};
use silica_tt::TruthTable;

/// Builds a loader record for a single-output cell.
pub fn cell_record(
    name: &str,
    inputs: &[&str],
    function: &str,
    area: f32,
    delay: f32,
) -> CellRecord {
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
        area,
        delay,
        leakage: 0.1,
    }
}

/// A small complete library: AND/XOR/INV/BUF gates plus tie cells.
pub fn small_library() -> SCLibrary {
    SCLibrary::build(
        vec![
            cell_record("AND2", &["A", "B"], "A & B", 2.0, 1.0),
            cell_record("OR2", &["A", "B"], "A | B", 2.0, 1.0),
            cell_record("NAND2", &["A", "B"], "!(A & B)", 1.5, 0.8),
            cell_record("NOR2", &["A", "B"], "!(A | B)", 1.5, 0.8),
            cell_record("XOR2", &["A", "B"], "A ^ B", 3.0, 1.5),
            cell_record("INV", &["A"], "!A", 1.0, 0.5),
            cell_record("BUF", &["A"], "A", 1.0, 0.5),
            cell_record("TIE0", &[], "0", 0.5, 0.0),
            cell_record("TIE1", &[], "1", 0.5, 0.0),
        ],
        vec![],
        WireLoadSelection::default(),
        None,
        &DiagnosticSink::new(),
    )
    .expect("the built-in library is collision-free")
}

/// Runs the SOP rewriter over a snapshot and returns the result.
pub fn run_rewrite(subnet: &Subnet) -> Subnet {
    let mut builder = SubnetBuilder::from_subnet(subnet);
    let synthesizer = MmSynthesizer;
    let rewriter = Rewriter::new(
        "conformance-rewrite",
        &synthesizer,
        RewriterConfig::default(),
        cost_cells,
    );
    rewriter.transform(&mut builder, &DiagnosticSink::new());
    builder
        .validate()
        .expect("the rewriter preserves builder invariants");
    builder.make()
}

/// Premaps into AIG and maps against the library.
pub fn run_map(subnet: &Subnet, library: &SCLibrary) -> Result<MapOutcome, silica_map::MapError> {
    let premapped = premap(subnet, Basis::Aig);
    let matcher = PBoolMatcher::new(library);
    let mapper = TechMapper::new(
        "conformance-map",
        library,
        &matcher,
        Criterion::default(),
        MapperConfig::default(),
    );
    mapper.map(&premapped, &DiagnosticSink::new())
}

/// Evaluates a technology-independent snapshot's output functions.
pub fn functions_of(subnet: &Subnet) -> Vec<TruthTable> {
    eval::evaluate_subnet(subnet)
}

/// Evaluates a mapped snapshot through the library's cell functions.
pub fn mapped_functions_of(subnet: &Subnet, library: &SCLibrary) -> Vec<TruthTable> {
    let builder = SubnetBuilder::from_subnet(subnet);
    let view = SubnetView::whole(&builder);
    let resolver = |type_id: silica_subnet::CellTypeId, fanins: &[TruthTable]| {
        library.resolve_cell(type_id, fanins)
    };
    eval::evaluate_view_with(&view, Some(&resolver))
}

/// The equivalence oracle: `true` when both subnets compute the same
/// output functions over the same inputs. `b` may be mapped; its cells
/// resolve through `library`.
pub fn equivalent(a: &Subnet, b: &Subnet, library: &SCLibrary) -> bool {
    a.in_num() == b.in_num()
        && a.out_num() == b.out_num()
        && functions_of(a) == mapped_functions_of(b, library)
}
