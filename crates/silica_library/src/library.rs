//! The standard-cell library: loaded cells, canonical function index,
//! and super-cell derivation.

use crate::error::LibraryError;
use crate::formula::parse_formula;
use crate::types::{CellRecord, DelayLut, InputPinRecord, WireLoadModel, WireLoadSelection};
use silica_common::{Arena, Ident, Interner};
use silica_diagnostics::DiagnosticSink;
use silica_subnet::CellTypeId;
use silica_tt::{p_canonize, PTransform, TruthTable};
use std::collections::{HashMap, HashSet};

/// Cells with more inputs than this are skipped at load: the permutation
/// canonizer enumerates the symmetry group and is bounded to 7 inputs.
/// The bound is data-driven; raising the canonizer limit lifts the skip.
pub const MAX_CANON_VARS: usize = 7;

/// One output pin of a loaded cell with its canonized function.
#[derive(Clone, Debug)]
pub struct CellOutput {
    /// Pin name.
    pub name: String,
    /// The function over the cell's input pins, in pin order.
    pub function: TruthTable,
    /// P-canonical representative of `function`.
    pub canon: TruthTable,
    /// Permutation taking `function` to `canon`.
    pub transform: PTransform,
    /// Characterized delay surface for this arc, if any.
    pub delay: Option<DelayLut>,
}

/// A standard cell ready for matching.
#[derive(Clone, Debug)]
pub struct StandardCell {
    /// Unique name.
    pub name: String,
    /// The cell's type id (its index in the library).
    pub type_id: CellTypeId,
    /// Input pins in pin order.
    pub inputs: Vec<InputPinRecord>,
    /// Output pins with canonized functions.
    pub outputs: Vec<CellOutput>,
    /// Cell area.
    pub area: f32,
    /// Nominal delay.
    pub delay: f32,
    /// Leakage power.
    pub leakage: f32,
    /// `true` for derived super-cells.
    pub derived: bool,
}

impl StandardCell {
    /// Returns the arity.
    pub fn arity(&self) -> usize {
        self.inputs.len()
    }
}

/// The library: an arena of cells plus the P-canonical match index and
/// an interned name index.
pub struct SCLibrary {
    cells: Arena<CellTypeId, StandardCell>,
    by_canon: HashMap<TruthTable, Vec<(CellTypeId, u16)>>,
    interner: Interner,
    by_name: HashMap<Ident, CellTypeId>,
    wlms: Vec<WireLoadModel>,
    selection: WireLoadSelection,
    default_wlm: Option<usize>,
    cheapest_inverter: Option<CellTypeId>,
    cheapest_zero: Option<CellTypeId>,
    cheapest_one: Option<CellTypeId>,
}

impl SCLibrary {
    /// Builds a library from loader records.
    ///
    /// Name collisions are fatal. Cells without area (`NaN`), without
    /// outputs, with unparseable functions, or beyond the canonization
    /// bound are skipped with a warning. Super-cells are derived from
    /// two-input cells once the cheapest inverter and constants are
    /// known.
    pub fn build(
        records: Vec<CellRecord>,
        wlms: Vec<WireLoadModel>,
        selection: WireLoadSelection,
        default_wlm: Option<&str>,
        sink: &DiagnosticSink,
    ) -> Result<Self, LibraryError> {
        check_collisions(&records, &wlms)?;

        let default_wlm = default_wlm.and_then(|name| wlms.iter().position(|w| w.name == name));
        let mut library = Self {
            cells: Arena::new(),
            by_canon: HashMap::new(),
            interner: Interner::new(),
            by_name: HashMap::new(),
            wlms,
            selection,
            default_wlm,
            cheapest_inverter: None,
            cheapest_zero: None,
            cheapest_one: None,
        };

        sink.begin_group("loading standard cells");
        for record in records {
            library.load_cell(record, sink);
        }
        sink.end_group();

        library.find_special_cells();
        library.derive_super_cells();
        Ok(library)
    }

    /// Returns the cell with the given type id.
    pub fn cell(&self, id: CellTypeId) -> &StandardCell {
        self.cells.get(id)
    }

    /// Iterates all cells.
    pub fn cells(&self) -> impl Iterator<Item = &StandardCell> {
        self.cells.values()
    }

    /// Returns the number of cells (super-cells included).
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if no cell was loaded.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Returns the `(cell, output)` pairs whose canonical function is
    /// `canon`.
    pub fn matches_canon(&self, canon: &TruthTable) -> &[(CellTypeId, u16)] {
        self.by_canon
            .get(canon)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The cheapest single-input inverting cell, if the library has one.
    pub fn cheapest_inverter(&self) -> Option<CellTypeId> {
        self.cheapest_inverter
    }

    /// The cheapest constant-0 emitter.
    pub fn cheapest_zero(&self) -> Option<CellTypeId> {
        self.cheapest_zero
    }

    /// The cheapest constant-1 emitter.
    pub fn cheapest_one(&self) -> Option<CellTypeId> {
        self.cheapest_one
    }

    /// The wire-load model selected for a design area, falling back to
    /// the default model.
    pub fn wire_load_for_area(&self, area: f32) -> Option<&WireLoadModel> {
        if let Some(name) = self.selection.select(area) {
            if let Some(wlm) = self.wlms.iter().find(|w| w.name == name) {
                return Some(wlm);
            }
        }
        self.default_wlm.map(|i| &self.wlms[i])
    }

    /// Resolves the output functions of a cell applied to fanin tables
    /// (the shape [`eval::evaluate_view_with`] expects).
    ///
    /// [`eval::evaluate_view_with`]: silica_subnet::eval::evaluate_view_with
    pub fn resolve_cell(&self, id: CellTypeId, fanins: &[TruthTable]) -> Vec<TruthTable> {
        let cell = self.cells.get(id);
        cell.outputs
            .iter()
            .map(|out| silica_tt::compose(&out.function, fanins))
            .collect()
    }

    // --- Loading ----------------------------------------------------------

    fn load_cell(&mut self, record: CellRecord, sink: &DiagnosticSink) {
        if record.area.is_nan() {
            sink.warning(format!("cell {} has no area, skipped", record.name));
            return;
        }
        if record.output_pins.is_empty() {
            sink.warning(format!("cell {} has no outputs, skipped", record.name));
            return;
        }
        if record.input_pins.len() > MAX_CANON_VARS {
            sink.warning(format!(
                "cell {} has {} inputs, beyond the canonization bound of {MAX_CANON_VARS}, skipped",
                record.name,
                record.input_pins.len()
            ));
            return;
        }
        if record.delay.is_nan() || record.leakage.is_nan() {
            sink.warning(format!(
                "cell {} has NaN physical properties, skipped",
                record.name
            ));
            return;
        }

        let pin_names: Vec<&str> = record.input_pins.iter().map(|p| p.name.as_str()).collect();
        let mut outputs = Vec::with_capacity(record.output_pins.len());
        for pin in &record.output_pins {
            let function = match parse_formula(&pin.function, &pin_names) {
                Ok(tt) => tt,
                Err(reason) => {
                    sink.warning(format!(
                        "cell {}: function `{}` unsupported ({reason}), cell skipped",
                        record.name, pin.function
                    ));
                    return;
                }
            };
            let (canon, transform) = p_canonize(&function);
            outputs.push(CellOutput {
                name: pin.name.clone(),
                function,
                canon,
                transform,
                delay: pin.delay.clone(),
            });
        }

        self.insert_cell(StandardCell {
            name: record.name,
            type_id: CellTypeId::from_raw(0), // fixed by insert_cell
            inputs: record.input_pins,
            outputs,
            area: record.area,
            delay: record.delay,
            leakage: record.leakage,
            derived: false,
        });
    }

    /// Looks a cell up by name.
    pub fn find_cell(&self, name: &str) -> Option<CellTypeId> {
        let ident = self.interner.get(name)?;
        self.by_name.get(&ident).copied()
    }

    fn insert_cell(&mut self, mut cell: StandardCell) -> CellTypeId {
        let id = self.cells.next_id();
        cell.type_id = id;
        for (out_index, output) in cell.outputs.iter().enumerate() {
            self.by_canon
                .entry(output.canon.clone())
                .or_default()
                .push((id, out_index as u16));
        }
        let ident = self.interner.get_or_intern(&cell.name);
        self.by_name.insert(ident, id);
        self.cells.alloc(cell)
    }

    fn find_special_cells(&mut self) {
        let not_v0 = !&TruthTable::nth_var(1, 0);
        for cell in self.cells.values() {
            if cell.outputs.len() != 1 {
                continue;
            }
            let function = &cell.outputs[0].function;
            let slot = match (cell.arity(), function) {
                (1, f) if *f == not_v0 => &mut self.cheapest_inverter,
                (0, f) if f.is_zero() => &mut self.cheapest_zero,
                (0, f) if f.is_one() => &mut self.cheapest_one,
                _ => continue,
            };
            let cheaper = slot.map_or(true, |prev| {
                cell.area < self.cells.get(prev).area
            });
            if cheaper {
                *slot = Some(cell.type_id);
            }
        }
    }

    /// Derives super-cells: a two-input cell with the cheapest inverter
    /// prepended at one input, or with one input tied to a constant. The
    /// composed function is evaluated and re-canonized.
    fn derive_super_cells(&mut self) {
        let bases: Vec<CellTypeId> = self
            .cells
            .iter()
            .filter(|(_, c)| !c.derived && c.arity() == 2 && c.outputs.len() == 1)
            .map(|(id, _)| id)
            .collect();

        for base_id in bases {
            for input in 0..2u32 {
                if let Some(inv_id) = self.cheapest_inverter {
                    let super_cell = self.inverter_variant(base_id, inv_id, input);
                    self.insert_cell(super_cell);
                }
                for (constant, const_id) in
                    [(false, self.cheapest_zero), (true, self.cheapest_one)]
                {
                    if let Some(const_id) = const_id {
                        let super_cell =
                            self.constant_variant(base_id, const_id, input, constant);
                        self.insert_cell(super_cell);
                    }
                }
            }
        }
    }

    fn inverter_variant(
        &self,
        base_id: CellTypeId,
        inv_id: CellTypeId,
        input: u32,
    ) -> StandardCell {
        let base = self.cells.get(base_id);
        let inv = self.cells.get(inv_id);
        let function = base.outputs[0].function.flip_inputs(1 << input);
        let (canon, transform) = p_canonize(&function);
        StandardCell {
            name: format!("{}__n{}", base.name, input),
            type_id: CellTypeId::from_raw(0),
            inputs: base.inputs.clone(),
            outputs: vec![CellOutput {
                name: base.outputs[0].name.clone(),
                function,
                canon,
                transform,
                delay: None,
            }],
            area: base.area + inv.area,
            delay: base.delay + inv.delay,
            leakage: base.leakage + inv.leakage,
            derived: true,
        }
    }

    fn constant_variant(
        &self,
        base_id: CellTypeId,
        const_id: CellTypeId,
        input: u32,
        constant: bool,
    ) -> StandardCell {
        let base = self.cells.get(base_id);
        let const_cell = self.cells.get(const_id);
        let tied = if constant {
            base.outputs[0].function.cofactor1(input as usize)
        } else {
            base.outputs[0].function.cofactor0(input as usize)
        };
        // Drop the tied pin: the remaining single-input function.
        let function = remove_var(&tied, input as usize);
        let (canon, transform) = p_canonize(&function);
        let kept_pin = base.inputs[1 - input as usize].clone();
        StandardCell {
            name: format!(
                "{}__c{}{}",
                base.name,
                input,
                if constant { '1' } else { '0' }
            ),
            type_id: CellTypeId::from_raw(0),
            inputs: vec![kept_pin],
            outputs: vec![CellOutput {
                name: base.outputs[0].name.clone(),
                function,
                canon,
                transform,
                delay: None,
            }],
            area: base.area + const_cell.area,
            delay: base.delay + const_cell.delay,
            leakage: base.leakage + const_cell.leakage,
            derived: true,
        }
    }
}

/// Removes a variable the table does not depend on, shrinking the arity
/// by one.
fn remove_var(tt: &TruthTable, var: usize) -> TruthTable {
    debug_assert!(!tt.depends_on(var));
    let n = tt.num_vars();
    let mut result = TruthTable::zero(n - 1);
    for m in 0..result.num_bits() {
        let low = m & ((1 << var) - 1);
        let high = (m >> var) << (var + 1);
        if tt.get_bit(high | low) {
            result.set_bit(m, true);
        }
    }
    result
}

fn check_collisions(
    records: &[CellRecord],
    wlms: &[WireLoadModel],
) -> Result<(), LibraryError> {
    let mut cell_names = HashSet::new();
    for record in records {
        if !cell_names.insert(record.name.as_str()) {
            return Err(LibraryError::CellCollision(record.name.clone()));
        }
    }
    let mut wlm_names = HashSet::new();
    for wlm in wlms {
        if !wlm_names.insert(wlm.name.as_str()) {
            return Err(LibraryError::WlmCollision(wlm.name.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OutputPinRecord;

    fn pin(name: &str) -> InputPinRecord {
        InputPinRecord {
            name: name.into(),
            capacitance: 1.0,
        }
    }

    fn simple_cell(name: &str, inputs: &[&str], function: &str, area: f32) -> CellRecord {
        CellRecord {
            name: name.into(),
            input_pins: inputs.iter().map(|n| pin(n)).collect(),
            output_pins: vec![OutputPinRecord {
                name: "Y".into(),
                function: function.into(),
                delay: None,
            }],
            area,
            delay: 1.0,
            leakage: 0.1,
        }
    }

    fn basic_records() -> Vec<CellRecord> {
        vec![
            simple_cell("AND2", &["A", "B"], "A & B", 2.0),
            simple_cell("INV", &["A"], "!A", 1.0),
            simple_cell("TIE0", &[], "0", 0.5),
            simple_cell("TIE1", &[], "1", 0.5),
        ]
    }

    fn build(records: Vec<CellRecord>) -> SCLibrary {
        SCLibrary::build(
            records,
            vec![],
            WireLoadSelection::default(),
            None,
            &DiagnosticSink::new(),
        )
        .unwrap()
    }

    #[test]
    fn loads_and_indexes_cells() {
        let library = build(basic_records());
        let and_tt = &TruthTable::nth_var(2, 0) & &TruthTable::nth_var(2, 1);
        let (canon, _) = p_canonize(&and_tt);
        let matches = library.matches_canon(&canon);
        assert!(!matches.is_empty());
        let (id, out) = matches[0];
        assert_eq!(library.cell(id).name, "AND2");
        assert_eq!(out, 0);
    }

    #[test]
    fn find_cell_by_name() {
        let library = build(basic_records());
        let id = library.find_cell("AND2").unwrap();
        assert_eq!(library.cell(id).name, "AND2");
        assert!(library.find_cell("AND3").is_none());
    }

    #[test]
    fn special_cells_found() {
        let library = build(basic_records());
        let inv = library.cheapest_inverter().unwrap();
        assert_eq!(library.cell(inv).name, "INV");
        assert!(library.cheapest_zero().is_some());
        assert!(library.cheapest_one().is_some());
    }

    #[test]
    fn cell_collision_is_fatal() {
        let records = vec![
            simple_cell("X", &["A"], "A", 1.0),
            simple_cell("X", &["A"], "!A", 1.0),
        ];
        let result = SCLibrary::build(
            records,
            vec![],
            WireLoadSelection::default(),
            None,
            &DiagnosticSink::new(),
        );
        assert!(matches!(result, Err(LibraryError::CellCollision(name)) if name == "X"));
    }

    #[test]
    fn nan_area_cell_skipped_with_warning() {
        let sink = DiagnosticSink::new();
        let mut bad = simple_cell("BAD", &["A"], "A", f32::NAN);
        bad.area = f32::NAN;
        let library = SCLibrary::build(
            vec![bad],
            vec![],
            WireLoadSelection::default(),
            None,
            &sink,
        )
        .unwrap();
        assert!(library.is_empty());
        assert!(sink
            .diagnostics()
            .iter()
            .any(|d| d.message.contains("no area")));
    }

    #[test]
    fn wide_cell_skipped() {
        let sink = DiagnosticSink::new();
        let wide = simple_cell(
            "WIDE",
            &["A", "B", "C", "D", "E", "F", "G", "H"],
            "A & B & C & D & E & F & G & H",
            1.0,
        );
        let library = SCLibrary::build(
            vec![wide],
            vec![],
            WireLoadSelection::default(),
            None,
            &sink,
        )
        .unwrap();
        assert!(library.is_empty());
        assert!(sink
            .diagnostics()
            .iter()
            .any(|d| d.message.contains("canonization bound")));
    }

    #[test]
    fn super_cells_derived_with_composed_functions() {
        let library = build(basic_records());
        // AND2 with input 0 inverted computes ~a & b.
        let variant = library
            .cells()
            .find(|c| c.name == "AND2__n0")
            .expect("inverter super-cell");
        assert!(variant.derived);
        assert!((variant.area - 3.0).abs() < 1e-6);
        let expected = &!&TruthTable::nth_var(2, 0) & &TruthTable::nth_var(2, 1);
        assert_eq!(variant.outputs[0].function, expected);
        // Its canonical form reproduces through the stored transform.
        assert_eq!(
            variant.outputs[0].transform.apply(&variant.outputs[0].function),
            variant.outputs[0].canon
        );
    }

    #[test]
    fn constant_super_cells_shrink_arity() {
        let library = build(basic_records());
        // AND2 with input 1 tied to 1 is a buffer on the other pin.
        let variant = library
            .cells()
            .find(|c| c.name == "AND2__c11")
            .expect("constant super-cell");
        assert_eq!(variant.arity(), 1);
        assert_eq!(variant.outputs[0].function, TruthTable::nth_var(1, 0));
        // Tied to 0 it is the constant 0.
        let variant = library.cells().find(|c| c.name == "AND2__c10").unwrap();
        assert!(variant.outputs[0].function.is_zero());
    }

    #[test]
    fn resolve_cell_composes() {
        let library = build(basic_records());
        let and_id = library.cells().find(|c| c.name == "AND2").unwrap().type_id;
        let a = TruthTable::nth_var(2, 0);
        let b = TruthTable::nth_var(2, 1);
        let result = library.resolve_cell(and_id, &[a.clone(), b.clone()]);
        assert_eq!(result, vec![&a & &b]);
    }

    #[test]
    fn multi_output_cell_indexed_per_output() {
        let ha = CellRecord {
            name: "HA".into(),
            input_pins: vec![pin("A"), pin("B")],
            output_pins: vec![
                OutputPinRecord {
                    name: "S".into(),
                    function: "A ^ B".into(),
                    delay: None,
                },
                OutputPinRecord {
                    name: "CO".into(),
                    function: "A & B".into(),
                    delay: None,
                },
            ],
            area: 4.0,
            delay: 1.5,
            leakage: 0.2,
        };
        let library = build(vec![ha]);
        let xor_tt = &TruthTable::nth_var(2, 0) ^ &TruthTable::nth_var(2, 1);
        let and_tt = &TruthTable::nth_var(2, 0) & &TruthTable::nth_var(2, 1);
        let (xor_canon, _) = p_canonize(&xor_tt);
        let (and_canon, _) = p_canonize(&and_tt);
        let xor_matches = library.matches_canon(&xor_canon);
        let and_matches = library.matches_canon(&and_canon);
        assert_eq!(xor_matches.len(), 1);
        assert_eq!(and_matches.len(), 1);
        assert_eq!(xor_matches[0].1, 0);
        assert_eq!(and_matches[0].1, 1);
    }

    #[test]
    fn wlm_fallback_to_default() {
        let wlms = vec![WireLoadModel {
            name: "default".into(),
            resistance: 0.1,
            capacitance: 0.2,
            slope: 1.0,
            fanout_length: vec![(1, 5.0)],
        }];
        let library = SCLibrary::build(
            basic_records(),
            wlms,
            WireLoadSelection::default(),
            Some("default"),
            &DiagnosticSink::new(),
        )
        .unwrap();
        let wlm = library.wire_load_for_area(123.0).unwrap();
        assert_eq!(wlm.name, "default");
    }
}
