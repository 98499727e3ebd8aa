//! Truth-table evaluation of views and snapshots.

use crate::builder::SubnetBuilder;
use crate::cell::CellSymbol;
use crate::subnet::Subnet;
use crate::view::SubnetView;
use crate::walker::{Visit, Walker};
use crate::{CellTypeId, EntryId};
use silica_tt::{tt6, TruthTable};
use std::collections::HashMap;

/// Resolves the output functions of a library cell from its fanin tables.
pub type CellResolver<'r> = dyn Fn(CellTypeId, &[TruthTable]) -> Vec<TruthTable> + 'r;

/// Evaluates the truth tables of a view's outputs in its input variables.
///
/// Views of at most six inputs take a packed-`u64` fast path. Library
/// `Cell` symbols are rejected; use
/// [`evaluate_view_with`] when the view can contain mapped cells.
pub fn evaluate_view(view: &SubnetView) -> Vec<TruthTable> {
    evaluate_view_with(view, None)
}

/// Evaluates a view, resolving `Cell` symbols through `resolver`.
pub fn evaluate_view_with(view: &SubnetView, resolver: Option<&CellResolver>) -> Vec<TruthTable> {
    let num_vars = view.in_num();
    if num_vars <= 6 && resolver.is_none() {
        return evaluate_packed(view, num_vars);
    }
    evaluate_dynamic(view, num_vars, resolver)
}

fn evaluate_packed(view: &SubnetView, num_vars: usize) -> Vec<TruthTable> {
    let mut tables: HashMap<EntryId, u64> = HashMap::new();
    let var_of: HashMap<EntryId, usize> = view
        .mapping()
        .inputs
        .iter()
        .enumerate()
        .map(|(i, &e)| (e, i))
        .collect();

    let mut walker = Walker::new(view);
    let mut post = |builder: &SubnetBuilder, visit: Visit| {
        let value = if visit.is_in {
            // Constants stay constant even when listed as boundary
            // leaves (cut leaves may be ZERO/ONE entries).
            match builder.cell(visit.entry).symbol {
                CellSymbol::Zero => 0,
                CellSymbol::One => tt6::mask(num_vars),
                _ => tt6::var(num_vars, var_of[&visit.entry]),
            }
        } else {
            let cell = builder.cell(visit.entry);
            let fanins: Vec<u64> = cell
                .links
                .iter()
                .map(|link| {
                    let raw = tables[&link.idx];
                    if link.inv {
                        tt6::not(raw, num_vars)
                    } else {
                        raw
                    }
                })
                .collect();
            cell.symbol.eval_words(&fanins, num_vars)
        };
        tables.insert(visit.entry, value);
        true
    };
    let completed = walker.run_forward(None, Some(&mut post), false);
    assert!(completed, "evaluation visitors never abort");

    view.mapping()
        .outputs
        .iter()
        .map(|out| tt6::to_table(tables[out], num_vars))
        .collect()
}

fn evaluate_dynamic(
    view: &SubnetView,
    num_vars: usize,
    resolver: Option<&CellResolver>,
) -> Vec<TruthTable> {
    // Per-entry, per-output-port tables.
    let mut tables: HashMap<EntryId, Vec<TruthTable>> = HashMap::new();
    let var_of: HashMap<EntryId, usize> = view
        .mapping()
        .inputs
        .iter()
        .enumerate()
        .map(|(i, &e)| (e, i))
        .collect();

    let mut walker = Walker::new(view);
    let mut post = |builder: &SubnetBuilder, visit: Visit| {
        let value = if visit.is_in {
            match builder.cell(visit.entry).symbol {
                CellSymbol::Zero => vec![TruthTable::zero(num_vars)],
                CellSymbol::One => vec![TruthTable::one(num_vars)],
                _ => vec![TruthTable::nth_var(num_vars, var_of[&visit.entry])],
            }
        } else {
            let cell = builder.cell(visit.entry);
            let fanins: Vec<TruthTable> = cell
                .links
                .iter()
                .map(|link| {
                    let src = &tables[&link.idx][link.out as usize];
                    if link.inv {
                        !src
                    } else {
                        src.clone()
                    }
                })
                .collect();
            match cell.symbol {
                CellSymbol::Cell(type_id) => {
                    let resolver = resolver
                        .expect("a resolver is required to evaluate library cells");
                    resolver(type_id, &fanins)
                }
                symbol => vec![symbol.eval_tables(&fanins, num_vars)],
            }
        };
        tables.insert(visit.entry, value);
        true
    };
    let completed = walker.run_forward(None, Some(&mut post), false);
    assert!(completed, "evaluation visitors never abort");

    view.mapping()
        .outputs
        .iter()
        .map(|out| tables[out][0].clone())
        .collect()
}

/// Evaluates the outputs of an immutable snapshot in its input variables.
///
/// Logic symbols only; mapped snapshots need a builder view and a
/// resolver.
pub fn evaluate_subnet(subnet: &Subnet) -> Vec<TruthTable> {
    let num_vars = subnet.in_num() as usize;
    let mut tables: Vec<TruthTable> = Vec::with_capacity(subnet.len());
    let mut inputs_seen = 0usize;
    let mut outputs = Vec::with_capacity(subnet.out_num() as usize);
    for entry in subnet.entries() {
        let cell = &entry.cell;
        let table = match cell.symbol {
            CellSymbol::In => {
                let tt = TruthTable::nth_var(num_vars, inputs_seen);
                inputs_seen += 1;
                tt
            }
            _ => {
                let fanins: Vec<TruthTable> = cell
                    .links
                    .iter()
                    .map(|link| {
                        let src = &tables[link.idx.index()];
                        if link.inv {
                            !src
                        } else {
                            src.clone()
                        }
                    })
                    .collect();
                cell.symbol.eval_tables(&fanins, num_vars)
            }
        };
        if cell.is_out() {
            outputs.push(table.clone());
        }
        tables.push(table);
    }
    outputs
}
