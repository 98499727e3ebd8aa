//! Lazy refactoring: per-pass candidate collection and conflict-graph
//! selection.

use crate::transform::{Resynthesizer, SubnetTransformer};
use petgraph::graph::{NodeIndex, UnGraph};
use silica_common::AbortFlag;
use silica_cuts::reconvergent_cut;
use silica_diagnostics::DiagnosticSink;
use silica_subnet::{EntryId, InOutMapping, Subnet, SubnetBuilder, SubnetView, Visit, Walker};
use std::collections::HashSet;

/// Gains below this are not worth collecting.
const EPS: f32 = 1e-7;

/// One collected replacement: its gain, the subnet to splice in, the
/// boundary mapping, and every entry the replacement would touch.
#[derive(Debug)]
pub struct Candidate {
    /// The replacement's scalar gain (cells saved).
    pub gain: f32,
    /// The replacement cone.
    pub rhs: Subnet,
    /// The boundary mapping of the replacement.
    pub mapping: InOutMapping,
    /// Entries of the window, boundary included.
    pub cells: Vec<EntryId>,
}

/// The conflict graph over collected candidates.
///
/// Vertices are candidates; an edge joins two candidates whose entry sets
/// overlap. Selection is greedy by descending gain: a candidate is
/// applied unless a selected neighbor already consumed one of its
/// entries, which turns the per-node greedy choice into a per-pass global
/// one.
#[derive(Default)]
pub struct ConflictGraph {
    graph: UnGraph<Candidate, ()>,
}

impl ConflictGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of collected candidates.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns `true` if no candidate was collected.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Adds a candidate, connecting it to every already-stored candidate
    /// it overlaps with.
    pub fn add_candidate(&mut self, candidate: Candidate) {
        let cells: HashSet<EntryId> = candidate.cells.iter().copied().collect();
        let node = self.graph.add_node(candidate);
        let others: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|&n| n != node)
            .collect();
        for other in others {
            let overlap = self.graph[other]
                .cells
                .iter()
                .any(|e| cells.contains(e));
            if overlap {
                self.graph.add_edge(node, other, ());
            }
        }
    }

    /// Applies a maximal set of non-conflicting candidates, highest gain
    /// first, and returns the summed gain of the applied ones.
    pub fn apply_best(self, builder: &mut SubnetBuilder) -> f32 {
        let mut order: Vec<NodeIndex> = self.graph.node_indices().collect();
        order.sort_by(|&a, &b| {
            self.graph[b]
                .gain
                .partial_cmp(&self.graph[a].gain)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut selected: HashSet<NodeIndex> = HashSet::new();
        let mut total = 0.0;
        for node in order {
            let conflicted = self
                .graph
                .neighbors(node)
                .any(|neighbor| selected.contains(&neighbor));
            if conflicted {
                continue;
            }
            let candidate = &self.graph[node];
            if builder
                .replace(&candidate.rhs, &candidate.mapping, None, None)
                .is_ok()
            {
                selected.insert(node);
                total += candidate.gain;
            }
        }
        total
    }
}

/// Collects candidate replacements across a whole pass, then applies a
/// non-overlapping subset chosen on the conflict graph.
pub struct LazyRefactorer<'r> {
    name: String,
    resynthesizer: &'r dyn Resynthesizer,
    window_size: usize,
    max_arity: u16,
    abort: Option<AbortFlag>,
}

impl<'r> LazyRefactorer<'r> {
    /// Creates a lazy refactorer.
    pub fn new(
        name: impl Into<String>,
        resynthesizer: &'r dyn Resynthesizer,
        window_size: usize,
        max_arity: u16,
    ) -> Self {
        Self {
            name: name.into(),
            resynthesizer,
            window_size,
            max_arity,
            abort: None,
        }
    }

    /// Installs an abort flag polled between nodes.
    pub fn with_abort(mut self, abort: AbortFlag) -> Self {
        self.abort = Some(abort);
        self
    }

    fn collect_node(
        &self,
        builder: &mut SubnetBuilder,
        entry: EntryId,
        graph: &mut ConflictGraph,
    ) {
        let mapping = reconvergent_cut(builder, &[entry], self.window_size);
        if mapping.inputs == mapping.outputs {
            return;
        }
        let view = SubnetView::from_mapping(builder, mapping);
        let Some(rhs) = self.resynthesizer.resynthesize(&view, self.max_arity) else {
            return;
        };
        let mapping = view.mapping().clone();
        let Ok(effect) = builder.evaluate_replace(&rhs, &mapping, None) else {
            return;
        };
        let gain = effect.delta_cells as f32;
        if gain <= EPS {
            return;
        }

        // Reject open windows: an interior cell with external fanout
        // would leak the old logic past the replacement.
        let mut cells: Vec<EntryId> = Vec::new();
        let mut open = false;
        {
            let view = SubnetView::from_mapping(builder, mapping.clone());
            let mut walker = Walker::new(&view);
            let mut post = |builder: &SubnetBuilder, visit: Visit| {
                if !visit.is_in && !visit.is_out && builder.refcount(visit.entry) > 1 {
                    open = true;
                    return false;
                }
                cells.push(visit.entry);
                true
            };
            walker.run_forward(None, Some(&mut post), false);
        }
        if open {
            return;
        }

        graph.add_candidate(Candidate {
            gain,
            rhs,
            mapping,
            cells,
        });
    }
}

impl SubnetTransformer for LazyRefactorer<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self, builder: &mut SubnetBuilder, _sink: &DiagnosticSink) {
        let mut graph = ConflictGraph::new();
        let entries: Vec<EntryId> = builder.iter().collect();
        for entry in entries {
            if self.abort.as_ref().is_some_and(AbortFlag::is_set) {
                break;
            }
            let cell = builder.cell(entry);
            if cell.is_out() {
                break;
            }
            if cell.symbol.is_source() {
                continue;
            }
            self.collect_node(builder, entry, &mut graph);
        }
        graph.apply_best(builder);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resynthesis::MmSynthesizer;
    use silica_subnet::{eval, CellSymbol};

    #[test]
    fn conflict_graph_selects_disjoint_candidates() {
        // Two independent redundant cones: both collected, both applied.
        let mut builder = SubnetBuilder::new();
        let a = builder.add_input();
        let b = builder.add_input();
        let c = builder.add_input();
        let d = builder.add_input();
        // Cone 1: AND(a, AND(a, b)).
        let ab = builder.add_cell(CellSymbol::And, vec![a, b]);
        let aab = builder.add_cell(CellSymbol::And, vec![a, ab]);
        // Cone 2: OR(c, OR(c, d)).
        let cd = builder.add_cell(CellSymbol::Or, vec![c, d]);
        let ccd = builder.add_cell(CellSymbol::Or, vec![c, cd]);
        builder.add_output(aab);
        builder.add_output(ccd);

        let before = {
            let view = SubnetView::whole(&builder);
            eval::evaluate_view(&view)
        };

        let synthesizer = MmSynthesizer;
        let lazy = LazyRefactorer::new("lazy", &synthesizer, 4, 2);
        lazy.transform(&mut builder, &DiagnosticSink::new());
        builder.validate().unwrap();

        let after = {
            let view = SubnetView::whole(&builder);
            eval::evaluate_view(&view)
        };
        assert_eq!(before, after);
        assert_eq!(builder.len(), 8, "4 inputs, 2 gates, 2 outputs");
    }

    #[test]
    fn overlapping_candidates_apply_once() {
        let mut graph = ConflictGraph::new();
        let mut builder = SubnetBuilder::new();
        let a = builder.add_input();
        let b = builder.add_input();
        let and = builder.add_cell(CellSymbol::And, vec![a, b]);
        builder.add_output(and);

        let make_rhs = || {
            let mut rhs = SubnetBuilder::new();
            let p = rhs.add_input();
            let q = rhs.add_input();
            let or = rhs.add_cell(CellSymbol::Or, vec![p, q]);
            rhs.add_output(or);
            rhs.make()
        };
        let mapping = InOutMapping::new(vec![a.idx, b.idx], vec![and.idx]);

        graph.add_candidate(Candidate {
            gain: 2.0,
            rhs: make_rhs(),
            mapping: mapping.clone(),
            cells: vec![a.idx, b.idx, and.idx],
        });
        graph.add_candidate(Candidate {
            gain: 1.0,
            rhs: make_rhs(),
            mapping,
            cells: vec![and.idx],
        });
        assert_eq!(graph.len(), 2);

        let gain = graph.apply_best(&mut builder);
        assert!((gain - 2.0).abs() < 1e-6, "only the higher gain applies");
        builder.validate().unwrap();
    }

    #[test]
    fn shared_interior_cells_open_the_window() {
        // The inner AND feeds a second output, so the window around the
        // outer gate is open and must not be collected.
        let mut builder = SubnetBuilder::new();
        let a = builder.add_input();
        let b = builder.add_input();
        let ab = builder.add_cell(CellSymbol::And, vec![a, b]);
        let outer = builder.add_cell(CellSymbol::And, vec![a, ab]);
        builder.add_output(outer);
        builder.add_output(ab);

        let synthesizer = MmSynthesizer;
        let lazy = LazyRefactorer::new("lazy", &synthesizer, 4, 2);
        let mut graph = ConflictGraph::new();
        lazy.collect_node(&mut builder, outer.idx, &mut graph);
        // The candidate realizes a&b by reusing the shared inner AND, so
        // either nothing is collected or the window excludes the shared
        // cell; both keep the second output intact.
        lazy.transform(&mut builder, &DiagnosticSink::new());
        builder.validate().unwrap();
        let out2 = builder.output_ids()[1];
        let driver = builder.link(out2, 0).idx;
        let view = SubnetView::cone(&builder, driver);
        let tables = eval::evaluate_view(&view);
        let expected = &silica_tt::TruthTable::nth_var(2, 0) & &silica_tt::TruthTable::nth_var(2, 1);
        assert_eq!(tables[0], expected);
    }
}
