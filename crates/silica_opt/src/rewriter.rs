//! Cut-wise rewriting with cost-gated replacement.

use crate::passer::SafePasser;
use crate::transform::{Resynthesizer, SubnetTransformer};
use silica_common::AbortFlag;
use silica_cuts::{CutExtractor, CutExtractorConfig};
use silica_diagnostics::DiagnosticSink;
use silica_subnet::{Effect, EntryId, SubnetBuilder, SubnetView};

/// Tolerance below which a score counts as zero.
const METRIC_EPS: f32 = 1e-6;

/// Bounds for a rewriting pass.
#[derive(Clone, Copy, Debug)]
pub struct RewriterConfig {
    /// Maximum cut size considered per node.
    pub k: usize,
    /// Maximum cuts stored per node.
    pub max_cuts: usize,
    /// Maximum arity of synthesized cells.
    pub max_arity: u16,
    /// Also commit replacements with zero score (useful to canonicalize
    /// structure without changing the cost).
    pub zero_cost: bool,
}

impl Default for RewriterConfig {
    fn default() -> Self {
        Self {
            k: 4,
            max_cuts: 16,
            max_arity: 2,
            zero_cost: false,
        }
    }
}

/// Finds and applies the best rewriting on each node.
///
/// For every non-output entry, each stored cut is resynthesized and the
/// candidate scored through `cost` on its [`Effect`]; the best candidate
/// is committed when its score clears the zero threshold. Cut sets of
/// affected entries are recomputed after every commit.
pub struct Rewriter<'r> {
    name: String,
    resynthesizer: &'r dyn Resynthesizer,
    config: RewriterConfig,
    cost: Box<dyn Fn(&Effect) -> f32 + 'r>,
    abort: Option<AbortFlag>,
}

impl<'r> Rewriter<'r> {
    /// Creates a rewriter with an injected resynthesizer and cost
    /// function (greater scores are better).
    pub fn new(
        name: impl Into<String>,
        resynthesizer: &'r dyn Resynthesizer,
        config: RewriterConfig,
        cost: impl Fn(&Effect) -> f32 + 'r,
    ) -> Self {
        Self {
            name: name.into(),
            resynthesizer,
            config,
            cost: Box::new(cost),
            abort: None,
        }
    }

    /// Installs an abort flag polled between nodes.
    pub fn with_abort(mut self, abort: AbortFlag) -> Self {
        self.abort = Some(abort);
        self
    }

    fn rewrite_node(
        &self,
        builder: &mut SubnetBuilder,
        passer: &mut SafePasser,
        extractor: &mut CutExtractor,
        entry: EntryId,
    ) {
        let cuts = extractor.cuts(entry).to_vec();
        let mut best: Option<(f32, silica_subnet::Subnet, silica_subnet::InOutMapping)> = None;

        for cut in &cuts {
            if cut.is_trivial() {
                continue;
            }
            let view = SubnetView::from_cut(builder, &cut.leaf_vec(), entry);
            let Some(rhs) = self.resynthesizer.resynthesize(&view, self.config.max_arity)
            else {
                continue;
            };
            let mapping = view.mapping().clone();
            let Ok(effect) = builder.evaluate_replace(&rhs, &mapping, None) else {
                continue;
            };
            let score = (self.cost)(&effect);
            if best.as_ref().map_or(true, |(s, _, _)| score - s > METRIC_EPS) {
                best = Some((score, rhs, mapping));
            }
        }

        let Some((score, rhs, mapping)) = best else {
            return;
        };
        if score > METRIC_EPS || (self.config.zero_cost && score.abs() <= METRIC_EPS) {
            let mut affected: Vec<EntryId> = Vec::new();
            let mut record = |id: EntryId| affected.push(id);
            if passer
                .replace(builder, &rhs, &mapping, None, Some(&mut record))
                .is_ok()
            {
                for id in affected {
                    extractor.recompute_cuts(builder, id);
                }
            }
        }
    }
}

impl SubnetTransformer for Rewriter<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self, builder: &mut SubnetBuilder, _sink: &DiagnosticSink) {
        let cut_config = CutExtractorConfig {
            k: self.config.k,
            max_cuts: self.config.max_cuts,
        };
        let mut extractor = CutExtractor::new(builder, cut_config);
        let mut passer = SafePasser::new(builder);
        while let Some(entry) = passer.current() {
            if self.abort.as_ref().is_some_and(AbortFlag::is_set) {
                break;
            }
            if builder.cell(entry).is_out() {
                break;
            }
            if !builder.cell(entry).symbol.is_source() {
                self.rewrite_node(builder, &mut passer, &mut extractor, entry);
            }
            passer.advance(builder);
        }
    }
}

/// Scores an effect by saved cells.
pub fn cost_cells(effect: &Effect) -> f32 {
    effect.delta_cells as f32
}

/// Scores an effect by saved depth, with saved cells as a tie-breaker.
pub fn cost_depth(effect: &Effect) -> f32 {
    effect.delta_depth as f32 + 0.001 * effect.delta_cells as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resynthesis::MmSynthesizer;
    use silica_subnet::{CellSymbol, Link};

    fn sink() -> DiagnosticSink {
        DiagnosticSink::new()
    }

    #[test]
    fn constant_input_collapses() {
        // y = AND(a, ONE) reduces to a pass-through of a.
        let mut builder = SubnetBuilder::new();
        let a = builder.add_input();
        let one = builder.add_cell(CellSymbol::One, vec![]);
        let and = builder.add_cell(CellSymbol::And, vec![a, one]);
        builder.add_output(and);

        let synthesizer = MmSynthesizer;
        let rewriter = Rewriter::new(
            "rw",
            &synthesizer,
            RewriterConfig::default(),
            cost_cells,
        );
        rewriter.transform(&mut builder, &sink());
        builder.validate().unwrap();

        // The AND and the constant are gone; the output reads a directly.
        let out = builder.output_ids()[0];
        assert_eq!(builder.link(out, 0).idx, a.idx);
        assert_eq!(builder.len(), 2, "one input, one output");
    }

    #[test]
    fn redundant_logic_shrinks() {
        // y = AND(a, AND(a, b)) is just AND(a, b).
        let mut builder = SubnetBuilder::new();
        let a = builder.add_input();
        let b = builder.add_input();
        let inner = builder.add_cell(CellSymbol::And, vec![a, b]);
        let outer = builder.add_cell(CellSymbol::And, vec![a, inner]);
        builder.add_output(outer);

        let synthesizer = MmSynthesizer;
        let rewriter = Rewriter::new(
            "rw",
            &synthesizer,
            RewriterConfig::default(),
            cost_cells,
        );
        rewriter.transform(&mut builder, &sink());
        builder.validate().unwrap();

        let ands = builder
            .iter()
            .filter(|&id| builder.cell(id).symbol == CellSymbol::And)
            .count();
        assert_eq!(ands, 1);
    }

    #[test]
    fn idempotent_without_zero_cost() {
        let mut builder = SubnetBuilder::new();
        let inputs: Vec<Link> = (0..4).map(|_| builder.add_input()).collect();
        let n1 = builder.add_cell(CellSymbol::And, vec![inputs[0], inputs[1]]);
        let n2 = builder.add_cell(CellSymbol::Or, vec![inputs[2], inputs[3]]);
        let n3 = builder.add_cell(CellSymbol::Xor, vec![n1, n2]);
        builder.add_output(n3);

        let synthesizer = MmSynthesizer;
        let rewriter = Rewriter::new(
            "rw",
            &synthesizer,
            RewriterConfig::default(),
            cost_cells,
        );
        rewriter.transform(&mut builder, &sink());
        let first = builder.make();

        let mut builder2 = SubnetBuilder::from_subnet(&first);
        rewriter.transform(&mut builder2, &sink());
        let second = builder2.make();

        assert_eq!(first, second, "a second pass must change nothing");
    }

    #[test]
    fn preserves_function() {
        let mut builder = SubnetBuilder::new();
        let a = builder.add_input();
        let b = builder.add_input();
        let c = builder.add_input();
        let ab = builder.add_cell(CellSymbol::And, vec![a, b]);
        let nab = builder.add_cell(CellSymbol::Not, vec![ab]);
        let root = builder.add_cell(CellSymbol::Or, vec![nab, c]);
        builder.add_output(root);

        let before = {
            let view = SubnetView::whole(&builder);
            silica_subnet::eval::evaluate_view(&view)
        };

        let synthesizer = MmSynthesizer;
        let rewriter = Rewriter::new(
            "rw",
            &synthesizer,
            RewriterConfig::default(),
            cost_cells,
        );
        rewriter.transform(&mut builder, &sink());
        builder.validate().unwrap();

        let after = {
            let view = SubnetView::whole(&builder);
            silica_subnet::eval::evaluate_view(&view)
        };
        assert_eq!(before, after);
    }
}
