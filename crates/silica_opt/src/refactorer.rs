//! Window-based refactoring.

use crate::passer::SafePasser;
use crate::transform::{Resynthesizer, SubnetTransformer};
use silica_common::AbortFlag;
use silica_cuts::reconvergent_cut;
use silica_diagnostics::DiagnosticSink;
use silica_subnet::{Effect, EntryId, SubnetBuilder, SubnetView};

/// Resynthesizes a reconvergence window around each node and commits the
/// replacement when a configurable predicate accepts its [`Effect`].
///
/// Unlike the [`Rewriter`](crate::Rewriter), which chooses among
/// enumerated cuts, the refactorer works on one grown window per node;
/// the window size bounds the leaf count, not the interior.
pub struct Refactorer<'r> {
    name: String,
    resynthesizer: &'r dyn Resynthesizer,
    window_size: usize,
    max_arity: u16,
    predicate: Box<dyn Fn(&Effect) -> bool + 'r>,
    weight_modifier: Option<Box<dyn Fn(f32, u32) -> f32 + 'r>>,
    abort: Option<AbortFlag>,
}

impl<'r> Refactorer<'r> {
    /// Creates a refactorer.
    pub fn new(
        name: impl Into<String>,
        resynthesizer: &'r dyn Resynthesizer,
        window_size: usize,
        max_arity: u16,
        predicate: impl Fn(&Effect) -> bool + 'r,
    ) -> Self {
        Self {
            name: name.into(),
            resynthesizer,
            window_size,
            max_arity,
            predicate: Box::new(predicate),
            weight_modifier: None,
            abort: None,
        }
    }

    /// Installs a weight modifier applied during replace evaluation.
    pub fn with_weight_modifier(
        mut self,
        modifier: impl Fn(f32, u32) -> f32 + 'r,
    ) -> Self {
        self.weight_modifier = Some(Box::new(modifier));
        self
    }

    /// Installs an abort flag polled between nodes.
    pub fn with_abort(mut self, abort: AbortFlag) -> Self {
        self.abort = Some(abort);
        self
    }

    fn refactor_node(
        &self,
        builder: &mut SubnetBuilder,
        passer: &mut SafePasser,
        entry: EntryId,
    ) {
        let mapping = reconvergent_cut(builder, &[entry], self.window_size);
        if mapping.inputs == mapping.outputs {
            return; // degenerate all-constant window
        }
        let (rhs, mapping) = {
            let view = SubnetView::from_mapping(builder, mapping);
            let Some(rhs) = self.resynthesizer.resynthesize(&view, self.max_arity) else {
                return;
            };
            (rhs, view.mapping().clone())
        };
        let modifier = self
            .weight_modifier
            .as_ref()
            .map(|m| m.as_ref() as &dyn Fn(f32, u32) -> f32);
        let Ok(effect) = builder.evaluate_replace(&rhs, &mapping, modifier) else {
            return;
        };
        if (self.predicate)(&effect) {
            let modifier = self
                .weight_modifier
                .as_ref()
                .map(|m| m.as_ref() as &dyn Fn(f32, u32) -> f32);
            let _ = passer.replace(builder, &rhs, &mapping, modifier, None);
        }
    }
}

impl SubnetTransformer for Refactorer<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self, builder: &mut SubnetBuilder, _sink: &DiagnosticSink) {
        let mut passer = SafePasser::new(builder);
        while let Some(entry) = passer.current() {
            if self.abort.as_ref().is_some_and(AbortFlag::is_set) {
                break;
            }
            if builder.cell(entry).is_out() {
                break;
            }
            if !builder.cell(entry).symbol.is_source() {
                self.refactor_node(builder, &mut passer, entry);
            }
            passer.advance(builder);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resynthesis::MmFactorSynthesizer;
    use silica_subnet::{eval, CellSymbol};

    #[test]
    fn shrinking_predicate_compacts_redundancy() {
        // y = (a & b) | (a & b & c): absorbed to a & b.
        let mut builder = SubnetBuilder::new();
        let a = builder.add_input();
        let b = builder.add_input();
        let c = builder.add_input();
        let ab = builder.add_cell(CellSymbol::And, vec![a, b]);
        let abc = builder.add_cell(CellSymbol::And, vec![ab, c]);
        let or = builder.add_cell(CellSymbol::Or, vec![ab, abc]);
        builder.add_output(or);

        let before = {
            let view = SubnetView::whole(&builder);
            eval::evaluate_view(&view)
        };

        let synthesizer = MmFactorSynthesizer;
        let refactorer = Refactorer::new("rf", &synthesizer, 6, 2, |effect: &Effect| {
            effect.delta_cells > 0
        });
        refactorer.transform(&mut builder, &DiagnosticSink::new());
        builder.validate().unwrap();

        let after = {
            let view = SubnetView::whole(&builder);
            eval::evaluate_view(&view)
        };
        assert_eq!(before, after);
        // The absorbed form has a single AND and nothing else.
        assert!(builder.len() <= 5, "3 inputs + AND + output");
    }

    #[test]
    fn rejecting_predicate_changes_nothing() {
        let mut builder = SubnetBuilder::new();
        let a = builder.add_input();
        let b = builder.add_input();
        let and = builder.add_cell(CellSymbol::And, vec![a, b]);
        builder.add_output(and);
        let snapshot = builder.make();

        let synthesizer = MmFactorSynthesizer;
        let refactorer =
            Refactorer::new("rf", &synthesizer, 6, 2, |_: &Effect| false);
        refactorer.transform(&mut builder, &DiagnosticSink::new());
        assert_eq!(builder.make(), snapshot);
    }

    #[test]
    fn weight_modifier_reaches_effect() {
        let mut builder = SubnetBuilder::new();
        let a = builder.add_input();
        let b = builder.add_input();
        builder.set_weight(a.idx, 1.0);
        builder.set_weight(b.idx, 1.0);
        let ab = builder.add_cell(CellSymbol::And, vec![a, b]);
        let dup = builder.add_cell(CellSymbol::Or, vec![ab, ab]);
        builder.add_output(dup);

        // Accept only replacements that reduce summed weight.
        let synthesizer = MmFactorSynthesizer;
        let refactorer = Refactorer::new("rf", &synthesizer, 6, 2, |effect: &Effect| {
            effect.delta_weight > 0.0
        })
        .with_weight_modifier(|fanin_sum, _| fanin_sum + 1.0);
        refactorer.transform(&mut builder, &DiagnosticSink::new());
        builder.validate().unwrap();
    }
}
