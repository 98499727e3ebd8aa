//! Windows on a builder: functionally closed sub-DAGs.

use crate::builder::SubnetBuilder;
use crate::EntryId;
use serde::{Deserialize, Serialize};
use silica_tt::TruthTable;
use std::collections::HashSet;

/// The boundary of a replacement or window: which parent entries supply
/// the inputs and which parent entries the outputs take over.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InOutMapping {
    /// Parent entries supplying the window inputs, in variable order.
    pub inputs: Vec<EntryId>,
    /// Parent entries the window outputs correspond to.
    pub outputs: Vec<EntryId>,
}

impl InOutMapping {
    /// Creates a mapping from explicit boundary lists.
    pub fn new(inputs: Vec<EntryId>, outputs: Vec<EntryId>) -> Self {
        Self { inputs, outputs }
    }

    /// Returns the number of inputs.
    pub fn in_num(&self) -> usize {
        self.inputs.len()
    }

    /// Returns the number of outputs.
    pub fn out_num(&self) -> usize {
        self.outputs.len()
    }
}

/// A window on a builder delimited by an input/output mapping.
///
/// Invariant: the entries reachable from the outputs through fanin links,
/// stopping at the inputs, never cross the boundary except at an input.
/// Views optionally carry a *care* table over their inputs stating which
/// input combinations matter for equivalence.
pub struct SubnetView<'a> {
    parent: &'a SubnetBuilder,
    mapping: InOutMapping,
    care: Option<TruthTable>,
}

impl<'a> SubnetView<'a> {
    /// A view spanning the whole builder: its inputs and outputs.
    pub fn whole(parent: &'a SubnetBuilder) -> Self {
        Self {
            parent,
            mapping: InOutMapping::new(parent.input_ids(), parent.output_ids()),
            care: None,
        }
    }

    /// The maximum cone of `root`: inputs are all sources (`In`, `Zero`,
    /// `One`) in its transitive fanin.
    pub fn cone(parent: &'a SubnetBuilder, root: EntryId) -> Self {
        let mut inputs = Vec::new();
        let mut seen: HashSet<EntryId> = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            if parent.cell(id).symbol.is_source() {
                inputs.push(id);
                continue;
            }
            for link in parent.links(id) {
                stack.push(link.idx);
            }
        }
        inputs.sort_by_key(|e| e.as_raw());
        Self {
            parent,
            mapping: InOutMapping::new(inputs, vec![root]),
            care: None,
        }
    }

    /// The view of a cut: leaves become inputs, the root the only output.
    pub fn from_cut(parent: &'a SubnetBuilder, leaves: &[EntryId], root: EntryId) -> Self {
        let mut inputs = leaves.to_vec();
        inputs.sort_by_key(|e| e.as_raw());
        Self {
            parent,
            mapping: InOutMapping::new(inputs, vec![root]),
            care: None,
        }
    }

    /// A view with an explicit boundary.
    pub fn from_mapping(parent: &'a SubnetBuilder, mapping: InOutMapping) -> Self {
        assert!(!mapping.outputs.is_empty(), "a view needs at least one output");
        Self {
            parent,
            mapping,
            care: None,
        }
    }

    /// Returns the parent builder.
    pub fn parent(&self) -> &'a SubnetBuilder {
        self.parent
    }

    /// Returns the boundary mapping.
    pub fn mapping(&self) -> &InOutMapping {
        &self.mapping
    }

    /// Returns the number of inputs.
    pub fn in_num(&self) -> usize {
        self.mapping.in_num()
    }

    /// Returns the number of outputs.
    pub fn out_num(&self) -> usize {
        self.mapping.out_num()
    }

    /// Returns the `i`-th input entry.
    pub fn input(&self, i: usize) -> EntryId {
        self.mapping.inputs[i]
    }

    /// Returns the `i`-th output entry.
    pub fn output(&self, i: usize) -> EntryId {
        self.mapping.outputs[i]
    }

    /// Returns the care table, if one is set.
    pub fn care(&self) -> Option<&TruthTable> {
        self.care.as_ref()
    }

    /// Sets the care table over the view inputs.
    pub fn set_care(&mut self, care: TruthTable) {
        assert_eq!(care.num_vars(), self.in_num(), "care arity mismatch");
        self.care = Some(care);
    }
}
