//! Associative reordering of balanced AND/OR/XOR trees.

use crate::transform::Resynthesizer;
use silica_subnet::{CellSymbol, EntryId, Link, Subnet, SubnetBuilder, SubnetView};
use std::collections::HashSet;

/// Depth-rebalancing by input permutation.
///
/// For a window whose interior is a tree of one associative symbol, the
/// reorderer enumerates leaf permutations, rebuilds each as a balanced
/// binary tree, scores the candidates with `evaluate_replace`, and
/// returns the best strict improvement. Windows with more leaves than
/// [`MAX_ENUMERATED_LEAVES`] get a single depth-sorted candidate instead
/// of the full enumeration.
#[derive(Debug, Default)]
pub struct AssociativeReorderer;

/// Permutations are enumerated up to this leaf count (6! = 720).
pub const MAX_ENUMERATED_LEAVES: usize = 6;

impl AssociativeReorderer {
    /// Builds the maximal single-symbol tree window rooted at `root`:
    /// expansion stops at cells of another symbol, at inverted links, and
    /// at shared cells. `None` if the root is not an associative gate.
    pub fn window<'a>(
        builder: &'a SubnetBuilder,
        root: EntryId,
    ) -> Option<SubnetView<'a>> {
        let symbol = builder.cell(root).symbol;
        if !symbol.is_associative() {
            return None;
        }
        let mut leaves: Vec<EntryId> = Vec::new();
        let mut seen: HashSet<EntryId> = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            for link in builder.links(id) {
                let child = link.idx;
                let expandable = builder.cell(child).symbol == symbol
                    && !link.inv
                    && builder.refcount(child) == 1;
                if expandable {
                    stack.push(child);
                } else if seen.insert(child) {
                    leaves.push(child);
                }
            }
        }
        if leaves.len() < 3 {
            return None;
        }
        Some(SubnetView::from_cut(builder, &leaves, root))
    }
}

impl Resynthesizer for AssociativeReorderer {
    fn resynthesize(&self, view: &SubnetView, max_arity: u16) -> Option<Subnet> {
        let builder = view.parent();
        let root = view.output(0);
        if view.out_num() != 1 {
            return None;
        }
        let symbol = builder.cell(root).symbol;
        if !symbol.is_associative() {
            return None;
        }
        // The window interior must be a pure tree of `symbol` with
        // non-inverted internal links; leaf polarities are free.
        let leaf_polarity = collect_leaf_polarities(builder, view, symbol)?;
        let n = view.in_num();

        let orders: Vec<Vec<usize>> = if n <= MAX_ENUMERATED_LEAVES {
            permutations(n)
        } else {
            // One candidate: shallow leaves first, so the balanced tree
            // puts deep leaves near the root.
            let mut order: Vec<usize> = (0..n).collect();
            order.sort_by_key(|&i| builder.depth(view.input(i)));
            vec![order]
        };

        let mut best: Option<(i32, Subnet)> = None;
        for order in orders {
            let rhs = build_balanced(symbol, &leaf_polarity, &order, n, max_arity);
            let effect = builder
                .evaluate_replace(&rhs, view.mapping(), None)
                .ok()?;
            let score = effect.delta_depth;
            if best.as_ref().map_or(score > 0, |(s, _)| score > *s) {
                best = Some((score, rhs));
            }
        }
        best.map(|(_, rhs)| rhs)
    }
}

/// Checks tree purity and returns, per view input, the polarity with
/// which the tree consumes it.
fn collect_leaf_polarities(
    builder: &SubnetBuilder,
    view: &SubnetView,
    symbol: CellSymbol,
) -> Option<Vec<bool>> {
    let input_set: HashSet<EntryId> = view.mapping().inputs.iter().copied().collect();
    let mut polarity: Vec<Option<bool>> = vec![None; view.in_num()];
    let index_of: std::collections::HashMap<EntryId, usize> = view
        .mapping()
        .inputs
        .iter()
        .enumerate()
        .map(|(i, &e)| (e, i))
        .collect();

    let mut stack = vec![view.output(0)];
    let mut visited: HashSet<EntryId> = HashSet::new();
    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            return None; // shared interior cell: not a tree
        }
        if builder.cell(id).symbol != symbol {
            return None;
        }
        for link in builder.links(id) {
            if input_set.contains(&link.idx) {
                let slot = &mut polarity[index_of[&link.idx]];
                match slot {
                    None => *slot = Some(link.inv),
                    // A leaf consumed with both polarities breaks the
                    // single-polarity tree shape.
                    Some(p) if *p != link.inv => return None,
                    Some(_) => {}
                }
            } else {
                if link.inv {
                    return None;
                }
                stack.push(link.idx);
            }
        }
    }
    polarity.into_iter().collect()
}

/// Builds a balanced binary tree over the permuted leaves.
fn build_balanced(
    symbol: CellSymbol,
    leaf_polarity: &[bool],
    order: &[usize],
    n: usize,
    max_arity: u16,
) -> Subnet {
    let mut builder = SubnetBuilder::new();
    let inputs: Vec<Link> = (0..n).map(|_| builder.add_input()).collect();
    let leaves: Vec<Link> = order
        .iter()
        .map(|&i| inputs[i].invert_if(leaf_polarity[i]))
        .collect();
    let root = builder.add_cell_tree(symbol, leaves, max_arity.max(2));
    builder.add_output(root);
    builder.make()
}

fn permutations(n: usize) -> Vec<Vec<usize>> {
    let mut items: Vec<usize> = (0..n).collect();
    let mut out = Vec::new();
    permute(&mut items, n, &mut out);
    out
}

fn permute(items: &mut Vec<usize>, k: usize, out: &mut Vec<Vec<usize>>) {
    if k <= 1 {
        out.push(items.clone());
        return;
    }
    for i in 0..k {
        permute(items, k - 1, out);
        if k % 2 == 0 {
            items.swap(i, k - 1);
        } else {
            items.swap(0, k - 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silica_subnet::eval;

    /// A skewed AND chain: ((a & b) & c) & d with depth 3.
    fn skewed_chain() -> (SubnetBuilder, EntryId) {
        let mut builder = SubnetBuilder::new();
        let a = builder.add_input();
        let b = builder.add_input();
        let c = builder.add_input();
        let d = builder.add_input();
        let ab = builder.add_cell(CellSymbol::And, vec![a, b]);
        let abc = builder.add_cell(CellSymbol::And, vec![ab, c]);
        let abcd = builder.add_cell(CellSymbol::And, vec![abc, d]);
        builder.add_output(abcd);
        (builder, abcd.idx)
    }

    #[test]
    fn window_collects_chain_leaves() {
        let (builder, root) = skewed_chain();
        let view = AssociativeReorderer::window(&builder, root).unwrap();
        assert_eq!(view.in_num(), 4);
        assert_eq!(view.output(0), root);
    }

    #[test]
    fn rebalancing_reduces_depth() {
        let (mut builder, root) = skewed_chain();
        assert_eq!(builder.depth(root), 3);

        let (rhs, mapping) = {
            let view = AssociativeReorderer::window(&builder, root).unwrap();
            let rhs = AssociativeReorderer.resynthesize(&view, 2).unwrap();
            (rhs, view.mapping().clone())
        };
        builder.replace(&rhs, &mapping, None, None).unwrap();
        builder.validate().unwrap();

        let new_root = builder.output_ids()[0];
        let root_driver = builder.link(new_root, 0).idx;
        assert_eq!(builder.depth(root_driver), 2, "balanced tree depth");
    }

    #[test]
    fn balanced_tree_yields_no_candidate() {
        // Already balanced: no strict depth improvement exists.
        let mut builder = SubnetBuilder::new();
        let a = builder.add_input();
        let b = builder.add_input();
        let c = builder.add_input();
        let d = builder.add_input();
        let ab = builder.add_cell(CellSymbol::And, vec![a, b]);
        let cd = builder.add_cell(CellSymbol::And, vec![c, d]);
        let root = builder.add_cell(CellSymbol::And, vec![ab, cd]);
        builder.add_output(root);

        let view = AssociativeReorderer::window(&builder, root.idx).unwrap();
        assert!(AssociativeReorderer.resynthesize(&view, 2).is_none());
    }

    #[test]
    fn function_preserved_after_rebalance() {
        let (mut builder, root) = skewed_chain();
        let before = {
            let view = SubnetView::cone(&builder, root);
            eval::evaluate_view(&view)
        };
        let (rhs, mapping) = {
            let view = AssociativeReorderer::window(&builder, root).unwrap();
            let rhs = AssociativeReorderer.resynthesize(&view, 2).unwrap();
            (rhs, view.mapping().clone())
        };
        builder.replace(&rhs, &mapping, None, None).unwrap();
        let new_driver = builder.link(builder.output_ids()[0], 0).idx;
        let after = {
            let view = SubnetView::cone(&builder, new_driver);
            eval::evaluate_view(&view)
        };
        assert_eq!(before, after);
    }

    #[test]
    fn mixed_symbols_refuse() {
        let mut builder = SubnetBuilder::new();
        let a = builder.add_input();
        let b = builder.add_input();
        let c = builder.add_input();
        let ab = builder.add_cell(CellSymbol::Or, vec![a, b]);
        let root = builder.add_cell(CellSymbol::And, vec![ab, c]);
        builder.add_output(root);

        // The OR is a leaf of the AND window, so the window is fine, but
        // forcing a view across both symbols must be rejected.
        let view = SubnetView::from_cut(&builder, &[a.idx, b.idx, c.idx], root.idx);
        assert!(AssociativeReorderer.resynthesize(&view, 2).is_none());
    }

    #[test]
    fn xor_chain_rebalances() {
        let mut builder = SubnetBuilder::new();
        let inputs: Vec<Link> = (0..5).map(|_| builder.add_input()).collect();
        let mut acc = builder.add_cell(CellSymbol::Xor, vec![inputs[0], inputs[1]]);
        for &input in &inputs[2..] {
            acc = builder.add_cell(CellSymbol::Xor, vec![acc, input]);
        }
        builder.add_output(acc);
        assert_eq!(builder.depth(acc.idx), 4);

        let (rhs, mapping) = {
            let view = AssociativeReorderer::window(&builder, acc.idx).unwrap();
            let rhs = AssociativeReorderer.resynthesize(&view, 2).unwrap();
            (rhs, view.mapping().clone())
        };
        builder.replace(&rhs, &mapping, None, None).unwrap();
        let driver = builder.link(builder.output_ids()[0], 0).idx;
        assert_eq!(builder.depth(driver), 3);
    }
}
