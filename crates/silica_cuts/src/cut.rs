//! The cut type.

use serde::{Deserialize, Serialize};
use silica_subnet::EntryId;
use std::collections::BTreeSet;

/// A k-feasible cut: a bounded antichain covering the transitive fanin of
/// its root.
///
/// Leaves are kept sorted so cuts compare by value and define a stable
/// variable order for truth-table evaluation. The `signature` is a 64-bit
/// Bloom-style summary used to reject dominance checks cheaply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cut {
    /// The covered entry.
    pub root: EntryId,
    /// The cut leaves, sorted by entry index.
    pub leaves: BTreeSet<EntryId>,
    /// Union of `1 << (leaf % 64)` over the leaves.
    pub signature: u64,
}

impl Cut {
    /// Creates the trivial cut `{root}`.
    pub fn trivial(root: EntryId) -> Self {
        let mut leaves = BTreeSet::new();
        leaves.insert(root);
        Self {
            root,
            signature: bit(root),
            leaves,
        }
    }

    /// Creates a cut from an explicit leaf set.
    pub fn new(root: EntryId, leaves: impl IntoIterator<Item = EntryId>) -> Self {
        let leaves: BTreeSet<EntryId> = leaves.into_iter().collect();
        let signature = leaves.iter().fold(0, |acc, &l| acc | bit(l));
        Self {
            root,
            leaves,
            signature,
        }
    }

    /// Returns the number of leaves.
    pub fn size(&self) -> usize {
        self.leaves.len()
    }

    /// Returns `true` for the trivial cut `{root}`.
    pub fn is_trivial(&self) -> bool {
        self.leaves.len() == 1 && self.leaves.contains(&self.root)
    }

    /// Returns the leaves as an ordered vector.
    pub fn leaf_vec(&self) -> Vec<EntryId> {
        self.leaves.iter().copied().collect()
    }

    /// Returns `true` if `self`'s leaves are a subset of `other`'s, i.e.
    /// `self` dominates `other` and `other` carries no extra information.
    pub fn dominates(&self, other: &Cut) -> bool {
        if self.leaves.len() > other.leaves.len() {
            return false;
        }
        if self.signature & !other.signature != 0 {
            return false;
        }
        self.leaves.is_subset(&other.leaves)
    }

    /// Merges two cuts under the leaf bound `k`, rooted at `root`.
    pub fn merge(root: EntryId, a: &Cut, b: &Cut, k: usize) -> Option<Cut> {
        // The signature bounds the union size from below.
        if ((a.signature | b.signature).count_ones() as usize) > k && k <= 64 {
            return None;
        }
        let leaves: BTreeSet<EntryId> = a.leaves.union(&b.leaves).copied().collect();
        if leaves.len() > k {
            return None;
        }
        let signature = a.signature | b.signature;
        Some(Cut {
            root,
            leaves,
            signature,
        })
    }
}

fn bit(id: EntryId) -> u64 {
    1u64 << (id.as_raw() % 64)
}
