//! Per-node k-feasible cut enumeration.

use crate::cut::Cut;
use silica_subnet::{EntryId, SubnetBuilder};
use std::collections::HashMap;

/// Bounds and priorities for cut enumeration.
#[derive(Clone, Copy, Debug)]
pub struct CutExtractorConfig {
    /// Maximum leaves per cut.
    pub k: usize,
    /// Maximum cuts kept per node; excess cuts are scored and truncated.
    pub max_cuts: usize,
}

impl Default for CutExtractorConfig {
    fn default() -> Self {
        Self { k: 4, max_cuts: 16 }
    }
}

/// Enumerates and stores the k-feasible cuts of every entry.
///
/// Cut sets are built in topological order as unions of one cut per fanin,
/// filtered by the leaf bound, dominance, and a per-node cap. After a
/// structural rewrite, [`recompute_cuts`](Self::recompute_cuts) refreshes
/// a single entry; `replace` callbacks keep the store consistent.
pub struct CutExtractor {
    config: CutExtractorConfig,
    cuts: HashMap<EntryId, Vec<Cut>>,
}

impl CutExtractor {
    /// Enumerates cuts for every live entry of `builder`.
    pub fn new(builder: &SubnetBuilder, config: CutExtractorConfig) -> Self {
        let mut extractor = Self {
            config,
            cuts: HashMap::with_capacity(builder.len()),
        };
        for entry in builder.iter() {
            let cuts = extractor.compute(builder, entry);
            extractor.cuts.insert(entry, cuts);
        }
        extractor
    }

    /// Returns the stored cuts of `entry` (the trivial cut is always
    /// present and listed first).
    pub fn cuts(&self, entry: EntryId) -> &[Cut] {
        self.cuts
            .get(&entry)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Recomputes the cut set of `entry` from its (current) fanin cut
    /// sets. Passed as a callback into `replace` so downstream cut sets
    /// stay valid across rewrites.
    pub fn recompute_cuts(&mut self, builder: &SubnetBuilder, entry: EntryId) {
        if !builder.is_live(entry) {
            self.cuts.remove(&entry);
            return;
        }
        let cuts = self.compute(builder, entry);
        self.cuts.insert(entry, cuts);
    }

    fn compute(&self, builder: &SubnetBuilder, entry: EntryId) -> Vec<Cut> {
        let cell = builder.cell(entry);
        if cell.symbol.is_source() || cell.links.is_empty() {
            return vec![Cut::trivial(entry)];
        }

        // Out entries forward their driver's cuts rerooted; cuts of an
        // output are rarely useful, so only the trivial cut is kept.
        if cell.is_out() {
            return vec![Cut::trivial(entry)];
        }

        // Cross product of one cut per fanin, grown link by link.
        let mut partial: Vec<Cut> = vec![Cut::new(entry, [])];
        for link in &cell.links {
            let fanin_cuts = self
                .cuts
                .get(&link.idx)
                .cloned()
                .unwrap_or_else(|| vec![Cut::trivial(link.idx)]);
            let mut next: Vec<Cut> = Vec::new();
            for base in &partial {
                for fanin_cut in &fanin_cuts {
                    if let Some(merged) = Cut::merge(entry, base, fanin_cut, self.config.k) {
                        next.push(merged);
                    }
                }
            }
            dedup(&mut next);
            // Keep intermediate products bounded; final filtering below.
            if next.len() > self.config.max_cuts * 4 {
                self.sort_by_priority(builder, &mut next);
                next.truncate(self.config.max_cuts * 4);
            }
            partial = next;
        }

        filter_dominated(&mut partial);
        self.sort_by_priority(builder, &mut partial);
        partial.truncate(self.config.max_cuts.saturating_sub(1));
        partial.insert(0, Cut::trivial(entry));
        partial
    }

    /// Orders cuts by (size, Σ leaf depth, Σ leaf refcount), best first.
    fn sort_by_priority(&self, builder: &SubnetBuilder, cuts: &mut [Cut]) {
        cuts.sort_by_key(|cut| {
            let depth_sum: u64 = cut.leaves.iter().map(|&l| builder.depth(l) as u64).sum();
            let cut_factor: u64 = cut
                .leaves
                .iter()
                .map(|&l| builder.refcount(l) as u64)
                .sum();
            (cut.size(), depth_sum, cut_factor)
        });
    }
}

fn dedup(cuts: &mut Vec<Cut>) {
    let mut seen: Vec<(u64, Vec<EntryId>)> = Vec::with_capacity(cuts.len());
    cuts.retain(|cut| {
        let key = (cut.signature, cut.leaf_vec());
        if seen.contains(&key) {
            false
        } else {
            seen.push(key);
            true
        }
    });
}

/// Removes every cut strictly dominated by another stored cut.
fn filter_dominated(cuts: &mut Vec<Cut>) {
    let snapshot = cuts.clone();
    let mut index = 0;
    cuts.retain(|cut| {
        let my_index = index;
        index += 1;
        !snapshot.iter().enumerate().any(|(j, other)| {
            j != my_index && other.dominates(cut) && other.leaves != cut.leaves
        })
    });
}
