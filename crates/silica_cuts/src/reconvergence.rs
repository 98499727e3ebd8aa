//! Reconvergence-driven windows.

use silica_subnet::{EntryId, InOutMapping, SubnetBuilder};

/// Grows a window around `roots` by repeatedly expanding the cheapest
/// leaf until no expansion fits in `cut_size`.
///
/// A leaf's expansion cost is the number of its fanins that are neither
/// constants nor already collected; sources cannot expand. Constants are
/// permanent interior cells and never become leaves. When the transitive
/// fanin is all-constant the degenerate mapping `{roots, roots}` is
/// returned.
///
/// Uses a mark session on the builder; marks are cleared before return.
pub fn reconvergent_cut(
    builder: &mut SubnetBuilder,
    roots: &[EntryId],
    cut_size: usize,
) -> InOutMapping {
    assert!(
        roots.len() <= cut_size,
        "more roots than the window allows"
    );

    let mut leaves: Vec<EntryId> = roots.to_vec();
    builder.start_session();
    for &root in roots {
        builder.mark(root);
    }

    loop {
        let best = find_best_leaf(builder, &leaves, cut_size);
        let Some(best) = best else {
            builder.end_session();
            if leaves.is_empty() {
                // Only constant inputs below the roots.
                return InOutMapping::new(roots.to_vec(), roots.to_vec());
            }
            leaves.sort_by_key(|e| e.as_raw());
            return InOutMapping::new(leaves, roots.to_vec());
        };

        // Replace the chosen leaf by its non-constant, uncollected fanins.
        let expanded = leaves.swap_remove(best);
        for link in builder.links(expanded).to_vec() {
            let cell = builder.cell(link.idx);
            if !cell.symbol.is_const() && !builder.is_marked(link.idx) {
                builder.mark(link.idx);
                leaves.push(link.idx);
            }
        }
    }
}

/// Picks the leaf whose expansion grows the window least; `None` when no
/// leaf can expand within the bound.
fn find_best_leaf(
    builder: &SubnetBuilder,
    leaves: &[EntryId],
    cut_size: usize,
) -> Option<usize> {
    let mut best: Option<(u32, usize)> = None;
    for (i, &leaf) in leaves.iter().enumerate() {
        let Some(cost) = expansion_cost(builder, leaf) else {
            continue;
        };
        if best.map_or(true, |(c, _)| cost < c) {
            best = Some((cost, i));
            if cost == 0 {
                break;
            }
        }
    }
    let (cost, index) = best?;
    // Expanding removes one leaf and adds `cost` new ones.
    if leaves.len() - 1 + cost as usize > cut_size {
        return None;
    }
    Some(index)
}

/// The number of leaves an expansion would add; `None` for sources.
fn expansion_cost(builder: &SubnetBuilder, leaf: EntryId) -> Option<u32> {
    let cell = builder.cell(leaf);
    if cell.symbol.is_source() {
        return None;
    }
    let mut cost = 0;
    for link in &cell.links {
        let fanin = builder.cell(link.idx);
        if !fanin.symbol.is_const() && !builder.is_marked(link.idx) {
            cost += 1;
        }
    }
    Some(cost)
}
