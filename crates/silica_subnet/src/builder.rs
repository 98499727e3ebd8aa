//! The mutable presentation of a subnet.

use crate::cell::{Cell, CellSymbol};
use crate::error::SubnetError;
use crate::link::Link;
use crate::subnet::{Subnet, SubnetEntry};
use crate::view::InOutMapping;
use crate::{EntryId, FlopId};
use std::collections::{HashMap, HashSet};

/// Sentinel for "no neighbor" in the intrusive order list.
const NONE: u32 = u32::MAX;

/// Net change reported by [`SubnetBuilder::evaluate_replace`].
///
/// Positive values are improvements: cells removed, depth reduced, weight
/// reduced.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Effect {
    /// Cells deleted minus cells added.
    pub delta_cells: i32,
    /// Old root depth minus new root depth (max over roots).
    pub delta_depth: i32,
    /// Old cone weight minus new cone weight.
    pub delta_weight: f32,
}

/// Maps the sum of a candidate cell's fanin weights and its prospective
/// fanout to the cell's weight. Applied identically by
/// [`SubnetBuilder::evaluate_replace`] and [`SubnetBuilder::replace`],
/// before any fanout scaling done by downstream cost propagation.
pub type WeightModifier<'a> = &'a dyn Fn(f32, u32) -> f32;

/// One entry slot of the builder arena.
#[derive(Clone, Debug)]
struct Slot {
    cell: Cell,
    refcount: u32,
    depth: u32,
    weight: f32,
    mark: bool,
    flop: Option<FlopId>,
    live: bool,
    /// Consumers: (holder entry, link port at the holder).
    fanouts: Vec<(EntryId, u16)>,
    next: u32,
    prev: u32,
}

/// Where a planned link points: an existing parent entry or a cell the
/// plan will create.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum PlanTarget {
    Parent(EntryId),
    New(u32),
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
struct PlanLink {
    target: PlanTarget,
    out: u16,
    inv: bool,
}

#[derive(Clone, Debug)]
struct PlanCell {
    symbol: CellSymbol,
    links: Vec<PlanLink>,
    depth: u32,
    weight: f32,
}

/// The precomputed outcome of a replacement: what would be created, how
/// the old roots' consumers would be rewired, and what would be deleted.
///
/// Produced by planning; [`SubnetBuilder::evaluate_replace`] returns only
/// its [`Effect`], [`SubnetBuilder::replace`] executes it.
#[derive(Debug)]
pub struct ReplacePlan {
    cells: Vec<PlanCell>,
    /// Per root: (old root entry, rewiring target).
    outs: Vec<(EntryId, PlanLink)>,
    deleted: Vec<EntryId>,
    effect: Effect,
}

impl ReplacePlan {
    /// Returns the net change the plan would apply.
    pub fn effect(&self) -> Effect {
        self.effect
    }
}

/// A mutable Boolean network with arity- and fanout-aware bookkeeping.
///
/// Entries live in a flat arena and are never moved; topological iteration
/// order is kept in an intrusive doubly-linked list so local rewrites can
/// splice new cells in front of the entry they feed. Deletion is logical:
/// a slot whose refcount drops to zero is unlinked from the order and
/// ignored by [`make`](Self::make).
///
/// A builder is exclusively owned by the pass mutating it; snapshots from
/// [`make`](Self::make) are independent and immutable.
pub struct SubnetBuilder {
    slots: Vec<Slot>,
    head: u32,
    tail: u32,
    /// Last input entry in order (inputs stay a prefix).
    last_in: u32,
    /// First output entry in order (outputs stay a suffix).
    first_out: u32,
    in_count: u32,
    out_count: u32,
    live_count: u32,
    strash: HashMap<(CellSymbol, Vec<Link>), EntryId>,
    session_active: bool,
    session_marks: Vec<EntryId>,
}

impl Default for SubnetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SubnetBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            head: NONE,
            tail: NONE,
            last_in: NONE,
            first_out: NONE,
            in_count: 0,
            out_count: 0,
            live_count: 0,
            strash: HashMap::new(),
            session_active: false,
            session_marks: Vec::new(),
        }
    }

    /// Rebuilds a mutable presentation of a snapshot.
    pub fn from_subnet(subnet: &Subnet) -> Self {
        let mut builder = Self::new();
        let mut links_of: Vec<Link> = Vec::with_capacity(subnet.len());
        for (i, entry) in subnet.entries().enumerate() {
            let cell = &entry.cell;
            let translate = |link: &Link| links_of[link.idx.index()].invert_if(link.inv);
            let link = match cell.symbol {
                CellSymbol::In => builder.add_input(),
                CellSymbol::Out => builder.add_output(translate(&cell.links[0])),
                _ => {
                    let links = cell.links.iter().map(translate).collect();
                    builder.add_cell_multi(cell.symbol, links, cell.outs)
                }
            };
            if let Some(flop) = entry.flop {
                builder.slots[link.idx.index()].flop = Some(flop);
            }
            links_of.push(link);
            debug_assert!(i + 1 == links_of.len());
        }
        builder
    }

    /// Builds a single-output constant subnet with `in_num` unused inputs.
    pub fn make_const(in_num: usize, value: bool) -> Subnet {
        let mut builder = Self::new();
        for _ in 0..in_num {
            builder.add_input();
        }
        let symbol = if value { CellSymbol::One } else { CellSymbol::Zero };
        let constant = builder.add_cell(symbol, vec![]);
        builder.add_output(constant);
        builder.make()
    }

    // --- Construction -----------------------------------------------------

    /// Appends a fresh `In` entry and returns a link to it.
    pub fn add_input(&mut self) -> Link {
        let id = self.new_slot(Cell::new(CellSymbol::In, vec![]), 1);
        self.link_after(id, self.last_in);
        self.last_in = id.as_raw();
        self.in_count += 1;
        Link::to(id)
    }

    /// Adds an inner cell, reusing a live structurally identical one when
    /// present. Returns a link to the (new or reused) cell.
    ///
    /// # Panics
    ///
    /// Panics if a source link is dead or out of range, or if the arity
    /// does not fit the symbol.
    pub fn add_cell(&mut self, symbol: CellSymbol, links: Vec<Link>) -> Link {
        self.add_cell_multi(symbol, links, 1)
    }

    /// Adds an inner cell with an explicit output count (multi-output is
    /// only meaningful for library cells).
    pub fn add_cell_multi(&mut self, symbol: CellSymbol, links: Vec<Link>, outs: u16) -> Link {
        assert!(
            !symbol.is_in() && !symbol.is_out(),
            "use add_input/add_output for boundary entries"
        );
        self.check_arity(symbol, links.len() as u16);
        for link in &links {
            assert!(self.is_live(link.idx), "dangling source link {link:?}");
        }

        let key = (symbol, links.clone());
        if let Some(&existing) = self.strash.get(&key) {
            if self.is_live(existing) {
                return Link::to(existing);
            }
        }

        let mut cell = Cell::new(symbol, links);
        cell.outs = outs;
        let depth = self.depth_of_links(&cell.links);
        let id = self.new_slot(cell, outs);
        self.slots[id.index()].depth = depth;

        // Inner cells sit after the last input and before the first output.
        let anchor = if self.first_out != NONE {
            self.slots[self.first_out as usize].prev
        } else {
            self.tail
        };
        self.link_after(id, anchor);

        for (port, link) in self.slots[id.index()].cell.links.clone().iter().enumerate() {
            self.attach(link.idx, id, port as u16);
        }
        self.strash.insert(key, id);
        Link::to(id)
    }

    /// Adds a balanced tree of `symbol` cells over `links`, each of arity
    /// at most `max_arity`. `symbol` must be associative.
    pub fn add_cell_tree(&mut self, symbol: CellSymbol, links: Vec<Link>, max_arity: u16) -> Link {
        assert!(symbol.is_associative(), "{symbol:?} does not fold into a tree");
        assert!(max_arity >= 2);
        if links.len() == 1 {
            return links[0];
        }
        if links.len() <= max_arity as usize {
            return self.add_cell(symbol, links);
        }
        let mut layer = links;
        while layer.len() > max_arity as usize {
            let mut next = Vec::with_capacity(layer.len() / max_arity as usize + 1);
            for chunk in layer.chunks(max_arity as usize) {
                if chunk.len() == 1 {
                    next.push(chunk[0]);
                } else {
                    next.push(self.add_cell(symbol, chunk.to_vec()));
                }
            }
            layer = next;
        }
        self.add_cell(symbol, layer)
    }

    /// Appends a terminal `Out` entry referencing `link`.
    pub fn add_output(&mut self, link: Link) -> Link {
        assert!(self.is_live(link.idx), "dangling output link {link:?}");
        let depth = self.depth(link.idx) + 1;
        let id = self.new_slot(Cell::new(CellSymbol::Out, vec![link]), 1);
        self.slots[id.index()].depth = depth;
        self.link_after(id, self.tail);
        if self.first_out == NONE {
            self.first_out = id.as_raw();
        }
        self.out_count += 1;
        self.attach(link.idx, id, 0);
        Link::to(id)
    }

    /// Inlines the cells of `other`, remapping its inputs through `inputs`,
    /// and returns links corresponding to its outputs.
    pub fn add_subnet(&mut self, other: &Subnet, inputs: &[Link]) -> Vec<Link> {
        assert_eq!(
            inputs.len(),
            other.in_num() as usize,
            "input link count does not match the inlined subnet"
        );
        let mut xlat: Vec<Link> = Vec::with_capacity(other.len());
        let mut outputs = Vec::with_capacity(other.out_num() as usize);
        for (i, entry) in other.entries().enumerate() {
            let cell = &entry.cell;
            let translate =
                |link: &Link| xlat[link.idx.index()].invert_if(link.inv);
            match cell.symbol {
                CellSymbol::In => xlat.push(inputs[i]),
                CellSymbol::Out => {
                    let out = translate(&cell.links[0]);
                    outputs.push(out);
                    xlat.push(out);
                }
                symbol => {
                    let links = cell.links.iter().map(translate).collect();
                    xlat.push(self.add_cell_multi(symbol, links, cell.outs));
                }
            }
        }
        outputs
    }

    // --- Accessors --------------------------------------------------------

    /// Returns the cell at `id`.
    pub fn cell(&self, id: EntryId) -> &Cell {
        &self.slots[id.index()].cell
    }

    /// Returns the `port`-th fanin link of `id`.
    pub fn link(&self, id: EntryId, port: u16) -> Link {
        self.slots[id.index()].cell.links[port as usize]
    }

    /// Returns all fanin links of `id`.
    pub fn links(&self, id: EntryId) -> &[Link] {
        &self.slots[id.index()].cell.links
    }

    /// Returns the fanout count of `id`.
    pub fn refcount(&self, id: EntryId) -> u32 {
        self.slots[id.index()].refcount
    }

    /// Returns the consumers of `id` as `(holder, port)` pairs.
    pub fn fanouts(&self, id: EntryId) -> &[(EntryId, u16)] {
        &self.slots[id.index()].fanouts
    }

    /// Returns the longest distance from any source to `id`.
    pub fn depth(&self, id: EntryId) -> u32 {
        self.slots[id.index()].depth
    }

    /// Returns the scratch weight of `id`.
    pub fn weight(&self, id: EntryId) -> f32 {
        self.slots[id.index()].weight
    }

    /// Sets the scratch weight of `id`.
    pub fn set_weight(&mut self, id: EntryId, weight: f32) {
        self.slots[id.index()].weight = weight;
    }

    /// Returns the flip-flop tag of a boundary entry.
    pub fn flop(&self, id: EntryId) -> Option<FlopId> {
        self.slots[id.index()].flop
    }

    /// Tags a boundary entry with its sequential element.
    pub fn set_flop(&mut self, id: EntryId, flop: FlopId) {
        self.slots[id.index()].flop = Some(flop);
    }

    /// Returns `true` if `id` names a live entry.
    pub fn is_live(&self, id: EntryId) -> bool {
        id.index() < self.slots.len() && self.slots[id.index()].live
    }

    /// Returns the number of live entries (including `In`/`Out`).
    pub fn len(&self) -> usize {
        self.live_count as usize
    }

    /// Returns `true` if the builder has no live entries.
    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    /// Returns the arena size (live and dead slots).
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of primary inputs.
    pub fn in_num(&self) -> u32 {
        self.in_count
    }

    /// Returns the number of primary outputs.
    pub fn out_num(&self) -> u32 {
        self.out_count
    }

    /// Returns the IDs of the input entries in order.
    pub fn input_ids(&self) -> Vec<EntryId> {
        self.iter().take(self.in_count as usize).collect()
    }

    /// Returns the IDs of the output entries in order.
    pub fn output_ids(&self) -> Vec<EntryId> {
        let skip = self.len() - self.out_count as usize;
        self.iter().skip(skip).collect()
    }

    /// Iterates live entries in topological order.
    pub fn iter(&self) -> OrderIter<'_> {
        OrderIter {
            builder: self,
            cursor: self.head,
        }
    }

    /// Returns the entry following `id` in topological order.
    pub fn next_entry(&self, id: EntryId) -> Option<EntryId> {
        let next = self.slots[id.index()].next;
        (next != NONE).then(|| EntryId::from_raw(next))
    }

    /// Returns the entry preceding `id` in topological order.
    pub fn prev_entry(&self, id: EntryId) -> Option<EntryId> {
        let prev = self.slots[id.index()].prev;
        (prev != NONE).then(|| EntryId::from_raw(prev))
    }

    /// Returns the first entry in topological order.
    pub fn first_entry(&self) -> Option<EntryId> {
        (self.head != NONE).then(|| EntryId::from_raw(self.head))
    }

    // --- Marks and sessions ----------------------------------------------

    /// Opens a mark session. Sessions do not nest.
    pub fn start_session(&mut self) {
        assert!(!self.session_active, "mark sessions do not nest");
        self.session_active = true;
    }

    /// Closes the mark session, clearing every mark set inside it.
    pub fn end_session(&mut self) {
        assert!(self.session_active, "no open mark session");
        for id in self.session_marks.drain(..) {
            self.slots[id.index()].mark = false;
        }
        self.session_active = false;
    }

    /// Marks an entry for the duration of the session.
    pub fn mark(&mut self, id: EntryId) {
        if !self.slots[id.index()].mark {
            self.slots[id.index()].mark = true;
            self.session_marks.push(id);
        }
    }

    /// Clears an entry's mark.
    pub fn unmark(&mut self, id: EntryId) {
        self.slots[id.index()].mark = false;
    }

    /// Returns the session mark of `id`.
    pub fn is_marked(&self, id: EntryId) -> bool {
        self.slots[id.index()].mark
    }

    // --- Replace ----------------------------------------------------------

    /// Computes what replacing the cone rooted at `mapping.outputs` with
    /// `rhs` would change, without mutating anything.
    pub fn evaluate_replace(
        &self,
        rhs: &Subnet,
        mapping: &InOutMapping,
        modifier: Option<WeightModifier>,
    ) -> Result<Effect, SubnetError> {
        Ok(self.plan_replace(rhs, mapping, modifier)?.effect())
    }

    /// Applies a replacement: inlines `rhs` (reusing structurally
    /// identical cells), rewires every consumer of the old roots to the
    /// new roots with inversion propagation, deletes cells whose refcount
    /// drops to zero, and recomputes depths along the forward frontier.
    ///
    /// `on_affected` is invoked once per affected entry: each inlined
    /// cell, each rewired consumer, and each entry whose depth changed.
    pub fn replace(
        &mut self,
        rhs: &Subnet,
        mapping: &InOutMapping,
        modifier: Option<WeightModifier>,
        mut on_affected: Option<&mut dyn FnMut(EntryId)>,
    ) -> Result<Effect, SubnetError> {
        let plan = self.plan_replace(rhs, mapping, modifier)?;
        let effect = plan.effect();
        let mut affected: HashSet<EntryId> = HashSet::new();

        // 1. Create the planned cells, splicing them in front of the
        //    earliest root so topological order is preserved.
        let anchor_root = self.earliest_in_order(&plan.outs);
        let mut created: Vec<EntryId> = Vec::with_capacity(plan.cells.len());
        for cell in &plan.cells {
            let links: Vec<Link> = cell
                .links
                .iter()
                .map(|pl| {
                    let idx = match pl.target {
                        PlanTarget::Parent(e) => e,
                        PlanTarget::New(k) => created[k as usize],
                    };
                    Link::to_port(idx, pl.out, pl.inv)
                })
                .collect();
            let id = self.new_slot(Cell::new(cell.symbol, links.clone()), 1);
            self.slots[id.index()].depth = cell.depth;
            self.slots[id.index()].weight = cell.weight;
            self.link_after(id, self.slots[anchor_root.index()].prev);
            for (port, link) in links.iter().enumerate() {
                self.attach(link.idx, id, port as u16);
            }
            self.strash.insert((cell.symbol, links), id);
            created.push(id);
            affected.insert(id);
        }

        // 2. Rewire consumers of each old root to the new root links.
        for (root, target) in &plan.outs {
            let new_idx = match target.target {
                PlanTarget::Parent(e) => e,
                PlanTarget::New(k) => created[k as usize],
            };
            if new_idx == *root && !target.inv && target.out == 0 {
                continue; // identity rewrite: nothing moves
            }
            if new_idx == *root {
                // Same driver, different polarity or port.
                let consumers = self.slots[root.index()].fanouts.clone();
                for (holder, port) in consumers {
                    let old_link = self.slots[holder.index()].cell.links[port as usize];
                    let new_link =
                        Link::to_port(new_idx, target.out, old_link.inv ^ target.inv);
                    self.set_holder_link(holder, port, new_link);
                    affected.insert(holder);
                }
                continue;
            }
            let consumers = std::mem::take(&mut self.slots[root.index()].fanouts);
            self.slots[root.index()].refcount = 0;
            for (holder, port) in consumers {
                let old_link = self.slots[holder.index()].cell.links[port as usize];
                debug_assert_eq!(old_link.idx, *root);
                let new_link = Link::to_port(new_idx, target.out, old_link.inv ^ target.inv);
                self.set_holder_link(holder, port, new_link);
                self.attach(new_idx, holder, port);
                affected.insert(holder);
            }
        }

        // 3. Refcount-driven deletion from the abandoned roots.
        let mut stack: Vec<EntryId> = plan.outs.iter().map(|(root, _)| *root).collect();
        while let Some(id) = stack.pop() {
            if !self.is_live(id) || self.slots[id.index()].refcount > 0 {
                continue;
            }
            let symbol = self.slots[id.index()].cell.symbol;
            if symbol.is_in() || symbol.is_out() {
                continue;
            }
            for link in self.delete_entry(id) {
                stack.push(link.idx);
            }
        }

        // 4. Forward depth recomputation from the rewired frontier.
        let mut worklist: Vec<EntryId> = affected.iter().copied().filter(|&e| self.is_live(e)).collect();
        while let Some(id) = worklist.pop() {
            if !self.is_live(id) {
                continue;
            }
            let new_depth = self.depth_of_links(&self.slots[id.index()].cell.links);
            let slot = &mut self.slots[id.index()];
            if slot.cell.symbol.is_source() || slot.depth == new_depth {
                continue;
            }
            slot.depth = new_depth;
            affected.insert(id);
            for (holder, _) in self.slots[id.index()].fanouts.clone() {
                worklist.push(holder);
            }
        }

        // Callbacks fire in topological order so consumers that rebuild
        // per-entry state (cut sets) always see current fanin state.
        if let Some(callback) = on_affected.as_deref_mut() {
            for id in self.iter() {
                if affected.contains(&id) {
                    callback(id);
                }
            }
        }

        Ok(effect)
    }

    // --- Snapshot ---------------------------------------------------------

    /// Snapshots the builder into an immutable, renumbered [`Subnet`].
    ///
    /// The builder may continue to be mutated afterwards without aliasing
    /// the snapshot.
    pub fn make(&self) -> Subnet {
        let mut renumber: HashMap<EntryId, u32> = HashMap::with_capacity(self.len());
        let mut entries = Vec::with_capacity(self.len());
        for id in self.iter() {
            let slot = &self.slots[id.index()];
            let links = slot
                .cell
                .links
                .iter()
                .map(|link| Link {
                    idx: EntryId::from_raw(renumber[&link.idx]),
                    out: link.out,
                    inv: link.inv,
                })
                .collect();
            renumber.insert(id, entries.len() as u32);
            entries.push(SubnetEntry {
                cell: Cell {
                    symbol: slot.cell.symbol,
                    links,
                    outs: slot.cell.outs,
                },
                flop: slot.flop,
            });
        }
        Subnet::from_parts(entries, self.in_count, self.out_count)
    }

    /// Checks the builder invariants: refcounts equal actual fanout
    /// counts, depths match their definition, and every link points at an
    /// entry earlier in topological order.
    pub fn validate(&self) -> Result<(), SubnetError> {
        let mut position: HashMap<EntryId, usize> = HashMap::with_capacity(self.len());
        for (pos, id) in self.iter().enumerate() {
            position.insert(id, pos);
        }
        let mut actual_refs: HashMap<EntryId, u32> = HashMap::new();
        for id in self.iter() {
            let slot = &self.slots[id.index()];
            for link in &slot.cell.links {
                if !self.is_live(link.idx) {
                    return Err(SubnetError::DanglingLink(link.idx));
                }
                if position[&link.idx] >= position[&id] {
                    return Err(SubnetError::ForwardLink {
                        holder: id,
                        target: link.idx,
                    });
                }
                *actual_refs.entry(link.idx).or_default() += 1;
            }
            let expected = if slot.cell.symbol.is_source() {
                0
            } else {
                self.depth_of_links(&slot.cell.links)
            };
            if slot.depth != expected {
                return Err(SubnetError::DepthMismatch {
                    entry: id,
                    stored: slot.depth,
                    actual: expected,
                });
            }
        }
        for id in self.iter() {
            let stored = self.slots[id.index()].refcount;
            let actual = actual_refs.get(&id).copied().unwrap_or(0);
            if stored != actual {
                return Err(SubnetError::RefcountMismatch {
                    entry: id,
                    stored,
                    actual,
                });
            }
        }
        Ok(())
    }

    // --- Internals --------------------------------------------------------

    fn plan_replace(
        &self,
        rhs: &Subnet,
        mapping: &InOutMapping,
        modifier: Option<WeightModifier>,
    ) -> Result<ReplacePlan, SubnetError> {
        if mapping.inputs.len() != rhs.in_num() as usize {
            return Err(SubnetError::MappingMismatch(format!(
                "rhs has {} inputs, mapping supplies {}",
                rhs.in_num(),
                mapping.inputs.len()
            )));
        }
        if mapping.outputs.len() != rhs.out_num() as usize {
            return Err(SubnetError::MappingMismatch(format!(
                "rhs has {} outputs, mapping covers {}",
                rhs.out_num(),
                mapping.outputs.len()
            )));
        }

        let mut cells: Vec<PlanCell> = Vec::new();
        let mut plan_strash: HashMap<(CellSymbol, Vec<PlanLink>), u32> = HashMap::new();
        let mut xlat: Vec<PlanLink> = Vec::with_capacity(rhs.len());
        let mut outs: Vec<(EntryId, PlanLink)> = Vec::new();

        for (i, entry) in rhs.entries().enumerate() {
            let cell = &entry.cell;
            let resolve = |link: &Link, xlat: &[PlanLink]| {
                let base = xlat[link.idx.index()];
                PlanLink {
                    target: base.target,
                    out: base.out.max(link.out),
                    inv: base.inv ^ link.inv,
                }
            };
            match cell.symbol {
                CellSymbol::In => {
                    let parent = mapping.inputs[i];
                    xlat.push(PlanLink {
                        target: PlanTarget::Parent(parent),
                        out: 0,
                        inv: false,
                    });
                }
                CellSymbol::Out => {
                    let resolved = resolve(&cell.links[0], &xlat);
                    outs.push((mapping.outputs[outs.len()], resolved));
                    xlat.push(resolved);
                }
                symbol => {
                    let links: Vec<PlanLink> =
                        cell.links.iter().map(|l| resolve(l, &xlat)).collect();

                    // Reuse a live parent cell when every fanin resolves
                    // into the parent and the shape already exists there.
                    let parent_links: Option<Vec<Link>> = links
                        .iter()
                        .map(|pl| match pl.target {
                            PlanTarget::Parent(e) => Some(Link::to_port(e, pl.out, pl.inv)),
                            PlanTarget::New(_) => None,
                        })
                        .collect();
                    if let Some(parent_links) = parent_links {
                        if let Some(&existing) = self.strash.get(&(symbol, parent_links)) {
                            if self.is_live(existing) {
                                xlat.push(PlanLink {
                                    target: PlanTarget::Parent(existing),
                                    out: 0,
                                    inv: false,
                                });
                                continue;
                            }
                        }
                    }

                    let key = (symbol, links.clone());
                    if let Some(&k) = plan_strash.get(&key) {
                        xlat.push(PlanLink {
                            target: PlanTarget::New(k),
                            out: 0,
                            inv: false,
                        });
                        continue;
                    }

                    let depth = if symbol.is_const() {
                        0
                    } else {
                        1 + links
                            .iter()
                            .map(|pl| match pl.target {
                                PlanTarget::Parent(e) => self.depth(e),
                                PlanTarget::New(k) => cells[k as usize].depth,
                            })
                            .max()
                            .unwrap_or(0)
                    };
                    let k = cells.len() as u32;
                    cells.push(PlanCell {
                        symbol,
                        links,
                        depth,
                        weight: 0.0,
                    });
                    plan_strash.insert(key, k);
                    xlat.push(PlanLink {
                        target: PlanTarget::New(k),
                        out: 0,
                        inv: false,
                    });
                }
            }
        }

        // Weights: fanout of each planned cell is its in-plan reference
        // count plus the consumers inherited from roots it takes over.
        if let Some(modifier) = modifier {
            let mut fanout = vec![0u32; cells.len()];
            for cell in &cells {
                for pl in &cell.links {
                    if let PlanTarget::New(k) = pl.target {
                        fanout[k as usize] += 1;
                    }
                }
            }
            for (root, target) in &outs {
                if let PlanTarget::New(k) = target.target {
                    fanout[k as usize] += self.refcount(*root);
                }
            }
            for k in 0..cells.len() {
                let fanin_weight: f32 = cells[k]
                    .links
                    .clone()
                    .iter()
                    .map(|pl| match pl.target {
                        PlanTarget::Parent(e) => self.weight(e),
                        PlanTarget::New(j) => cells[j as usize].weight,
                    })
                    .sum();
                cells[k].weight = modifier(fanin_weight, fanout[k]);
            }
        }

        // Deletion simulation with virtual refcounts.
        let mut extra: HashMap<EntryId, i64> = HashMap::new();
        for cell in &cells {
            for pl in &cell.links {
                if let PlanTarget::Parent(e) = pl.target {
                    *extra.entry(e).or_default() += 1;
                }
            }
        }
        let mut seeds: Vec<EntryId> = Vec::new();
        for (root, target) in &outs {
            let consumers = self.refcount(*root) as i64;
            if let PlanTarget::Parent(e) = target.target {
                if e == *root {
                    continue; // identity rewrite: nothing moves
                }
                *extra.entry(e).or_default() += consumers;
            }
            *extra.entry(*root).or_default() -= consumers;
            seeds.push(*root);
        }

        let mut deleted: HashSet<EntryId> = HashSet::new();
        let mut stack = seeds;
        while let Some(id) = stack.pop() {
            if deleted.contains(&id) {
                continue;
            }
            let symbol = self.cell(id).symbol;
            if symbol.is_in() || symbol.is_out() {
                continue;
            }
            let eff = self.refcount(id) as i64 + extra.get(&id).copied().unwrap_or(0);
            if eff > 0 {
                continue;
            }
            deleted.insert(id);
            for link in self.links(id) {
                *extra.entry(link.idx).or_default() -= 1;
                stack.push(link.idx);
            }
        }

        // Effect.
        let old_depth = mapping
            .outputs
            .iter()
            .map(|&r| self.depth(r))
            .max()
            .unwrap_or(0);
        let new_depth = outs
            .iter()
            .map(|(_, target)| match target.target {
                PlanTarget::Parent(e) => self.depth(e),
                PlanTarget::New(k) => cells[k as usize].depth,
            })
            .max()
            .unwrap_or(0);
        let old_weight: f32 = deleted.iter().map(|&e| self.weight(e)).sum();
        let new_weight: f32 = cells.iter().map(|c| c.weight).sum();

        let effect = Effect {
            delta_cells: deleted.len() as i32 - cells.len() as i32,
            delta_depth: old_depth as i32 - new_depth as i32,
            delta_weight: old_weight - new_weight,
        };

        let mut deleted: Vec<EntryId> = deleted.into_iter().collect();
        deleted.sort_by_key(|e| e.as_raw());

        Ok(ReplacePlan {
            cells,
            outs,
            deleted,
            effect,
        })
    }

    /// Updates one fanin link of `holder`, keeping the structural-hash
    /// index consistent with the holder's new shape.
    fn set_holder_link(&mut self, holder: EntryId, port: u16, new_link: Link) {
        let symbol = self.slots[holder.index()].cell.symbol;
        if !symbol.is_out() {
            let old_key = (symbol, self.slots[holder.index()].cell.links.clone());
            if self.strash.get(&old_key) == Some(&holder) {
                self.strash.remove(&old_key);
            }
        }
        self.slots[holder.index()].cell.links[port as usize] = new_link;
        if !symbol.is_out() {
            let new_key = (symbol, self.slots[holder.index()].cell.links.clone());
            self.strash.entry(new_key).or_insert(holder);
        }
    }

    /// Deletes a zero-refcount entry, returning its fanin links for the
    /// caller's cascade.
    fn delete_entry(&mut self, id: EntryId) -> Vec<Link> {
        debug_assert_eq!(self.slots[id.index()].refcount, 0);
        let links = std::mem::take(&mut self.slots[id.index()].cell.links);
        for (port, link) in links.iter().enumerate() {
            self.detach(link.idx, id, port as u16);
        }
        let symbol = self.slots[id.index()].cell.symbol;
        self.strash.remove(&(symbol, links.clone()));
        self.unlink(id);
        self.slots[id.index()].live = false;
        self.live_count -= 1;
        links
    }

    fn earliest_in_order(&self, outs: &[(EntryId, PlanLink)]) -> EntryId {
        debug_assert!(!outs.is_empty());
        if outs.len() == 1 {
            return outs[0].0;
        }
        let roots: HashSet<EntryId> = outs.iter().map(|(r, _)| *r).collect();
        self.iter()
            .find(|id| roots.contains(id))
            .expect("roots must be live entries")
    }

    fn depth_of_links(&self, links: &[Link]) -> u32 {
        links
            .iter()
            .map(|l| self.depth(l.idx) + 1)
            .max()
            .unwrap_or(0)
    }

    fn check_arity(&self, symbol: CellSymbol, arity: u16) {
        let ok = match symbol {
            CellSymbol::Zero | CellSymbol::One => arity == 0,
            CellSymbol::Buf | CellSymbol::Not => arity == 1,
            CellSymbol::And
            | CellSymbol::Or
            | CellSymbol::Xor
            | CellSymbol::Nand
            | CellSymbol::Nor
            | CellSymbol::Xnor => arity >= 2,
            CellSymbol::Maj => arity == 3,
            CellSymbol::Cell(_) => true,
            CellSymbol::In | CellSymbol::Out => false,
        };
        assert!(ok, "symbol {symbol:?} does not take {arity} inputs");
    }

    fn new_slot(&mut self, cell: Cell, _outs: u16) -> EntryId {
        let id = EntryId::from_raw(self.slots.len() as u32);
        self.slots.push(Slot {
            cell,
            refcount: 0,
            depth: 0,
            weight: 0.0,
            mark: false,
            flop: None,
            live: true,
            fanouts: Vec::new(),
            next: NONE,
            prev: NONE,
        });
        self.live_count += 1;
        id
    }

    fn attach(&mut self, source: EntryId, holder: EntryId, port: u16) {
        self.slots[source.index()].refcount += 1;
        self.slots[source.index()].fanouts.push((holder, port));
    }

    fn detach(&mut self, source: EntryId, holder: EntryId, port: u16) {
        let slot = &mut self.slots[source.index()];
        slot.refcount -= 1;
        if let Some(pos) = slot.fanouts.iter().position(|&(h, p)| h == holder && p == port) {
            slot.fanouts.swap_remove(pos);
        }
    }

    /// Splices `id` into the order list after `anchor` (or at the head
    /// when `anchor` is `NONE`).
    fn link_after(&mut self, id: EntryId, anchor: u32) {
        let raw = id.as_raw();
        if anchor == NONE {
            let old_head = self.head;
            self.slots[id.index()].next = old_head;
            self.slots[id.index()].prev = NONE;
            if old_head != NONE {
                self.slots[old_head as usize].prev = raw;
            }
            self.head = raw;
            if self.tail == NONE {
                self.tail = raw;
            }
        } else {
            let next = self.slots[anchor as usize].next;
            self.slots[id.index()].prev = anchor;
            self.slots[id.index()].next = next;
            self.slots[anchor as usize].next = raw;
            if next != NONE {
                self.slots[next as usize].prev = raw;
            } else {
                self.tail = raw;
            }
        }
    }

    fn unlink(&mut self, id: EntryId) {
        let raw = id.as_raw();
        let (prev, next) = {
            let slot = &self.slots[id.index()];
            (slot.prev, slot.next)
        };
        if prev != NONE {
            self.slots[prev as usize].next = next;
        } else {
            self.head = next;
        }
        if next != NONE {
            self.slots[next as usize].prev = prev;
        } else {
            self.tail = prev;
        }
        if self.last_in == raw {
            self.last_in = prev;
        }
        if self.first_out == raw {
            self.first_out = next;
        }
        let slot = &mut self.slots[id.index()];
        slot.prev = NONE;
        slot.next = NONE;
    }

}

/// Iterator over live entries in topological order.
pub struct OrderIter<'a> {
    builder: &'a SubnetBuilder,
    cursor: u32,
}

impl Iterator for OrderIter<'_> {
    type Item = EntryId;

    fn next(&mut self) -> Option<EntryId> {
        if self.cursor == NONE {
            return None;
        }
        let id = EntryId::from_raw(self.cursor);
        self.cursor = self.builder.slots[self.cursor as usize].next;
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn and2() -> (SubnetBuilder, Link, Link, Link) {
        let mut builder = SubnetBuilder::new();
        let a = builder.add_input();
        let b = builder.add_input();
        let and = builder.add_cell(CellSymbol::And, vec![a, b]);
        builder.add_output(and);
        (builder, a, b, and)
    }

    #[test]
    fn construction_bookkeeping() {
        let (builder, a, _, and) = and2();
        assert_eq!(builder.len(), 4);
        assert_eq!(builder.in_num(), 2);
        assert_eq!(builder.out_num(), 1);
        assert_eq!(builder.refcount(a.idx), 1);
        assert_eq!(builder.refcount(and.idx), 1);
        assert_eq!(builder.depth(and.idx), 1);
        builder.validate().unwrap();
    }

    #[test]
    fn iteration_is_topological() {
        let (builder, _, _, _) = and2();
        let order: Vec<EntryId> = builder.iter().collect();
        assert_eq!(order.len(), 4);
        assert!(builder.cell(order[0]).is_in());
        assert!(builder.cell(order[1]).is_in());
        assert_eq!(builder.cell(order[2]).symbol, CellSymbol::And);
        assert!(builder.cell(order[3]).is_out());
    }

    #[test]
    fn strash_reuses_identical_cells() {
        let mut builder = SubnetBuilder::new();
        let a = builder.add_input();
        let b = builder.add_input();
        let x = builder.add_cell(CellSymbol::And, vec![a, b]);
        let y = builder.add_cell(CellSymbol::And, vec![a, b]);
        assert_eq!(x, y);
        let z = builder.add_cell(CellSymbol::And, vec![b, a]);
        assert_ne!(x, z, "operand order is structural");
    }

    #[test]
    fn add_cell_tree_decomposes() {
        let mut builder = SubnetBuilder::new();
        let inputs: Vec<Link> = (0..6).map(|_| builder.add_input()).collect();
        let root = builder.add_cell_tree(CellSymbol::And, inputs, 2);
        builder.add_output(root);
        for id in builder.iter() {
            assert!(builder.cell(id).arity() <= 2);
        }
        // 6 leaves need 5 binary ANDs.
        let ands = builder
            .iter()
            .filter(|&id| builder.cell(id).symbol == CellSymbol::And)
            .count();
        assert_eq!(ands, 5);
        builder.validate().unwrap();
    }

    #[test]
    fn add_subnet_inlines_and_remaps() {
        let mut inner = SubnetBuilder::new();
        let p = inner.add_input();
        let q = inner.add_input();
        let or = inner.add_cell(CellSymbol::Or, vec![p, q]);
        inner.add_output(or);
        let inner = inner.make();

        let mut outer = SubnetBuilder::new();
        let a = outer.add_input();
        let b = outer.add_input();
        let outs = outer.add_subnet(&inner, &[a, !b]);
        assert_eq!(outs.len(), 1);
        outer.add_output(outs[0]);
        outer.validate().unwrap();
        let or_id = outs[0].idx;
        assert_eq!(outer.cell(or_id).symbol, CellSymbol::Or);
        assert!(outer.link(or_id, 1).inv, "input inversion carried through");
    }

    #[test]
    fn sessions_clear_marks() {
        let (mut builder, a, _, _) = and2();
        builder.start_session();
        builder.mark(a.idx);
        assert!(builder.is_marked(a.idx));
        builder.end_session();
        assert!(!builder.is_marked(a.idx));
    }

    #[test]
    fn make_renumbers_topologically() {
        let (builder, _, _, _) = and2();
        let subnet = builder.make();
        subnet.validate().unwrap();
        assert_eq!(subnet.in_num(), 2);
        assert_eq!(subnet.out_num(), 1);
    }

    // --- replace ---------------------------------------------------------

    /// rhs computing OR over two inputs.
    fn or_rhs() -> Subnet {
        let mut b = SubnetBuilder::new();
        let p = b.add_input();
        let q = b.add_input();
        let or = b.add_cell(CellSymbol::Or, vec![p, q]);
        b.add_output(or);
        b.make()
    }

    /// rhs that is the identity on its single input.
    fn buf_rhs() -> Subnet {
        let mut b = SubnetBuilder::new();
        let p = b.add_input();
        b.add_output(p);
        b.make()
    }

    #[test]
    fn replace_swaps_and_for_or() {
        let (mut builder, a, b, and) = and2();
        let mapping = InOutMapping::new(vec![a.idx, b.idx], vec![and.idx]);
        let rhs = or_rhs();

        let effect = builder.evaluate_replace(&rhs, &mapping, None).unwrap();
        assert_eq!(effect.delta_cells, 0, "one AND out, one OR in");
        assert_eq!(effect.delta_depth, 0);

        let applied = builder.replace(&rhs, &mapping, None, None).unwrap();
        assert_eq!(applied.delta_cells, effect.delta_cells);
        builder.validate().unwrap();

        let symbols: Vec<CellSymbol> =
            builder.iter().map(|id| builder.cell(id).symbol).collect();
        assert!(symbols.contains(&CellSymbol::Or));
        assert!(!symbols.contains(&CellSymbol::And));
    }

    #[test]
    fn evaluate_matches_actual_measurements() {
        // Shared node: two outputs over a 3-cell cone; replace the cone
        // of one output and verify the reported deltas against reality.
        let mut builder = SubnetBuilder::new();
        let a = builder.add_input();
        let b = builder.add_input();
        let c = builder.add_input();
        let ab = builder.add_cell(CellSymbol::And, vec![a, b]);
        let abc = builder.add_cell(CellSymbol::And, vec![ab, c]);
        builder.add_output(abc);
        builder.add_output(ab);

        let mapping = InOutMapping::new(vec![a.idx, b.idx, c.idx], vec![abc.idx]);
        let mut rhs = SubnetBuilder::new();
        let p = rhs.add_input();
        let q = rhs.add_input();
        let r = rhs.add_input();
        let tree = rhs.add_cell(CellSymbol::And, vec![p, q, r]);
        rhs.add_output(tree);
        let rhs = rhs.make();

        let cells_before = builder.len();
        let effect = builder.evaluate_replace(&rhs, &mapping, None).unwrap();
        let applied = builder.replace(&rhs, &mapping, None, None).unwrap();
        let cells_after = builder.len();

        assert_eq!(effect, applied);
        assert_eq!(
            effect.delta_cells,
            cells_before as i32 - cells_after as i32
        );
        // ab survives: the second output still references it.
        builder.validate().unwrap();
        let symbols: Vec<CellSymbol> =
            builder.iter().map(|id| builder.cell(id).symbol).collect();
        assert_eq!(
            symbols.iter().filter(|s| **s == CellSymbol::And).count(),
            2,
            "shared AND kept, wide AND added"
        );
    }

    #[test]
    fn replace_with_identity_rhs_is_zero_cost() {
        let (mut builder, a, b, and) = and2();
        let mapping = InOutMapping::new(vec![a.idx, b.idx], vec![and.idx]);
        let mut rhs = SubnetBuilder::new();
        let p = rhs.add_input();
        let q = rhs.add_input();
        let same = rhs.add_cell(CellSymbol::And, vec![p, q]);
        rhs.add_output(same);
        let rhs = rhs.make();

        let effect = builder.evaluate_replace(&rhs, &mapping, None).unwrap();
        assert_eq!(effect.delta_cells, 0);
        let len_before = builder.len();
        builder.replace(&rhs, &mapping, None, None).unwrap();
        assert_eq!(builder.len(), len_before);
        builder.validate().unwrap();
    }

    #[test]
    fn replace_with_buf_rhs_bypasses_node() {
        // y = AND(a, a) can collapse to a.
        let mut builder = SubnetBuilder::new();
        let a = builder.add_input();
        let b = builder.add_input();
        let and = builder.add_cell(CellSymbol::And, vec![a, b]);
        let out = builder.add_output(and);

        let mapping = InOutMapping::new(vec![a.idx], vec![and.idx]);
        let effect = builder
            .evaluate_replace(&buf_rhs(), &mapping, None)
            .unwrap();
        assert_eq!(effect.delta_cells, 1, "the AND disappears");

        builder.replace(&buf_rhs(), &mapping, None, None).unwrap();
        builder.validate().unwrap();
        assert_eq!(builder.link(out.idx, 0).idx, a.idx);
        assert_eq!(builder.refcount(b.idx), 0);
    }

    #[test]
    fn replace_propagates_output_inversion() {
        // rhs: out = ~(p & q), i.e. a NAND expressed with an inverted
        // output link. Consumers must absorb the inversion bit.
        let (mut builder, a, b, and) = and2();
        let out_id = builder.output_ids()[0];
        let mapping = InOutMapping::new(vec![a.idx, b.idx], vec![and.idx]);

        let mut rhs = SubnetBuilder::new();
        let p = rhs.add_input();
        let q = rhs.add_input();
        let and2 = rhs.add_cell(CellSymbol::And, vec![p, q]);
        rhs.add_output(!and2);
        let rhs = rhs.make();

        builder.replace(&rhs, &mapping, None, None).unwrap();
        builder.validate().unwrap();
        assert!(builder.link(out_id, 0).inv, "inversion reaches the consumer");
    }

    #[test]
    fn replace_preserves_external_fanout() {
        // A node shared by two outputs: replacing a cone over one output
        // must leave the other output's function intact.
        let mut builder = SubnetBuilder::new();
        let a = builder.add_input();
        let b = builder.add_input();
        let and = builder.add_cell(CellSymbol::And, vec![a, b]);
        let not = builder.add_cell(CellSymbol::Not, vec![and]);
        builder.add_output(not);
        builder.add_output(and);

        let mapping = InOutMapping::new(vec![and.idx], vec![not.idx]);
        // Replace NOT(and) by NAND-style: identity on input, inverted out.
        let mut rhs = SubnetBuilder::new();
        let p = rhs.add_input();
        rhs.add_output(!p);
        let rhs = rhs.make();

        builder.replace(&rhs, &mapping, None, None).unwrap();
        builder.validate().unwrap();
        // The shared AND must still be live and still drive output 2.
        assert!(builder.is_live(and.idx));
        let out2 = builder.output_ids()[1];
        assert_eq!(builder.link(out2, 0).idx, and.idx);
    }

    #[test]
    fn replace_invokes_affected_callback() {
        let (mut builder, a, b, and) = and2();
        let mapping = InOutMapping::new(vec![a.idx, b.idx], vec![and.idx]);
        let mut touched = Vec::new();
        let mut callback = |id: EntryId| touched.push(id);
        builder
            .replace(&or_rhs(), &mapping, None, Some(&mut callback))
            .unwrap();
        assert!(!touched.is_empty());
        assert!(touched.iter().all(|&id| builder.is_live(id)));
    }

    #[test]
    fn weight_modifier_flows_into_effect() {
        let (mut builder, a, b, and) = and2();
        builder.set_weight(a.idx, 1.0);
        builder.set_weight(b.idx, 2.0);
        builder.set_weight(and.idx, 5.0);
        let mapping = InOutMapping::new(vec![a.idx, b.idx], vec![and.idx]);

        // New cell's weight = sum of fanin weights.
        let modifier: &dyn Fn(f32, u32) -> f32 = &|fanin_sum, _fanout| fanin_sum;
        let effect = builder
            .evaluate_replace(&or_rhs(), &mapping, Some(modifier))
            .unwrap();
        // Old cone weight 5.0, new cone weight 1.0 + 2.0 = 3.0.
        assert!((effect.delta_weight - 2.0).abs() < 1e-6);

        builder.replace(&or_rhs(), &mapping, Some(modifier), None).unwrap();
        let or_id = builder
            .iter()
            .find(|&id| builder.cell(id).symbol == CellSymbol::Or)
            .unwrap();
        assert!((builder.weight(or_id) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn depth_recomputed_downstream() {
        // Chain a -> n1 -> n2 -> out; replace n1's cone with identity so
        // depths shrink downstream.
        let mut builder = SubnetBuilder::new();
        let a = builder.add_input();
        let b = builder.add_input();
        let n1 = builder.add_cell(CellSymbol::And, vec![a, b]);
        let n2 = builder.add_cell(CellSymbol::Xor, vec![n1, a]);
        builder.add_output(n2);
        assert_eq!(builder.depth(n2.idx), 2);

        let mapping = InOutMapping::new(vec![a.idx], vec![n1.idx]);
        builder.replace(&buf_rhs(), &mapping, None, None).unwrap();
        builder.validate().unwrap();
        assert_eq!(builder.depth(n2.idx), 1);
    }

    #[test]
    fn make_after_replace_is_consistent() {
        let (mut builder, a, b, and) = and2();
        let mapping = InOutMapping::new(vec![a.idx, b.idx], vec![and.idx]);
        builder.replace(&or_rhs(), &mapping, None, None).unwrap();
        let subnet = builder.make();
        subnet.validate().unwrap();
        assert_eq!(subnet.inner_num(), 1);
    }

    #[test]
    fn from_subnet_roundtrip() {
        let (builder, ..) = and2();
        let subnet = builder.make();
        let rebuilt = SubnetBuilder::from_subnet(&subnet);
        rebuilt.validate().unwrap();
        let again = rebuilt.make();
        assert_eq!(subnet, again);
    }

    #[test]
    fn make_const_shape() {
        let subnet = SubnetBuilder::make_const(3, true);
        subnet.validate().unwrap();
        assert_eq!(subnet.in_num(), 3);
        assert_eq!(subnet.out_num(), 1);
        assert_eq!(
            subnet.cell(subnet.output_link(0).idx.index()).symbol,
            CellSymbol::One
        );
    }
}
