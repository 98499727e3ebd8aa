//! The dynamic-programming technology mapper.

use crate::cost::{aggregate, propagate, CostVector, Criterion};
use crate::matcher::{Match, Matcher};
use crate::solution::SolutionSpace;
use silica_cuts::{CutExtractor, CutExtractorConfig};
use silica_diagnostics::DiagnosticSink;
use silica_library::SCLibrary;
use silica_subnet::{CellSymbol, CellTypeId, EntryId, Link, Subnet, SubnetBuilder};
use silica_tt::{compose, TruthTable};
use std::collections::{HashMap, HashSet};

/// Mapping failures.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// Some entry has no library match at any attempted cut size.
    #[error("incomplete mapping: no library match covers entry #{entry}")]
    Incomplete {
        /// The uncoverable entry (in the input builder's numbering).
        entry: u32,
    },

    /// An inversion must be realized but the library has no inverter.
    #[error("the library has no inverter to realize a negated link")]
    NoInverter,

    /// A constant driver is needed but the library has no tie cell.
    #[error("the library has no tie cell for constant {value}")]
    NoConstant {
        /// The missing constant's value.
        value: bool,
    },
}

/// Bounds and options for the mapper.
#[derive(Clone, Copy, Debug)]
pub struct MapperConfig {
    /// Cut enumeration bounds.
    pub cut: CutExtractorConfig,
    /// Mapping attempts before the final forced pass.
    pub max_tries: u32,
    /// Enables early-recovery restarts.
    pub enable_recovery: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            cut: CutExtractorConfig::default(),
            max_tries: 4,
            enable_recovery: true,
        }
    }
}

/// A successful mapping.
pub struct MapOutcome {
    /// The mapped network: library cells, constants, and boundary
    /// entries only.
    pub mapped: Subnet,
    /// The final aggregated cost vector.
    pub vector: CostVector,
    /// Whether the vector satisfies the criterion bounds; an infeasible
    /// outcome is still a complete cover, reported honestly.
    pub feasible: bool,
}

/// How one entry is realized in the mapped network.
#[derive(Clone, Debug)]
enum Choice {
    /// A primary input.
    Input,
    /// A constant driven by a library tie cell.
    Constant(CellTypeId),
    /// A matched library cell over a cut.
    Gate(Match),
    /// A primary output forwarding its driver (old-entry link).
    Output(Link),
}

enum Status {
    Found {
        spaces: HashMap<EntryId, SolutionSpace<Choice>>,
        vector: CostVector,
        feasible: bool,
    },
    Rerun {
        vector: CostVector,
    },
}

/// Covers a premapped subnet with library cells by dynamic programming
/// over k-feasible cuts.
///
/// The forward pass fills one [`SolutionSpace`] per entry; outputs
/// aggregate into a global cost vector checked against the criterion.
/// On violation the tension vector is updated multiplicatively and the
/// pass restarts with the biased comparator, up to `max_tries` times;
/// past 50% progress an infeasible partial solution triggers the restart
/// early. The final pass runs to completion and emits whatever coverage
/// it has.
pub struct TechMapper<'l, 'm> {
    name: String,
    library: &'l SCLibrary,
    matcher: &'m dyn Matcher,
    criterion: Criterion,
    config: MapperConfig,
    abort: Option<silica_common::AbortFlag>,
}

impl<'l, 'm> TechMapper<'l, 'm> {
    /// Creates a mapper.
    pub fn new(
        name: impl Into<String>,
        library: &'l SCLibrary,
        matcher: &'m dyn Matcher,
        criterion: Criterion,
        config: MapperConfig,
    ) -> Self {
        Self {
            name: name.into(),
            library,
            matcher,
            criterion,
            config,
            abort: None,
        }
    }

    /// Installs an abort flag polled between entries; an aborted pass
    /// reports the subnet as incompletely mapped.
    pub fn with_abort(mut self, abort: silica_common::AbortFlag) -> Self {
        self.abort = Some(abort);
        self
    }

    /// Returns the mapper's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Maps the subnet held by `builder`.
    pub fn map(
        &self,
        builder: &SubnetBuilder,
        sink: &DiagnosticSink,
    ) -> Result<MapOutcome, MapError> {
        let mut tension = CostVector::ONES;
        let tries = self.config.max_tries.max(1);

        for try_index in 0..tries {
            let final_try = try_index + 1 == tries;
            let early = self.config.enable_recovery && !final_try;
            match self.map_once(builder, &tension, early, sink)? {
                Status::Found {
                    spaces,
                    vector,
                    feasible,
                } => {
                    if feasible || final_try {
                        if !feasible {
                            sink.warning(format!(
                                "{}: constraints violated by the final cover \
                                 (area {:.3}, delay {:.3}, power {:.3})",
                                self.name, vector.area, vector.delay, vector.power
                            ));
                        }
                        let mapped = self.reconstruct(builder, &spaces)?;
                        return Ok(MapOutcome {
                            mapped,
                            vector,
                            feasible,
                        });
                    }
                    tension = tension.scale(&self.criterion.tension(&vector));
                    sink.note(format!(
                        "{}: cover misses constraints, restarting with updated tension",
                        self.name
                    ));
                }
                Status::Rerun { vector } => {
                    tension = tension.scale(&self.criterion.tension(&vector));
                    sink.note(format!(
                        "{}: early recovery triggered, restarting",
                        self.name
                    ));
                }
            }
        }
        unreachable!("the final try always returns");
    }

    fn map_once(
        &self,
        builder: &SubnetBuilder,
        tension: &CostVector,
        early_recovery: bool,
        sink: &DiagnosticSink,
    ) -> Result<Status, MapError> {
        let extractor = CutExtractor::new(builder, self.config.cut);
        let mut wide_extractor: Option<CutExtractor> = None;
        let mut spaces: HashMap<EntryId, SolutionSpace<Choice>> =
            HashMap::with_capacity(builder.len());
        let mut first_unmatched: Option<EntryId> = None;

        let n_in = builder.in_num() as f32;
        let n_inner = (builder.len() as f32 - n_in - builder.out_num() as f32).max(1.0);
        let mut inner_seen = 0f32;

        for entry in builder.iter() {
            if self.abort.as_ref().is_some_and(|f| f.is_set()) {
                return Err(MapError::Incomplete {
                    entry: entry.as_raw(),
                });
            }
            let cell = builder.cell(entry);
            let mut space: SolutionSpace<Choice> = SolutionSpace::new();

            match cell.symbol {
                CellSymbol::In => {
                    space.add(Choice::Input, CostVector::ZERO, &self.criterion, tension);
                }
                CellSymbol::Zero | CellSymbol::One => {
                    let value = cell.symbol == CellSymbol::One;
                    let tie = if value {
                        self.library.cheapest_one()
                    } else {
                        self.library.cheapest_zero()
                    };
                    match tie {
                        Some(type_id) => {
                            let vector = self.cell_cost(type_id);
                            space.add(
                                Choice::Constant(type_id),
                                vector,
                                &self.criterion,
                                tension,
                            );
                        }
                        None => return Err(MapError::NoConstant { value }),
                    }
                }
                CellSymbol::Out => {
                    let link = cell.links[0];
                    // Wire the driver through when possible; an inverted
                    // link costs a library inverter.
                    if let Some(driver) = spaces.get(&link.idx).and_then(|s| s.preferred()) {
                        let inverter = self.library.cheapest_inverter();
                        if !link.inv || inverter.is_some() {
                            let mut vector = driver.vector;
                            if link.inv {
                                vector = vector + self.cell_cost(inverter.expect("checked"));
                            }
                            space.add(Choice::Output(link), vector, &self.criterion, tension);
                        }
                    }
                    // Also match the output cone directly, so inversions
                    // on the terminal link are absorbed into a cell.
                    let rebased: Vec<silica_cuts::Cut> = extractor
                        .cuts(link.idx)
                        .iter()
                        .map(|c| silica_cuts::Cut::new(entry, c.leaves.iter().copied()))
                        .collect();
                    self.match_entry(builder, entry, &rebased, &spaces, tension, &mut space);
                    if !space.has_solution() {
                        first_unmatched.get_or_insert(link.idx);
                    }
                }
                _ => {
                    inner_seen += 1.0;
                    self.match_entry(
                        builder,
                        entry,
                        extractor.cuts(entry),
                        &spaces,
                        tension,
                        &mut space,
                    );
                    if !space.has_solution() {
                        // Try wider cuts before giving up on the entry.
                        let wide = wide_extractor.get_or_insert_with(|| {
                            CutExtractor::new(
                                builder,
                                CutExtractorConfig {
                                    k: self.config.cut.k + 2,
                                    max_cuts: self.config.cut.max_cuts,
                                },
                            )
                        });
                        self.match_entry(
                            builder,
                            entry,
                            wide.cuts(entry),
                            &spaces,
                            tension,
                            &mut space,
                        );
                    }
                    if !space.has_solution() {
                        sink.warning(format!(
                            "no library match for entry #{}",
                            entry.as_raw()
                        ));
                        first_unmatched.get_or_insert(entry);
                    }

                    let progress = inner_seen / n_inner;
                    if early_recovery
                        && progress > 0.5
                        && space.has_solution()
                        && !space.has_feasible()
                    {
                        let vector = space.best().expect("just checked").vector;
                        return Ok(Status::Rerun { vector });
                    }
                }
            }
            spaces.insert(entry, space);
        }

        // Aggregate the output solutions.
        let mut out_vectors = Vec::with_capacity(builder.out_num() as usize);
        for out in builder.output_ids() {
            match spaces.get(&out).and_then(|s| s.preferred()) {
                Some(solution) => out_vectors.push(solution.vector),
                None => {
                    let entry = first_unmatched.unwrap_or(out);
                    return Err(MapError::Incomplete {
                        entry: entry.as_raw(),
                    });
                }
            }
        }
        let vector = aggregate(&out_vectors);
        let feasible = self.criterion.check(&vector);
        Ok(Status::Found {
            spaces,
            vector,
            feasible,
        })
    }

    fn match_entry(
        &self,
        builder: &SubnetBuilder,
        entry: EntryId,
        cuts: &[silica_cuts::Cut],
        spaces: &HashMap<EntryId, SolutionSpace<Choice>>,
        tension: &CostVector,
        space: &mut SolutionSpace<Choice>,
    ) {
        for cut in cuts {
            if cut.is_trivial() {
                continue;
            }
            let leaf_vectors: Option<Vec<CostVector>> = cut
                .leaves
                .iter()
                .map(|leaf| {
                    spaces
                        .get(leaf)
                        .and_then(|s| s.preferred())
                        .map(|s| s.vector)
                })
                .collect();
            let Some(leaf_vectors) = leaf_vectors else {
                continue;
            };
            let cut_aggregation = aggregate(&leaf_vectors);

            for matched in self.matcher.find_matches(builder, cut) {
                let vector = cut_aggregation + self.cell_cost(matched.type_id);
                let propagated = propagate(&vector, builder.refcount(entry));
                space.add(Choice::Gate(matched), propagated, &self.criterion, tension);
            }
        }
    }

    fn cell_cost(&self, type_id: CellTypeId) -> CostVector {
        let cell = self.library.cell(type_id);
        CostVector::new(cell.area, cell.delay, cell.leakage)
    }

    // --- Reconstruction ---------------------------------------------------

    fn reconstruct(
        &self,
        builder: &SubnetBuilder,
        spaces: &HashMap<EntryId, SolutionSpace<Choice>>,
    ) -> Result<Subnet, MapError> {
        let choice_of = |entry: EntryId| {
            spaces
                .get(&entry)
                .and_then(|s| s.preferred())
                .map(|s| &s.solution)
        };

        // Entries actually used by the chosen cover. Inputs are always
        // kept, used or not, so the boundary matches the source subnet.
        let mut needed: HashSet<EntryId> = HashSet::new();
        let mut stack: Vec<EntryId> = builder.output_ids();
        stack.extend(builder.input_ids());
        while let Some(entry) = stack.pop() {
            if !needed.insert(entry) {
                continue;
            }
            match choice_of(entry) {
                Some(Choice::Output(link)) => stack.push(link.idx),
                Some(Choice::Gate(matched)) => {
                    stack.extend(matched.links.iter().map(|l| l.idx));
                }
                Some(Choice::Input | Choice::Constant(_)) => {}
                None => {
                    return Err(MapError::Incomplete {
                        entry: entry.as_raw(),
                    })
                }
            }
        }

        let merges = self.pair_multi_outputs(builder, spaces, &needed);

        let mut out = SubnetBuilder::new();
        let mut xlat: HashMap<EntryId, Link> = HashMap::with_capacity(needed.len());

        for entry in builder.iter() {
            if !needed.contains(&entry) {
                continue;
            }
            let choice = choice_of(entry).expect("needed entries have choices");
            let link = match choice {
                Choice::Input => {
                    let link = out.add_input();
                    if let Some(flop) = builder.flop(entry) {
                        out.set_flop(link.idx, flop);
                    }
                    link
                }
                Choice::Constant(type_id) => {
                    out.add_cell(CellSymbol::Cell(*type_id), vec![])
                }
                Choice::Gate(matched) => {
                    let cell_link = match merges.get(&entry) {
                        Some(MergeRole::Secondary { primary, port }) => {
                            Link::to_port(xlat[primary].idx, *port, false)
                        }
                        Some(MergeRole::Primary {
                            type_id,
                            links,
                            port,
                        }) => {
                            let links = self.translate_links(&mut out, &xlat, links)?;
                            let outs = self.library.cell(*type_id).outputs.len() as u16;
                            let cell =
                                out.add_cell_multi(CellSymbol::Cell(*type_id), links, outs);
                            Link::to_port(cell.idx, *port, false)
                        }
                        None => {
                            let links =
                                self.translate_links(&mut out, &xlat, &matched.links)?;
                            let outs =
                                self.library.cell(matched.type_id).outputs.len() as u16;
                            let cell = out.add_cell_multi(
                                CellSymbol::Cell(matched.type_id),
                                links,
                                outs,
                            );
                            Link::to_port(cell.idx, matched.out, matched.inversion)
                        }
                    };
                    // A matched output cone still ends in a terminal
                    // entry.
                    if builder.cell(entry).is_out() {
                        let driver = self.translate_link(&mut out, cell_link)?;
                        let link = out.add_output(driver);
                        if let Some(flop) = builder.flop(entry) {
                            out.set_flop(link.idx, flop);
                        }
                        link
                    } else {
                        cell_link
                    }
                }
                Choice::Output(link) => {
                    let driver = self.translate_link(
                        &mut out,
                        xlat[&link.idx].invert_if(link.inv),
                    )?;
                    let link = out.add_output(driver);
                    if let Some(flop) = builder.flop(entry) {
                        out.set_flop(link.idx, flop);
                    }
                    link
                }
            };
            xlat.insert(entry, link);
        }

        debug_assert_eq!(out.out_num(), builder.out_num());
        Ok(out.make())
    }

    /// Resolves old-entry match links into the new builder, realizing
    /// any inversion with a library inverter.
    fn translate_links(
        &self,
        out: &mut SubnetBuilder,
        xlat: &HashMap<EntryId, Link>,
        links: &[Link],
    ) -> Result<Vec<Link>, MapError> {
        links
            .iter()
            .map(|l| self.translate_link(out, xlat[&l.idx].invert_if(l.inv)))
            .collect()
    }

    /// Realizes an inverted link through the cheapest library inverter;
    /// plain links pass through.
    fn translate_link(&self, out: &mut SubnetBuilder, link: Link) -> Result<Link, MapError> {
        if !link.inv {
            return Ok(link);
        }
        let inv = self.library.cheapest_inverter().ok_or(MapError::NoInverter)?;
        let positive = Link {
            inv: false,
            ..link
        };
        Ok(out.add_cell(CellSymbol::Cell(inv), vec![positive]))
    }

    /// Finds pairs of matched entries that one multi-output library cell
    /// covers more cheaply than their two chosen cells; the pair then
    /// shares one instance.
    fn pair_multi_outputs(
        &self,
        builder: &SubnetBuilder,
        spaces: &HashMap<EntryId, SolutionSpace<Choice>>,
        needed: &HashSet<EntryId>,
    ) -> HashMap<EntryId, MergeRole> {
        let mut merges: HashMap<EntryId, MergeRole> = HashMap::new();

        // Gather matched entries with their leaf sets and cut functions.
        let mut gates: Vec<(EntryId, Vec<EntryId>, TruthTable, f32)> = Vec::new();
        for entry in builder.iter() {
            if !needed.contains(&entry) || builder.cell(entry).is_out() {
                continue;
            }
            let choice = spaces
                .get(&entry)
                .and_then(|s| s.preferred())
                .map(|s| &s.solution);
            if let Some(Choice::Gate(matched)) = choice {
                let mut leaves: Vec<EntryId> =
                    matched.links.iter().map(|l| l.idx).collect();
                leaves.sort_by_key(|e| e.as_raw());
                leaves.dedup();
                let view =
                    silica_subnet::SubnetView::from_cut(builder, &leaves, entry);
                let function = silica_subnet::eval::evaluate_view(&view).remove(0);
                let area = self.library.cell(matched.type_id).area;
                gates.push((entry, leaves, function, area));
            }
        }

        for i in 0..gates.len() {
            for j in (i + 1)..gates.len() {
                let (e1, leaves1, f1, area1) = &gates[i];
                let (e2, leaves2, f2, area2) = &gates[j];
                if leaves1 != leaves2
                    || merges.contains_key(e1)
                    || merges.contains_key(e2)
                {
                    continue;
                }
                if let Some((type_id, links, port1, port2)) =
                    self.find_shared_cell(leaves1, f1, f2, area1 + area2)
                {
                    merges.insert(
                        *e1,
                        MergeRole::Primary {
                            type_id,
                            links,
                            port: port1,
                        },
                    );
                    merges.insert(
                        *e2,
                        MergeRole::Secondary {
                            primary: *e1,
                            port: port2,
                        },
                    );
                }
            }
        }
        merges
    }

    /// Searches the library for a two-output cell realizing both
    /// functions over one shared pin assignment, cheaper than
    /// `combined_area`.
    fn find_shared_cell(
        &self,
        leaves: &[EntryId],
        f1: &TruthTable,
        f2: &TruthTable,
        combined_area: f32,
    ) -> Option<(CellTypeId, Vec<Link>, u16, u16)> {
        let n = leaves.len();
        if n > 4 {
            return None;
        }
        for cell in self.library.cells() {
            if cell.outputs.len() < 2 || cell.arity() != n || cell.area >= combined_area {
                continue;
            }
            for perm in permutations(n) {
                // Pin p is fed leaf perm[p].
                let fanins: Vec<TruthTable> = perm
                    .iter()
                    .map(|&leaf| TruthTable::nth_var(n, leaf))
                    .collect();
                let realized: Vec<TruthTable> = cell
                    .outputs
                    .iter()
                    .map(|o| compose(&o.function, &fanins))
                    .collect();
                let assign = |a: usize, b: usize| -> Option<(u16, u16)> {
                    (realized[a] == *f1 && realized[b] == *f2)
                        .then_some((a as u16, b as u16))
                };
                for (a, b) in [(0, 1), (1, 0)] {
                    if let Some((port1, port2)) = assign(a, b) {
                        let links =
                            perm.iter().map(|&leaf| Link::to(leaves[leaf])).collect();
                        return Some((cell.type_id, links, port1, port2));
                    }
                }
            }
        }
        None
    }
}

/// The role of an entry in a multi-output merge.
enum MergeRole {
    Primary {
        type_id: CellTypeId,
        links: Vec<Link>,
        port: u16,
    },
    Secondary {
        primary: EntryId,
        port: u16,
    },
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
