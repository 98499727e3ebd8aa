//! DFS traversal of subnet views.

use crate::builder::SubnetBuilder;
use crate::link::Link;
use crate::view::SubnetView;
use crate::EntryId;
use std::collections::HashSet;

/// One traversal step handed to walker visitors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Visit {
    /// The entry is a view input (boundary leaf).
    pub is_in: bool,
    /// The entry is a view output.
    pub is_out: bool,
    /// The visited entry.
    pub entry: EntryId,
}

/// Pre- or post-order visitor; returning `false` aborts the traversal.
pub type Visitor<'v> = dyn FnMut(&SubnetBuilder, Visit) -> bool + 'v;

/// Supplies the arity of an entry; lets a walker traverse an
/// externally-described graph (the mapper walks match-defined cuts this
/// way).
pub type ArityProvider<'p> = dyn Fn(&SubnetBuilder, EntryId) -> u16 + 'p;

/// Supplies the `port`-th fanin link of an entry.
pub type LinkProvider<'p> = dyn Fn(&SubnetBuilder, EntryId, u16) -> Link + 'p;

/// A DFS walker over a [`SubnetView`].
///
/// Forward traversal visits inputs first, then inner cells in topological
/// order, then outputs; it is a reverse DFS from the outputs with an
/// explicit `(entry, next_link)` stack. Backward traversal reverses the
/// forward order. Visited entries can be saved for cheap re-traversal.
pub struct Walker<'a, 'p> {
    view: &'a SubnetView<'a>,
    arity: Option<&'p ArityProvider<'p>>,
    link: Option<&'p LinkProvider<'p>>,
    saved: Option<Vec<Visit>>,
}

impl<'a, 'p> Walker<'a, 'p> {
    /// Creates a walker reading arities and links from the parent builder.
    pub fn new(view: &'a SubnetView<'a>) -> Self {
        Self {
            view,
            arity: None,
            link: None,
            saved: None,
        }
    }

    /// Creates a walker with injected graph providers.
    pub fn with_providers(
        view: &'a SubnetView<'a>,
        arity: &'p ArityProvider<'p>,
        link: &'p LinkProvider<'p>,
    ) -> Self {
        Self {
            view,
            arity: Some(arity),
            link: Some(link),
            saved: None,
        }
    }

    /// Returns the saved traversal sequence, if one was recorded.
    pub fn saved(&self) -> Option<&[Visit]> {
        self.saved.as_deref()
    }

    /// Runs a forward traversal. `pre` fires when an entry is first
    /// pushed, `post` when it is emitted in topological order. Either
    /// visitor returning `false` aborts the run; the walker reports the
    /// abort by returning `false`.
    pub fn run_forward(
        &mut self,
        mut pre: Option<&mut Visitor<'_>>,
        mut post: Option<&mut Visitor<'_>>,
        save: bool,
    ) -> bool {
        if let Some(saved) = &self.saved {
            let builder = self.view.parent();
            for visit in saved.clone() {
                if let Some(pre) = pre.as_deref_mut() {
                    if !pre(builder, visit) {
                        return false;
                    }
                }
                if let Some(post) = post.as_deref_mut() {
                    if !post(builder, visit) {
                        return false;
                    }
                }
            }
            return true;
        }

        let builder = self.view.parent();
        let inputs: HashSet<EntryId> = self.view.mapping().inputs.iter().copied().collect();
        let outputs: HashSet<EntryId> = self.view.mapping().outputs.iter().copied().collect();
        let mut visited: HashSet<EntryId> = HashSet::new();
        let mut saved: Vec<Visit> = Vec::new();

        for &out in &self.view.mapping().outputs {
            // Stack of (entry, next fanin port to expand).
            let mut stack: Vec<(EntryId, u16)> = Vec::new();
            if visited.contains(&out) {
                continue;
            }
            visited.insert(out);
            let visit = self.visit_of(out, &inputs, &outputs);
            if let Some(pre) = pre.as_deref_mut() {
                if !pre(builder, visit) {
                    return false;
                }
            }
            if visit.is_in {
                // A degenerate root that is also a leaf: emit directly.
                if !Self::emit(builder, visit, &mut post, save, &mut saved) {
                    return false;
                }
                continue;
            }
            stack.push((out, 0));

            while let Some((entry, port)) = stack.pop() {
                let arity = self.arity_of(builder, entry);
                if port >= arity {
                    let visit = self.visit_of(entry, &inputs, &outputs);
                    if !Self::emit(builder, visit, &mut post, save, &mut saved) {
                        return false;
                    }
                    continue;
                }
                stack.push((entry, port + 1));
                let child = self.link_of(builder, entry, port).idx;
                if visited.contains(&child) {
                    continue;
                }
                visited.insert(child);
                let child_visit = self.visit_of(child, &inputs, &outputs);
                if let Some(pre) = pre.as_deref_mut() {
                    if !pre(builder, child_visit) {
                        return false;
                    }
                }
                if child_visit.is_in {
                    if !Self::emit(builder, child_visit, &mut post, save, &mut saved) {
                        return false;
                    }
                } else {
                    stack.push((child, 0));
                }
            }
        }

        if save {
            self.saved = Some(saved);
        }
        true
    }

    /// Runs a backward traversal: the exact reverse of the forward order.
    pub fn run_backward(&mut self, visitor: &mut Visitor<'_>) -> bool {
        if self.saved.is_none() {
            // Record the forward order first.
            if !self.run_forward(None, None, true) {
                return false;
            }
        }
        let builder = self.view.parent();
        let saved = self.saved.clone().unwrap_or_default();
        for visit in saved.iter().rev() {
            if !visitor(builder, *visit) {
                return false;
            }
        }
        true
    }

    fn emit(
        builder: &SubnetBuilder,
        visit: Visit,
        post: &mut Option<&mut Visitor<'_>>,
        save: bool,
        saved: &mut Vec<Visit>,
    ) -> bool {
        if save {
            saved.push(visit);
        }
        if let Some(post) = post.as_deref_mut() {
            if !post(builder, visit) {
                return false;
            }
        }
        true
    }

    fn visit_of(
        &self,
        entry: EntryId,
        inputs: &HashSet<EntryId>,
        outputs: &HashSet<EntryId>,
    ) -> Visit {
        Visit {
            is_in: inputs.contains(&entry),
            is_out: outputs.contains(&entry),
            entry,
        }
    }

    fn arity_of(&self, builder: &SubnetBuilder, entry: EntryId) -> u16 {
        match self.arity {
            Some(provider) => provider(builder, entry),
            None => builder.cell(entry).arity(),
        }
    }

    fn link_of(&self, builder: &SubnetBuilder, entry: EntryId, port: u16) -> Link {
        match self.link {
            Some(provider) => provider(builder, entry, port),
            None => builder.link(entry, port),
        }
    }
}
