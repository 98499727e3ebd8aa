//! Mutation-surviving iteration over a builder.

use silica_subnet::{
    Effect, EntryId, InOutMapping, Subnet, SubnetBuilder, SubnetError, WeightModifier,
};

/// A topological cursor over a builder that survives `replace`.
///
/// A rewrite at the cursor deletes the current entry (its cone is taken
/// over by freshly spliced cells placed *before* it in the order), so the
/// passer records the next entry ahead of every replacement it routes and
/// resumes there. Entries after the replaced root are never deleted by
/// the rewrite, so the recorded position stays valid.
pub struct SafePasser {
    cursor: Option<EntryId>,
    pending_next: Option<EntryId>,
}

impl SafePasser {
    /// Positions the passer at the first entry in topological order.
    pub fn new(builder: &SubnetBuilder) -> Self {
        Self {
            cursor: builder.first_entry(),
            pending_next: None,
        }
    }

    /// Returns the current entry, if iteration has not finished.
    pub fn current(&self) -> Option<EntryId> {
        self.cursor
    }

    /// Advances to the next entry, resuming from the recorded position
    /// when the current entry was consumed by a replacement.
    pub fn advance(&mut self, builder: &SubnetBuilder) {
        if let Some(next) = self.pending_next.take() {
            self.cursor = Some(next);
            return;
        }
        self.cursor = self.cursor.and_then(|c| builder.next_entry(c));
    }

    /// Routes a replacement through the passer: records the successor of
    /// the current entry, then applies the rewrite.
    pub fn replace(
        &mut self,
        builder: &mut SubnetBuilder,
        rhs: &Subnet,
        mapping: &InOutMapping,
        modifier: Option<WeightModifier>,
        on_affected: Option<&mut dyn FnMut(EntryId)>,
    ) -> Result<Effect, SubnetError> {
        self.pending_next = self.cursor.and_then(|c| builder.next_entry(c));
        builder.replace(rhs, mapping, modifier, on_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silica_subnet::CellSymbol;

    #[test]
    fn plain_iteration_matches_order() {
        let mut builder = SubnetBuilder::new();
        let a = builder.add_input();
        let b = builder.add_input();
        let and = builder.add_cell(CellSymbol::And, vec![a, b]);
        builder.add_output(and);

        let mut passer = SafePasser::new(&builder);
        let mut seen = Vec::new();
        while let Some(entry) = passer.current() {
            seen.push(entry);
            passer.advance(&builder);
        }
        let expected: Vec<EntryId> = builder.iter().collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn survives_replacement_of_current() {
        let mut builder = SubnetBuilder::new();
        let a = builder.add_input();
        let b = builder.add_input();
        let and = builder.add_cell(CellSymbol::And, vec![a, b]);
        let not = builder.add_cell(CellSymbol::Not, vec![and]);
        builder.add_output(not);

        let mut rhs = SubnetBuilder::new();
        let p = rhs.add_input();
        let q = rhs.add_input();
        let or = rhs.add_cell(CellSymbol::Or, vec![p, q]);
        rhs.add_output(or);
        let rhs = rhs.make();

        let mut passer = SafePasser::new(&builder);
        let mut visited_symbols = Vec::new();
        while let Some(entry) = passer.current() {
            let symbol = builder.cell(entry).symbol;
            visited_symbols.push(symbol);
            if symbol == CellSymbol::And {
                let mapping = InOutMapping::new(vec![a.idx, b.idx], vec![entry]);
                passer.replace(&mut builder, &rhs, &mapping, None, None).unwrap();
            }
            passer.advance(&builder);
        }

        // The AND was visited, then iteration resumed at the NOT, never
        // revisiting the freshly inserted OR.
        assert_eq!(
            visited_symbols,
            vec![
                CellSymbol::In,
                CellSymbol::In,
                CellSymbol::And,
                CellSymbol::Not,
                CellSymbol::Out,
            ]
        );
        builder.validate().unwrap();
    }
}
