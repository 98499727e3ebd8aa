//! Immutable subnet snapshots.

use crate::cell::{Cell, CellSymbol};
use crate::error::SubnetError;
use crate::link::Link;
use crate::{EntryId, FlopId};
use serde::{Deserialize, Serialize};

/// One entry of an immutable subnet.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct SubnetEntry {
    /// The cell stored at this entry.
    pub cell: Cell,
    /// The sequential element this boundary cell belongs to, if any.
    pub flop: Option<FlopId>,
}

/// An immutable, topologically numbered Boolean network.
///
/// Entries satisfy the construction invariants: every link refers to a
/// strictly smaller index, `In` entries form a prefix, and `Out` entries
/// form a suffix. Snapshots are produced by
/// [`SubnetBuilder::make`](crate::SubnetBuilder::make) and are the currency
/// of resynthesizers, rewrite databases, and persisted artifacts.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Subnet {
    entries: Vec<SubnetEntry>,
    in_num: u32,
    out_num: u32,
}

impl Subnet {
    pub(crate) fn from_parts(entries: Vec<SubnetEntry>, in_num: u32, out_num: u32) -> Self {
        Self {
            entries,
            in_num,
            out_num,
        }
    }

    /// Returns the total number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the subnet has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of primary inputs.
    pub fn in_num(&self) -> u32 {
        self.in_num
    }

    /// Returns the number of primary outputs.
    pub fn out_num(&self) -> u32 {
        self.out_num
    }

    /// Returns the number of inner cells (neither `In` nor `Out`).
    pub fn inner_num(&self) -> u32 {
        self.entries.len() as u32 - self.in_num - self.out_num
    }

    /// Returns the entry at `index`.
    pub fn entry(&self, index: usize) -> &SubnetEntry {
        &self.entries[index]
    }

    /// Returns the cell at `index`.
    pub fn cell(&self, index: usize) -> &Cell {
        &self.entries[index].cell
    }

    /// Iterates entries in topological (index) order.
    pub fn entries(&self) -> impl Iterator<Item = &SubnetEntry> {
        self.entries.iter()
    }

    /// Returns the index of the `i`-th output entry.
    pub fn output_index(&self, i: usize) -> usize {
        self.entries.len() - self.out_num as usize + i
    }

    /// Returns the defining link of the `i`-th output.
    pub fn output_link(&self, i: usize) -> Link {
        self.entries[self.output_index(i)].cell.links[0]
    }

    /// Checks the structural invariants of the snapshot.
    pub fn validate(&self) -> Result<(), SubnetError> {
        for (i, entry) in self.entries.iter().enumerate() {
            for link in &entry.cell.links {
                if link.idx.index() >= i {
                    return Err(SubnetError::ForwardLink {
                        holder: EntryId::from_raw(i as u32),
                        target: link.idx,
                    });
                }
            }
            let in_prefix = i < self.in_num as usize;
            let out_suffix = i >= self.entries.len() - self.out_num as usize;
            match entry.cell.symbol {
                CellSymbol::In if !in_prefix => {
                    return Err(SubnetError::MappingMismatch(format!(
                        "input entry #{i} outside the input prefix"
                    )));
                }
                CellSymbol::Out if !out_suffix => {
                    return Err(SubnetError::MappingMismatch(format!(
                        "output entry #{i} outside the output suffix"
                    )));
                }
                s if in_prefix && !s.is_in() => {
                    return Err(SubnetError::MappingMismatch(format!(
                        "non-input entry #{i} inside the input prefix"
                    )));
                }
                s if out_suffix && !s.is_out() => {
                    return Err(SubnetError::MappingMismatch(format!(
                        "non-output entry #{i} inside the output suffix"
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}
