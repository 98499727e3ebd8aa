//! Fanin references.

use crate::EntryId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Not;

/// A fanin reference: source entry, source output port, and an inversion
/// bit meaning "consume the logical negation of this source".
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    /// The source entry.
    pub idx: EntryId,
    /// The source output port (nonzero only for multi-output cells).
    pub out: u16,
    /// Consume the negation of the source value.
    pub inv: bool,
}

impl Link {
    /// Creates a link to port 0 of `idx`, not inverted.
    pub fn to(idx: EntryId) -> Self {
        Self {
            idx,
            out: 0,
            inv: false,
        }
    }

    /// Creates a link with an explicit inversion bit.
    pub fn new(idx: EntryId, inv: bool) -> Self {
        Self { idx, out: 0, inv }
    }

    /// Creates a link to a specific output port.
    pub fn to_port(idx: EntryId, out: u16, inv: bool) -> Self {
        Self { idx, out, inv }
    }

    /// Returns the same link with the inversion bit xor-ed by `inv`.
    pub fn invert_if(self, inv: bool) -> Self {
        Self {
            inv: self.inv ^ inv,
            ..self
        }
    }
}

impl Not for Link {
    type Output = Link;

    fn not(self) -> Link {
        Link {
            inv: !self.inv,
            ..self
        }
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inv {
            write!(f, "~")?;
        }
        write!(f, "#{}", self.idx.as_raw())?;
        if self.out != 0 {
            write!(f, ".{}", self.out)?;
        }
        Ok(())
    }
}
