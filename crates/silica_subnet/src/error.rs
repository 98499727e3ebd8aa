//! Error kinds for subnet construction and validation.

use crate::EntryId;

/// Errors produced while building or validating a subnet.
#[derive(Debug, thiserror::Error)]
pub enum SubnetError {
    /// A link references an entry that does not exist or is dead.
    #[error("dangling link to entry #{0:?}")]
    DanglingLink(EntryId),

    /// A link in an emitted subnet references an entry at or after its
    /// holder, which breaks the topological numbering invariant.
    #[error("link from entry #{holder:?} to non-earlier entry #{target:?}")]
    ForwardLink {
        /// The entry holding the link.
        holder: EntryId,
        /// The referenced entry.
        target: EntryId,
    },

    /// An entry's stored refcount disagrees with the actual fanout count.
    #[error("refcount mismatch at entry #{entry:?}: stored {stored}, actual {actual}")]
    RefcountMismatch {
        /// The inconsistent entry.
        entry: EntryId,
        /// The stored refcount.
        stored: u32,
        /// The fanout count found by scanning.
        actual: u32,
    },

    /// An entry's stored depth disagrees with its definition.
    #[error("depth mismatch at entry #{entry:?}: stored {stored}, actual {actual}")]
    DepthMismatch {
        /// The inconsistent entry.
        entry: EntryId,
        /// The stored depth.
        stored: u32,
        /// The recomputed depth.
        actual: u32,
    },

    /// A cell was given an arity its symbol does not support.
    #[error("symbol {symbol} does not take {arity} inputs")]
    WrongArity {
        /// Display form of the symbol.
        symbol: String,
        /// The offending arity.
        arity: u16,
    },

    /// An input/output mapping does not fit the replacement subnet.
    #[error("replacement mapping mismatch: {0}")]
    MappingMismatch(String),
}
