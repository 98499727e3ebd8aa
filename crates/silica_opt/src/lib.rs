//! Structural optimization passes for the Silica synthesis back-end.
//!
//! The passes are in-place transformers over a `SubnetBuilder`: the
//! [`Rewriter`] resynthesizes k-feasible cuts and commits improvements
//! node by node, the [`Refactorer`] works on reconvergence windows, and
//! the [`LazyRefactorer`] gathers candidates across a whole pass and
//! applies a non-overlapping subset chosen on a conflict graph. The
//! [`resynthesis`] module holds the algorithms that produce replacement
//! cones; [`rwdb`] persists known rewrites keyed by truth table.

#![warn(missing_docs)]

pub mod lazy;
pub mod passer;
pub mod refactorer;
pub mod resynthesis;
pub mod rewriter;
pub mod rwdb;
pub mod transform;

pub use lazy::{Candidate, ConflictGraph, LazyRefactorer};
pub use passer::SafePasser;
pub use refactorer::Refactorer;
pub use resynthesis::{
    AkersSynthesizer, AssociativeReorderer, MmFactorSynthesizer, MmSynthesizer,
};
pub use rewriter::{Rewriter, RewriterConfig};
pub use rwdb::{NpnDb, RewriteDb};
pub use transform::{Resynthesizer, SubnetTransformer};
