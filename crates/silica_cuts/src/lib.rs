//! Cut enumeration for the Silica synthesis back-end.
//!
//! A *k-feasible cut* of an entry `v` is a set of at most `k` entries
//! through which every source-to-`v` path passes. The [`CutExtractor`]
//! enumerates bounded cut sets per entry in topological order; the
//! [`reconvergence`] module grows single windows around chosen roots for
//! the refactoring passes.

#![warn(missing_docs)]

pub mod cut;
pub mod extractor;
pub mod reconvergence;

pub use cut::Cut;
pub use extractor::{CutExtractor, CutExtractorConfig};
pub use reconvergence::reconvergent_cut;
