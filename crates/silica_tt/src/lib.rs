//! Boolean function algebra for the Silica synthesis back-end.
//!
//! Functions are stored as truth tables: the dynamic-width [`TruthTable`]
//! for the general case and packed `u64` helpers ([`tt6`]) for the six-input
//! fast path used by cone evaluation. On top of the tables sit cube/SOP
//! types, the Minato-Morreale irredundant SOP computation, and the P/NPN
//! canonizers whose recorded transforms drive library matching and the
//! rewrite database.

#![warn(missing_docs)]

pub mod canon;
pub mod cube;
pub mod isop;
pub mod table;
pub mod tt6;

pub use canon::{npn_canonize, p_canonize, NpnTransform, PTransform};
pub use cube::Cube;
pub use isop::isop;
pub use table::{compose, TruthTable};
