//! The standard-cell library model for the Silica synthesis back-end.
//!
//! A library is built from loader records (the Liberty front-end emits
//! them; tests construct them directly), canonizes every output function
//! by input permutation, tracks physical properties and delay surfaces,
//! and derives *super-cells* by composing two-input cells with the
//! cheapest inverter or constant drivers.

#![warn(missing_docs)]

pub mod error;
pub mod formula;
pub mod library;
pub mod types;

pub use error::LibraryError;
pub use formula::parse_formula;
pub use library::{CellOutput, SCLibrary, StandardCell};
pub use types::{
    CellRecord, DelayLut, InputPinRecord, OutputPinRecord, WireLoadModel, WireLoadSelection,
};
