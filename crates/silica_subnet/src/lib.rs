//! The Boolean network model of the Silica synthesis back-end.
//!
//! A [`Subnet`] is an immutable, topologically numbered DAG of Boolean
//! cells; a [`SubnetBuilder`] is its mutable presentation with refcount,
//! depth, and weight bookkeeping and the transactional
//! [`replace`](SubnetBuilder::replace) rewrite primitive. A
//! [`SubnetView`] delimits a functionally closed window on a builder, and
//! the [`Walker`] traverses views in either direction with injectable
//! graph providers.

#![warn(missing_docs)]

pub mod builder;
pub mod cell;
pub mod error;
pub mod eval;
pub mod link;
pub mod subnet;
pub mod view;
pub mod walker;

pub use builder::{Effect, ReplacePlan, SubnetBuilder, WeightModifier};
pub use cell::{Cell, CellSymbol};
pub use error::SubnetError;
pub use link::Link;
pub use subnet::{Subnet, SubnetEntry};
pub use view::{InOutMapping, SubnetView};
pub use walker::{Visit, Walker};

silica_common::define_id!(
    /// Index of an entry in a subnet builder's arena.
    EntryId
);

silica_common::define_id!(
    /// Identifier of a library cell type referenced by `CellSymbol::Cell`.
    CellTypeId
);

silica_common::define_id!(
    /// Identifier of the sequential element (flip-flop) a boundary cell
    /// belongs to at the net level.
    FlopId
);
