//! Shared foundational types for the Silica synthesis back-end.
//!
//! This crate provides the dense arena used by every graph-shaped model in
//! the pipeline, opaque ID newtypes, interned identifiers, content hashing,
//! and the internal-error result type.

#![warn(missing_docs)]

pub mod abort;
pub mod arena;
pub mod hash;
pub mod ident;
pub mod result;

pub use abort::AbortFlag;
pub use arena::{Arena, ArenaId};
pub use hash::ContentHash;
pub use ident::{Ident, Interner};
pub use result::{InternalError, SilicaResult};

/// Defines an opaque, copyable `u32`-backed ID newtype implementing
/// [`ArenaId`].
#[macro_export]
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug,
            serde::Serialize, serde::Deserialize,
        )]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub const fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub const fn as_raw(self) -> u32 {
                self.0
            }

            /// Returns the index widened to `usize` for slice access.
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl $crate::ArenaId for $name {
            fn from_raw(index: u32) -> Self {
                Self(index)
            }

            fn as_raw(self) -> u32 {
                self.0
            }
        }
    };
}
