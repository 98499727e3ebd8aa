//! Technology mapping for the Silica synthesis back-end.
//!
//! The [`TechMapper`] covers a premapped subnet with standard-cell
//! matches found per k-feasible cut, chooses by an area/delay/power
//! [`CostVector`] under a [`Criterion`], restarts with a tension-biased
//! comparator when constraints are missed, and reconstructs the mapped
//! network out of library cells only.

#![warn(missing_docs)]

pub mod cost;
pub mod mapper;
pub mod matcher;
pub mod premap;
pub mod solution;

pub use cost::{aggregate, propagate, CostVector, Criterion, Dimension};
pub use mapper::{MapError, MapOutcome, MapperConfig, TechMapper};
pub use matcher::{FuncMatcher, Match, Matcher, PBoolMatcher};
pub use premap::{premap, Basis};
pub use solution::{Solution, SolutionSpace};
