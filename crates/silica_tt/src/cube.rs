//! Product terms (cubes) for sum-of-products covers.

use crate::table::TruthTable;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A product of literals over up to 32 variables.
///
/// Bit `i` of `mask` says variable `i` appears in the cube; bit `i` of
/// `bits` gives its polarity (1 = positive literal). Bits outside `mask`
/// are kept zero so cubes compare by value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cube {
    mask: u32,
    bits: u32,
}

impl Cube {
    /// The empty cube (no literals): the constant-1 product.
    pub const TAUTOLOGY: Cube = Cube { mask: 0, bits: 0 };

    /// Creates a cube from literal mask and polarity bits.
    pub fn new(mask: u32, bits: u32) -> Self {
        Self {
            mask,
            bits: bits & mask,
        }
    }

    /// Creates a single-literal cube.
    pub fn literal(var: usize, positive: bool) -> Self {
        let mask = 1u32 << var;
        Self {
            mask,
            bits: if positive { mask } else { 0 },
        }
    }

    /// Returns the literal mask.
    pub fn mask(&self) -> u32 {
        self.mask
    }

    /// Returns `true` if variable `var` appears in the cube.
    pub fn has_var(&self, var: usize) -> bool {
        (self.mask >> var) & 1 == 1
    }

    /// Returns the polarity of variable `var`; meaningless unless
    /// [`has_var`](Self::has_var) holds.
    pub fn polarity(&self, var: usize) -> bool {
        (self.bits >> var) & 1 == 1
    }

    /// Returns the number of literals.
    pub fn literal_count(&self) -> u32 {
        self.mask.count_ones()
    }

    /// Adds (or overwrites) a literal.
    pub fn with_literal(mut self, var: usize, positive: bool) -> Self {
        self.mask |= 1 << var;
        if positive {
            self.bits |= 1 << var;
        } else {
            self.bits &= !(1 << var);
        }
        self
    }

    /// Removes a literal if present.
    pub fn without_var(mut self, var: usize) -> Self {
        self.mask &= !(1 << var);
        self.bits &= !(1 << var);
        self
    }

    /// Returns `true` if every literal of `self` appears in `other` with
    /// the same polarity (so `self` covers `other` as a product).
    pub fn covers(&self, other: &Cube) -> bool {
        (self.mask & other.mask) == self.mask && (other.bits & self.mask) == self.bits
    }

    /// Removes all literals of `divisor` from `self`; the caller checks
    /// [`covers`](Self::covers) first.
    pub fn without_literals_of(&self, divisor: &Cube) -> Self {
        Self {
            mask: self.mask & !divisor.mask,
            bits: self.bits & !divisor.mask,
        }
    }

    /// Iterates the variables appearing in the cube.
    pub fn vars(&self) -> impl Iterator<Item = usize> + '_ {
        (0..32).filter(|&v| self.has_var(v))
    }

    /// Expands the cube into a truth table of `num_vars` variables.
    pub fn to_table(&self, num_vars: usize) -> TruthTable {
        let mut result = TruthTable::one(num_vars);
        for var in self.vars() {
            let proj = TruthTable::nth_var(num_vars, var);
            let lit = if self.polarity(var) { proj } else { !&proj };
            result = &result & &lit;
        }
        result
    }
}

/// Expands a cover into the truth table of its disjunction.
pub fn cover_to_table(cover: &[Cube], num_vars: usize) -> TruthTable {
    let mut result = TruthTable::zero(num_vars);
    for cube in cover {
        result = &result | &cube.to_table(num_vars);
    }
    result
}

impl fmt::Debug for Cube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mask == 0 {
            return write!(f, "1");
        }
        for var in self.vars() {
            if !self.polarity(var) {
                write!(f, "~")?;
            }
            write!(f, "x{var}")?;
        }
        Ok(())
    }
}
