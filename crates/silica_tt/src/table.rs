//! Dynamic-width truth tables.

use serde::{Deserialize, Serialize};
use silica_common::ContentHash;
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};

/// The largest supported number of variables.
///
/// 16 variables means 1024 words per table, far beyond any cut or library
/// cell the pipeline produces; the bound exists to keep block counts sane.
pub const MAX_VARS: usize = 16;

/// A Boolean function of `num_vars` variables stored as a bit vector of
/// `2^num_vars` minterm values packed into 64-bit words.
///
/// Bit `m` of the table is the function value on the input assignment whose
/// binary encoding is `m` (variable 0 is the least significant bit). Words
/// beyond `2^num_vars` bits are kept zeroed so tables compare and hash by
/// their words directly.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TruthTable {
    num_vars: u8,
    blocks: Vec<u64>,
}

fn block_count(num_vars: u8) -> usize {
    if num_vars <= 6 {
        1
    } else {
        1usize << (num_vars - 6)
    }
}

impl TruthTable {
    /// Creates the constant-0 function of `num_vars` variables.
    pub fn zero(num_vars: usize) -> Self {
        assert!(num_vars <= MAX_VARS, "too many variables: {num_vars}");
        Self {
            num_vars: num_vars as u8,
            blocks: vec![0; block_count(num_vars as u8)],
        }
    }

    /// Creates the constant-1 function of `num_vars` variables.
    pub fn one(num_vars: usize) -> Self {
        let mut tt = Self::zero(num_vars);
        for b in &mut tt.blocks {
            *b = u64::MAX;
        }
        tt.mask_off();
        tt
    }

    /// Creates the projection onto variable `var`.
    pub fn nth_var(num_vars: usize, var: usize) -> Self {
        assert!(var < num_vars, "variable {var} out of {num_vars}");
        let mut tt = Self::zero(num_vars);
        if var < 6 {
            let pattern = crate::tt6::VAR[var];
            for b in &mut tt.blocks {
                *b = pattern;
            }
        } else {
            // Whole words alternate with period 2^(var - 6) words.
            let period = 1usize << (var - 6);
            for (i, b) in tt.blocks.iter_mut().enumerate() {
                if (i / period) & 1 == 1 {
                    *b = u64::MAX;
                }
            }
        }
        tt.mask_off();
        tt
    }

    /// Builds a table of up to six variables from its packed bits.
    pub fn from_u64(bits: u64, num_vars: usize) -> Self {
        assert!(num_vars <= 6);
        let mut tt = Self::zero(num_vars);
        tt.blocks[0] = bits;
        tt.mask_off();
        tt
    }

    /// Builds a table from raw words; `words.len()` must match the block
    /// count for `num_vars`.
    pub fn from_blocks(words: Vec<u64>, num_vars: usize) -> Self {
        assert_eq!(words.len(), block_count(num_vars as u8));
        let mut tt = Self {
            num_vars: num_vars as u8,
            blocks: words,
        };
        tt.mask_off();
        tt
    }

    /// Returns the number of variables.
    pub fn num_vars(&self) -> usize {
        self.num_vars as usize
    }

    /// Returns the number of minterms (`2^num_vars`).
    pub fn num_bits(&self) -> usize {
        1usize << self.num_vars
    }

    /// Returns the backing words.
    pub fn blocks(&self) -> &[u64] {
        &self.blocks
    }

    /// Returns the packed bits of a table of at most six variables.
    pub fn as_u64(&self) -> u64 {
        debug_assert!(self.num_vars <= 6);
        self.blocks[0]
    }

    /// Returns the value on minterm `m`.
    pub fn get_bit(&self, m: usize) -> bool {
        (self.blocks[m >> 6] >> (m & 63)) & 1 == 1
    }

    /// Sets the value on minterm `m`.
    pub fn set_bit(&mut self, m: usize, value: bool) {
        if value {
            self.blocks[m >> 6] |= 1u64 << (m & 63);
        } else {
            self.blocks[m >> 6] &= !(1u64 << (m & 63));
        }
    }

    /// Counts the satisfying assignments.
    pub fn count_ones(&self) -> u32 {
        self.blocks.iter().map(|b| b.count_ones()).sum()
    }

    /// Returns `true` if the function is constant 0.
    pub fn is_zero(&self) -> bool {
        self.blocks.iter().all(|&b| b == 0)
    }

    /// Returns `true` if the function is constant 1.
    pub fn is_one(&self) -> bool {
        self.count_ones() as usize == self.num_bits()
    }

    /// Returns `Some(value)` if the function is constant.
    pub fn const_value(&self) -> Option<bool> {
        if self.is_zero() {
            Some(false)
        } else if self.is_one() {
            Some(true)
        } else {
            None
        }
    }

    /// Returns the negative cofactor with respect to `var` (the function
    /// with `var` fixed to 0, duplicated over both halves so the variable
    /// count is preserved).
    pub fn cofactor0(&self, var: usize) -> Self {
        let mut result = self.clone();
        let n = self.num_bits();
        for m in 0..n {
            if (m >> var) & 1 == 1 {
                result.set_bit(m, self.get_bit(m & !(1 << var)));
            }
        }
        result
    }

    /// Returns the positive cofactor with respect to `var`.
    pub fn cofactor1(&self, var: usize) -> Self {
        let mut result = self.clone();
        let n = self.num_bits();
        for m in 0..n {
            if (m >> var) & 1 == 0 {
                result.set_bit(m, self.get_bit(m | (1 << var)));
            }
        }
        result
    }

    /// Returns `true` if the function depends on `var`.
    pub fn depends_on(&self, var: usize) -> bool {
        self.cofactor0(var) != self.cofactor1(var)
    }

    /// Reorders inputs: the result's variable `i` is wired to this table's
    /// variable `perm[i]`. `perm` must be a permutation of `0..num_vars`.
    pub fn permute_inputs(&self, perm: &[u8]) -> Self {
        debug_assert_eq!(perm.len(), self.num_vars());
        let mut result = Self::zero(self.num_vars());
        for m in 0..self.num_bits() {
            // Map the minterm of the result back into this table.
            let mut src = 0usize;
            for (new_var, &old_var) in perm.iter().enumerate() {
                if (m >> new_var) & 1 == 1 {
                    src |= 1 << old_var;
                }
            }
            if self.get_bit(src) {
                result.set_bit(m, true);
            }
        }
        result
    }

    /// Complements the listed inputs: bit `i` of `neg_mask` complements
    /// variable `i`.
    pub fn flip_inputs(&self, neg_mask: u32) -> Self {
        let relevant = neg_mask & ((1u32 << self.num_vars) - 1);
        let mut result = Self::zero(self.num_vars());
        for m in 0..self.num_bits() {
            if self.get_bit(m ^ relevant as usize) {
                result.set_bit(m, true);
            }
        }
        result
    }

    /// Hashes the table contents (including the variable count).
    pub fn content_hash(&self) -> ContentHash {
        let mut words = Vec::with_capacity(self.blocks.len() + 1);
        words.push(self.num_vars as u64);
        words.extend_from_slice(&self.blocks);
        ContentHash::from_words(&words)
    }

    /// Clears bits beyond `2^num_vars`.
    fn mask_off(&mut self) {
        if self.num_vars < 6 {
            self.blocks[0] &= (1u64 << (1 << self.num_vars)) - 1;
        }
    }
}

impl BitAnd for &TruthTable {
    type Output = TruthTable;

    fn bitand(self, rhs: &TruthTable) -> TruthTable {
        debug_assert_eq!(self.num_vars, rhs.num_vars);
        TruthTable {
            num_vars: self.num_vars,
            blocks: self
                .blocks
                .iter()
                .zip(&rhs.blocks)
                .map(|(a, b)| a & b)
                .collect(),
        }
    }
}

impl BitOr for &TruthTable {
    type Output = TruthTable;

    fn bitor(self, rhs: &TruthTable) -> TruthTable {
        debug_assert_eq!(self.num_vars, rhs.num_vars);
        TruthTable {
            num_vars: self.num_vars,
            blocks: self
                .blocks
                .iter()
                .zip(&rhs.blocks)
                .map(|(a, b)| a | b)
                .collect(),
        }
    }
}

impl BitXor for &TruthTable {
    type Output = TruthTable;

    fn bitxor(self, rhs: &TruthTable) -> TruthTable {
        debug_assert_eq!(self.num_vars, rhs.num_vars);
        TruthTable {
            num_vars: self.num_vars,
            blocks: self
                .blocks
                .iter()
                .zip(&rhs.blocks)
                .map(|(a, b)| a ^ b)
                .collect(),
        }
    }
}

impl Not for &TruthTable {
    type Output = TruthTable;

    fn not(self) -> TruthTable {
        let mut tt = TruthTable {
            num_vars: self.num_vars,
            blocks: self.blocks.iter().map(|b| !b).collect(),
        };
        tt.mask_off();
        tt
    }
}

/// Composes `f` with fanin functions: the result on minterm `m` is
/// `f(g_0(m), …, g_{k-1}(m))`. All `fanins` share a variable count, which
/// becomes the result's.
pub fn compose(f: &TruthTable, fanins: &[TruthTable]) -> TruthTable {
    assert_eq!(f.num_vars(), fanins.len(), "arity mismatch in composition");
    let num_vars = fanins.first().map_or(0, |g| g.num_vars());
    let mut result = TruthTable::zero(num_vars);
    for m in 0..result.num_bits() {
        let mut pins = 0usize;
        for (i, g) in fanins.iter().enumerate() {
            if g.get_bit(m) {
                pins |= 1 << i;
            }
        }
        if f.get_bit(pins) {
            result.set_bit(m, true);
        }
    }
    result
}

impl fmt::Debug for TruthTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TruthTable({}v:", self.num_vars)?;
        for b in self.blocks.iter().rev() {
            write!(f, "{b:016x}")?;
        }
        write!(f, ")")
    }
}
