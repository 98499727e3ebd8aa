//! Cells: the functional payload of subnet entries.

use crate::link::Link;
use crate::CellTypeId;
use serde::{Deserialize, Serialize};
use silica_tt::TruthTable;

/// The function a cell computes.
///
/// The logic symbols (`Buf` through `Maj`) are technology-independent;
/// `Cell` names a standard-cell type from a library. After technology
/// mapping only `Cell`, `In`, `Out`, `Zero`, and `One` remain.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum CellSymbol {
    /// A primary input.
    In,
    /// A primary output.
    Out,
    /// Constant 0.
    Zero,
    /// Constant 1.
    One,
    /// Identity placeholder.
    Buf,
    /// Negation placeholder.
    Not,
    /// Conjunction.
    And,
    /// Disjunction.
    Or,
    /// Parity.
    Xor,
    /// Negated conjunction.
    Nand,
    /// Negated disjunction.
    Nor,
    /// Negated parity.
    Xnor,
    /// Three-input majority.
    Maj,
    /// A library cell.
    Cell(CellTypeId),
}

impl CellSymbol {
    /// Returns `true` for `In`.
    pub fn is_in(self) -> bool {
        self == CellSymbol::In
    }

    /// Returns `true` for `Out`.
    pub fn is_out(self) -> bool {
        self == CellSymbol::Out
    }

    /// Returns `true` for `Zero` or `One`.
    pub fn is_const(self) -> bool {
        matches!(self, CellSymbol::Zero | CellSymbol::One)
    }

    /// Returns `true` for cells with zero depth (`In`, `Zero`, `One`).
    pub fn is_source(self) -> bool {
        self.is_in() || self.is_const()
    }

    /// Returns `true` for the unmapped logic symbols that must not remain
    /// after technology mapping.
    pub fn is_unmapped_logic(self) -> bool {
        matches!(
            self,
            CellSymbol::Buf
                | CellSymbol::Not
                | CellSymbol::And
                | CellSymbol::Or
                | CellSymbol::Xor
                | CellSymbol::Nand
                | CellSymbol::Nor
                | CellSymbol::Xnor
                | CellSymbol::Maj
        )
    }

    /// Returns `true` for symbols whose n-ary form folds associatively
    /// (tree decomposition preserves the function).
    pub fn is_associative(self) -> bool {
        matches!(self, CellSymbol::And | CellSymbol::Or | CellSymbol::Xor)
    }

    /// Combines fanin truth tables according to the symbol.
    ///
    /// `Cell` symbols have no intrinsic function; callers resolve them
    /// against a library (see [`eval`](crate::eval)).
    ///
    /// # Panics
    ///
    /// Panics on `In`, `Cell`, or an arity the symbol does not support.
    pub fn eval_tables(self, fanins: &[TruthTable], num_vars: usize) -> TruthTable {
        match self {
            CellSymbol::Zero => TruthTable::zero(num_vars),
            CellSymbol::One => TruthTable::one(num_vars),
            CellSymbol::Buf | CellSymbol::Out => fanins[0].clone(),
            CellSymbol::Not => !&fanins[0],
            CellSymbol::And => fold(fanins, |a, b| a & b),
            CellSymbol::Or => fold(fanins, |a, b| a | b),
            CellSymbol::Xor => fold(fanins, |a, b| a ^ b),
            CellSymbol::Nand => !&fold(fanins, |a, b| a & b),
            CellSymbol::Nor => !&fold(fanins, |a, b| a | b),
            CellSymbol::Xnor => !&fold(fanins, |a, b| a ^ b),
            CellSymbol::Maj => {
                assert_eq!(fanins.len(), 3, "MAJ is three-input");
                let ab = &fanins[0] & &fanins[1];
                let ac = &fanins[0] & &fanins[2];
                let bc = &fanins[1] & &fanins[2];
                &(&ab | &ac) | &bc
            }
            CellSymbol::In | CellSymbol::Cell(_) => {
                panic!("symbol {self:?} has no intrinsic function")
            }
        }
    }

    /// Packed-`u64` counterpart of [`eval_tables`](Self::eval_tables) for
    /// views of at most six inputs.
    pub fn eval_words(self, fanins: &[u64], num_vars: usize) -> u64 {
        let mask = silica_tt::tt6::mask(num_vars);
        match self {
            CellSymbol::Zero => 0,
            CellSymbol::One => mask,
            CellSymbol::Buf | CellSymbol::Out => fanins[0],
            CellSymbol::Not => !fanins[0] & mask,
            CellSymbol::And => fanins.iter().fold(mask, |a, b| a & b),
            CellSymbol::Or => fanins.iter().fold(0, |a, b| a | b),
            CellSymbol::Xor => fanins.iter().fold(0, |a, b| a ^ b),
            CellSymbol::Nand => !fanins.iter().fold(mask, |a, b| a & b) & mask,
            CellSymbol::Nor => !fanins.iter().fold(0u64, |a, b| a | b) & mask,
            CellSymbol::Xnor => !fanins.iter().fold(0u64, |a, b| a ^ b) & mask,
            CellSymbol::Maj => {
                assert_eq!(fanins.len(), 3, "MAJ is three-input");
                (fanins[0] & fanins[1]) | (fanins[0] & fanins[2]) | (fanins[1] & fanins[2])
            }
            CellSymbol::In | CellSymbol::Cell(_) => {
                panic!("symbol {self:?} has no intrinsic function")
            }
        }
    }
}

fn fold(fanins: &[TruthTable], op: impl Fn(&TruthTable, &TruthTable) -> TruthTable) -> TruthTable {
    assert!(!fanins.is_empty());
    let mut acc = fanins[0].clone();
    for tt in &fanins[1..] {
        acc = op(&acc, tt);
    }
    acc
}

/// A cell: its symbol, ordered fanin links, and output count.
///
/// Multi-output cells exist only for library `Cell` symbols; every logic
/// symbol has exactly one output.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Cell {
    /// The function symbol.
    pub symbol: CellSymbol,
    /// Ordered fanin links.
    pub links: Vec<Link>,
    /// Number of outputs (≥ 1).
    pub outs: u16,
}

impl Cell {
    /// Creates a single-output cell.
    pub fn new(symbol: CellSymbol, links: Vec<Link>) -> Self {
        Self {
            symbol,
            links,
            outs: 1,
        }
    }

    /// Returns the arity (number of fanin links).
    pub fn arity(&self) -> u16 {
        self.links.len() as u16
    }

    /// Returns `true` for `In`.
    pub fn is_in(&self) -> bool {
        self.symbol.is_in()
    }

    /// Returns `true` for `Out`.
    pub fn is_out(&self) -> bool {
        self.symbol.is_out()
    }
}
