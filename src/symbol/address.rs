//! Two-symbol addresses.
//!
//! A line address is an ordered pair of symbols: the row symbol and the
//! column symbol. The 32x32 grid gives 1024 addressable lines. The row
//! symbol is the one that moves: the program counter steps to the successor
//! row, and a pair-store's carry lands in the successor row of the same
//! column.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::symbol::field::CodecError;
use crate::symbol::sym::{Symbol, SYMBOL_BITS};

/// An address: (row symbol, column symbol).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    row: Symbol,
    col: Symbol,
}

impl Address {
    /// Number of rows in the grid.
    pub const ROWS: usize = Symbol::COUNT;

    /// Number of columns in the grid.
    pub const COLS: usize = Symbol::COUNT;

    /// Total number of addressable lines.
    pub const GRID: usize = Self::ROWS * Self::COLS;

    /// The grid origin, `//`.
    pub const ORIGIN: Address = Address { row: Symbol::FIRST, col: Symbol::FIRST };

    pub const fn new(row: Symbol, col: Symbol) -> Self {
        Self { row, col }
    }

    /// Parse a two-symbol address field, e.g. `"@E"`.
    pub fn parse(text: &str) -> Result<Self, CodecError> {
        let mut chars = text.chars();
        let (row, col) = match (chars.next(), chars.next(), chars.next()) {
            (Some(r), Some(c), None) => (Symbol::from_char(r)?, Symbol::from_char(c)?),
            _ => {
                return Err(CodecError::WrongLength {
                    expected: 2,
                    found: text.chars().count(),
                })
            }
        };
        Ok(Self { row, col })
    }

    #[inline]
    pub const fn row(self) -> Symbol {
        self.row
    }

    #[inline]
    pub const fn col(self) -> Symbol {
        self.col
    }

    /// Flatten to a linear store index: `ordinal(row) * 32 + ordinal(col)`.
    #[inline]
    pub const fn index(self) -> usize {
        self.row.ordinal() as usize * Self::COLS + self.col.ordinal() as usize
    }

    /// Inverse of [`Address::index`].
    pub fn from_index(index: usize) -> Option<Self> {
        if index >= Self::GRID {
            return None;
        }
        let row = Symbol::from_ordinal((index / Self::COLS) as u8)?;
        let col = Symbol::from_ordinal((index % Self::COLS) as u8)?;
        Some(Self { row, col })
    }

    /// The numeric form an address takes when stored in a line.
    ///
    /// Symbols are little-endian in a stored word, so the row symbol sits in
    /// the low five bits, exactly as it does in an instruction field.
    #[inline]
    pub const fn to_word(self) -> u32 {
        self.row.ordinal() as u32 | ((self.col.ordinal() as u32) << SYMBOL_BITS)
    }

    /// Read an address back out of a stored value.
    ///
    /// Only the low ten bits are significant; anything above them is
    /// discarded, as the original machine reduced stored destinations modulo
    /// the short-line size.
    pub fn from_word(word: u32) -> Self {
        let mask = Symbol::COUNT as u32 - 1;
        // Both lookups stay in range by construction of the mask.
        let row = Symbol::from_ordinal((word & mask) as u8).unwrap_or(Symbol::FIRST);
        let col = Symbol::from_ordinal(((word >> SYMBOL_BITS) & mask) as u8).unwrap_or(Symbol::FIRST);
        Self { row, col }
    }

    /// Successor row, same column.
    ///
    /// This is both the program counter's advance rule and the default
    /// carry-partner rule. `None` when the row symbol is the alphabet's last.
    #[inline]
    pub fn next_row(self) -> Option<Self> {
        Some(Self {
            row: self.row.successor()?,
            col: self.col,
        })
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({}{})", self.row, self.col)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn addr(row: u8, col: u8) -> Address {
        Address::new(
            Symbol::from_ordinal(row).unwrap(),
            Symbol::from_ordinal(col).unwrap(),
        )
    }

    #[test]
    fn test_parse_display_roundtrip() {
        let a = Address::parse("@E").unwrap();
        assert_eq!(a.row().to_char(), '@');
        assert_eq!(a.col().to_char(), 'E');
        assert_eq!(a.to_string(), "@E");
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert!(matches!(
            Address::parse("@"),
            Err(CodecError::WrongLength { expected: 2, found: 1 })
        ));
        assert!(matches!(
            Address::parse("@EA"),
            Err(CodecError::WrongLength { expected: 2, found: 3 })
        ));
        assert!(matches!(Address::parse("@z"), Err(CodecError::InvalidSymbol(_))));
    }

    #[test]
    fn test_index_layout() {
        assert_eq!(Address::ORIGIN.index(), 0);
        assert_eq!(addr(0, 1).index(), 1);
        assert_eq!(addr(1, 0).index(), 32);
        assert_eq!(addr(31, 31).index(), Address::GRID - 1);
    }

    #[test]
    fn test_word_form_is_row_low() {
        // "E/" = row E (1), col / (0) -> word 1
        assert_eq!(addr(1, 0).to_word(), 1);
        // "/E" = row / (0), col E (1) -> word 32
        assert_eq!(addr(0, 1).to_word(), 32);
    }

    #[test]
    fn test_from_word_ignores_high_bits() {
        let a = addr(5, 7);
        assert_eq!(Address::from_word(a.to_word() | 0xFFC00), a);
    }

    #[test]
    fn test_next_row() {
        let a = addr(3, 9);
        assert_eq!(a.next_row(), Some(addr(4, 9)));
        assert_eq!(addr(31, 9).next_row(), None);
    }

    proptest! {
        #[test]
        fn prop_index_roundtrip(index in 0usize..Address::GRID) {
            let a = Address::from_index(index).unwrap();
            prop_assert_eq!(a.index(), index);
        }

        #[test]
        fn prop_word_roundtrip(row in 0u8..32, col in 0u8..32) {
            let a = addr(row, col);
            prop_assert_eq!(Address::from_word(a.to_word()), a);
        }
    }
}
