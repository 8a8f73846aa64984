//! Single teleprinter symbol.
//!
//! The Reduced Machine addresses memory and encodes numbers with the
//! 32-character teleprinter alphabet of the Manchester Mark I. Each symbol
//! carries five bits; its position in the canonical ordering is its ordinal.
//! The ordering matters twice at run time: the program counter advances to
//! the successor symbol, and a line-pair's carry lands in the successor row.

use std::fmt;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The canonical teleprinter alphabet, in machine order.
///
/// `'/'` is the zero symbol; `'£'` is the last and has no successor.
pub const ALPHABET: [char; 32] = [
    '/', 'E', '@', 'A', ':', 'S', 'I', 'U', '8', 'D', 'R',
    'J', 'N', 'F', 'C', 'K', 'T', 'Z', 'L', 'W', 'H', 'Y',
    'P', 'Q', 'O', 'B', 'G', '"', 'M', 'X', 'V', '£',
];

/// The number of bits one symbol represents.
pub const SYMBOL_BITS: u32 = 5;

/// One symbol of the machine alphabet.
///
/// Stored as its ordinal so the ordering is an explicit, testable function
/// rather than a side effect of character encoding.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(u8);

impl Symbol {
    /// Number of symbols in the alphabet.
    pub const COUNT: usize = ALPHABET.len();

    /// The first symbol, `'/'`.
    pub const FIRST: Symbol = Symbol(0);

    /// The last symbol, `'£'`.
    pub const LAST: Symbol = Symbol(Self::COUNT as u8 - 1);

    /// Look up a character in the alphabet.
    pub fn from_char(c: char) -> Result<Self, SymbolError> {
        ALPHABET
            .iter()
            .position(|&s| s == c)
            .map(|ord| Symbol(ord as u8))
            .ok_or(SymbolError::InvalidSymbol(c))
    }

    /// The character this symbol prints as.
    #[inline]
    pub const fn to_char(self) -> char {
        ALPHABET[self.0 as usize]
    }

    /// Create a symbol from its ordinal, if in range.
    #[inline]
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        if (ordinal as usize) < Self::COUNT {
            Some(Symbol(ordinal))
        } else {
            None
        }
    }

    /// Position in the canonical ordering (0..31).
    #[inline]
    pub const fn ordinal(self) -> u8 {
        self.0
    }

    /// The next symbol in canonical order.
    ///
    /// Returns `None` for `'£'`: the alphabet does not wrap, and the engine
    /// treats an advance past the end as an address fault.
    #[inline]
    pub fn successor(self) -> Option<Self> {
        if self == Self::LAST {
            None
        } else {
            Some(Symbol(self.0 + 1))
        }
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?}={})", self.to_char(), self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

impl TryFrom<char> for Symbol {
    type Error = SymbolError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        Symbol::from_char(c)
    }
}

impl From<Symbol> for char {
    fn from(s: Symbol) -> char {
        s.to_char()
    }
}

/// Errors from symbol lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum SymbolError {
    /// The character is not in the machine alphabet.
    #[error("symbol {0:?} is not in the machine alphabet")]
    InvalidSymbol(char),
}
