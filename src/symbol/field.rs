//! Four-symbol operand fields.
//!
//! A line holds one field of exactly four symbols, packed little-endian at
//! five bits per symbol into a 20-bit word. The same field is a number when
//! read as data and an instruction (operand address + function code) when
//! the program counter reaches it; nothing in the field itself says which.

use std::fmt;
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::symbol::sym::{Symbol, SymbolError, SYMBOL_BITS};

/// Symbols per operand field.
pub const FIELD_SYMBOLS: usize = 4;

/// Bits per line: four symbols at five bits each.
pub const LINE_BITS: u32 = FIELD_SYMBOLS as u32 * SYMBOL_BITS;

/// Per-line modulus: a line value is always in `[0, 2^20)`.
pub const LINE_MODULUS: u32 = 1 << LINE_BITS;

/// A four-symbol field, the symbolic form of one line.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field([Symbol; FIELD_SYMBOLS]);

impl Field {
    pub const fn new(symbols: [Symbol; FIELD_SYMBOLS]) -> Self {
        Self(symbols)
    }

    /// Parse exactly four alphabet characters, e.g. `"@ET/"`.
    pub fn parse(text: &str) -> Result<Self, CodecError> {
        let mut symbols = [Symbol::FIRST; FIELD_SYMBOLS];
        let mut count = 0;
        for c in text.chars() {
            if count < FIELD_SYMBOLS {
                symbols[count] = Symbol::from_char(c)?;
            }
            count += 1;
        }
        if count != FIELD_SYMBOLS {
            return Err(CodecError::WrongLength {
                expected: FIELD_SYMBOLS,
                found: count,
            });
        }
        Ok(Self(symbols))
    }

    /// Unpack a line word into its four symbols.
    ///
    /// Total: every value below [`LINE_MODULUS`] names exactly one field.
    /// Bits above the line width are discarded.
    pub fn from_word(word: u32) -> Self {
        let mask = Symbol::COUNT as u32 - 1;
        let mut symbols = [Symbol::FIRST; FIELD_SYMBOLS];
        for (i, slot) in symbols.iter_mut().enumerate() {
            let ord = (word >> (SYMBOL_BITS * i as u32)) & mask;
            // In range by construction of the mask.
            *slot = Symbol::from_ordinal(ord as u8).unwrap_or(Symbol::FIRST);
        }
        Self(symbols)
    }

    /// Pack into a line word, first symbol least significant.
    pub fn to_word(self) -> u32 {
        self.0
            .iter()
            .enumerate()
            .map(|(i, sym)| (sym.ordinal() as u32) << (SYMBOL_BITS * i as u32))
            .sum()
    }

    #[inline]
    pub const fn symbols(self) -> [Symbol; FIELD_SYMBOLS] {
        self.0
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Field({})", self)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for sym in &self.0 {
            write!(f, "{}", sym)?;
        }
        Ok(())
    }
}

/// Errors from parsing symbolic address or operand text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum CodecError {
    #[error(transparent)]
    InvalidSymbol(#[from] SymbolError),

    #[error("expected exactly {expected} symbols, found {found}")]
    WrongLength { expected: usize, found: usize },
}
