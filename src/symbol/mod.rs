//! Symbolic codec for the Reduced Machine.
//!
//! The machine is addressed and programmed entirely in the Mark I's
//! teleprinter alphabet:
//! - [`Symbol`]: one character with an ordinal and a successor
//! - [`Address`]: a (row, column) symbol pair naming one line
//! - [`Field`]: a four-symbol operand field, the symbolic form of a line

pub mod sym;
pub mod address;
pub mod field;

pub use sym::{Symbol, SymbolError, ALPHABET, SYMBOL_BITS};
pub use address::Address;
pub use field::{CodecError, Field, FIELD_SYMBOLS, LINE_BITS, LINE_MODULUS};
