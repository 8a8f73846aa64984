//! Program text handling.
//!
//! The Reduced Machine has no mnemonics: a program file already *is*
//! machine code, written in the same symbols the machine stores. This
//! module parses the record format and writes it into a line store.

pub mod program;

pub use program::{load, LoadError, Program, Record, COMMENT_MARKER};
