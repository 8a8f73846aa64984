//! Program text and the loader.
//!
//! A program is a sequence of records, one per line:
//!
//! ```text
//! # sum the array into @E
//! @/ @ET/    # trailing comments are fine too
//! A/ //TI
//! ```
//!
//! Each record is a two-symbol address field, whitespace, and a four-symbol
//! operand field; `#` starts a comment and blank lines are ignored. Records
//! carry no code/data tag — the loader writes raw symbols and leaves every
//! interpretation question to execution time, function codes included.

use std::collections::HashSet;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

use crate::machine::LineStore;
use crate::symbol::{Address, CodecError, Field};

/// The comment marker in program text.
pub const COMMENT_MARKER: char = '#';

/// One loader entry: where, and which four symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    pub addr: Address,
    pub field: Field,
    /// Source line number, for error reporting.
    pub line: usize,
}

/// A parsed program, ready to load.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub records: Vec<Record>,
}

impl Program {
    /// Parse program text.
    pub fn parse(source: &str) -> Result<Self, LoadError> {
        let mut records = Vec::new();
        for (index, raw) in source.lines().enumerate() {
            if let Some(record) = parse_record(raw, index + 1)? {
                records.push(record);
            }
        }
        Ok(Self { records })
    }

    /// Read and parse a program file.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let file = std::fs::File::open(path.as_ref()).map_err(|e| LoadError::Io(e.to_string()))?;
        let reader = BufReader::new(file);

        let mut records = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let raw = line.map_err(|e| LoadError::Io(e.to_string()))?;
            if let Some(record) = parse_record(&raw, index + 1)? {
                records.push(record);
            }
        }
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn parse_record(raw: &str, line: usize) -> Result<Option<Record>, LoadError> {
    let text = match raw.find(COMMENT_MARKER) {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    let mut tokens = text.split_whitespace();

    let addr_text = match tokens.next() {
        Some(t) => t,
        None => return Ok(None), // blank or comment-only line
    };
    let addr = Address::parse(addr_text).map_err(|reason| LoadError::InvalidAddress {
        line,
        text: addr_text.to_string(),
        reason,
    })?;

    let field_text = tokens.next().ok_or(LoadError::MissingOperand { line, addr })?;
    let field = Field::parse(field_text).map_err(|reason| LoadError::MalformedField {
        line,
        addr,
        text: field_text.to_string(),
        reason,
    })?;

    if let Some(extra) = tokens.next() {
        return Err(LoadError::TrailingText {
            line,
            text: extra.to_string(),
        });
    }

    Ok(Some(Record { addr, field, line }))
}

/// Write a program's operand fields into the store.
///
/// Rejects two records targeting the same line; performs no interpretation
/// of the written symbols.
pub fn load(store: &mut LineStore, program: &Program) -> Result<(), LoadError> {
    let mut seen = HashSet::new();
    for record in &program.records {
        if !seen.insert(record.addr.index()) {
            return Err(LoadError::DuplicateAddress {
                line: record.line,
                addr: record.addr,
            });
        }
        store.set(record.addr, record.field.to_word());
    }
    Ok(())
}

/// Errors from parsing or loading program text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("line {line}: invalid address field {text:?}: {reason}")]
    InvalidAddress {
        line: usize,
        text: String,
        reason: CodecError,
    },

    #[error("line {line}: malformed operand field {text:?} for address {addr}: {reason}")]
    MalformedField {
        line: usize,
        addr: Address,
        text: String,
        reason: CodecError,
    },

    #[error("line {line}: record for address {addr} has no operand field")]
    MissingOperand { line: usize, addr: Address },

    #[error("line {line}: unexpected text {text:?} after the operand field")]
    TrailingText { line: usize, text: String },

    #[error("line {line}: duplicate entry for address {addr}")]
    DuplicateAddress { line: usize, addr: Address },
}
