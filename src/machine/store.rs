//! The line store.
//!
//! 1024 twenty-bit lines, one per (row, column) address. Every line exists
//! for the machine's whole lifetime and starts at zero; only store-class
//! operations mutate one. Code and data share this space — a line's role is
//! decided by whether the program counter ever reaches it.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::symbol::{Address, LINE_MODULUS};

/// The Reduced Machine's addressable memory.
#[derive(Clone, Serialize, Deserialize)]
pub struct LineStore {
    lines: Vec<u32>,
}

impl LineStore {
    /// Create a store with every line zeroed.
    pub fn new() -> Self {
        Self {
            lines: vec![0; Address::GRID],
        }
    }

    /// Read one line.
    #[inline]
    pub fn get(&self, addr: Address) -> u32 {
        self.lines[addr.index()]
    }

    /// Write one line.
    ///
    /// # Panics
    /// Panics if the value does not fit in a line.
    #[inline]
    pub fn set(&mut self, addr: Address, value: u32) {
        assert!(
            value < LINE_MODULUS,
            "line value {} exceeds the per-line modulus at {}",
            value,
            addr
        );
        self.lines[addr.index()] = value;
    }

    /// Reset every line to zero.
    pub fn clear(&mut self) {
        for line in &mut self.lines {
            *line = 0;
        }
    }

    /// Enumerate the non-zero lines (for inspection and dumps).
    pub fn dump(&self) -> Vec<(Address, u32)> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, &value)| value != 0)
            .filter_map(|(index, &value)| Address::from_index(index).map(|a| (a, value)))
            .collect()
    }
}

impl Default for LineStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LineStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.lines.iter().filter(|&&v| v != 0).count();
        f.debug_struct("LineStore")
            .field("non_zero_lines", &non_zero)
            .field("total_lines", &Address::GRID)
            .finish()
    }
}

/// Errors raised by addressed access to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum StoreError {
    /// The address escapes the grid: the row symbol has no successor, so a
    /// carry partner or advanced program counter does not exist.
    #[error("address out of range: no successor row past {at}")]
    AddressOutOfRange { at: Address },
}
