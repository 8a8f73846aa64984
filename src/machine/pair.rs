//! The line-pair view.
//!
//! Extended-precision values live across two lines: the addressed line holds
//! the low twenty bits and its carry partner the next twenty. The machine's
//! documented partner is the successor row of the same column, which is also
//! how the addressed line overflows into it on a store.
//!
//! The partner rule is deliberately a parameter. The documented store
//! pattern only ever demonstrates the successor rule; a program that names a
//! different carry target can substitute a fixed one.

use serde::{Serialize, Deserialize};

use crate::machine::store::{LineStore, StoreError};
use crate::symbol::{Address, LINE_BITS, LINE_MODULUS};

/// Combined capacity of a line pair, and the accumulator modulus: 2^40.
pub const PAIR_MODULUS: u64 = (LINE_MODULUS as u64) * (LINE_MODULUS as u64);

/// Where a pair's high half lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CarryRule {
    /// Successor of the addressed row, same column. The documented rule.
    RowSuccessor,
    /// A fixed, explicitly named line.
    Fixed(Address),
}

impl CarryRule {
    /// Resolve the carry partner for an addressed line.
    ///
    /// `None` when the successor rule runs off the bottom of the alphabet.
    pub fn partner(self, addr: Address) -> Option<Address> {
        match self {
            CarryRule::RowSuccessor => addr.next_row(),
            CarryRule::Fixed(partner) => Some(partner),
        }
    }
}

impl Default for CarryRule {
    fn default() -> Self {
        CarryRule::RowSuccessor
    }
}

impl LineStore {
    /// Read the double-width value at `addr`:
    /// `line + 2^20 * partner`.
    pub fn get_pair(&self, addr: Address, rule: CarryRule) -> Result<u64, StoreError> {
        let partner = rule
            .partner(addr)
            .ok_or(StoreError::AddressOutOfRange { at: addr })?;
        Ok(self.get(addr) as u64 | (self.get(partner) as u64) << LINE_BITS)
    }

    /// Write a double-width value at `addr`.
    ///
    /// The low twenty bits go to the addressed line, the next twenty to the
    /// carry partner. Anything past the pair's combined capacity is
    /// discarded — overflow wraps silently.
    pub fn set_pair(&mut self, addr: Address, value: u64, rule: CarryRule) -> Result<(), StoreError> {
        let partner = rule
            .partner(addr)
            .ok_or(StoreError::AddressOutOfRange { at: addr })?;
        let value = value % PAIR_MODULUS;
        self.set(addr, (value & (LINE_MODULUS as u64 - 1)) as u32);
        self.set(partner, (value >> LINE_BITS) as u32);
        Ok(())
    }
}
