//! The Reduced Machine core.
//!
//! - 1024 twenty-bit lines on a 32x32 symbol grid
//! - extended precision via line pairs with a carry partner
//! - a single 40-bit-modulus accumulator
//! - a data-driven function table over two-symbol codes

pub mod store;
pub mod pair;
pub mod decode;
pub mod execute;

pub use store::{LineStore, StoreError};
pub use pair::{CarryRule, PAIR_MODULUS};
pub use decode::{FunctionCode, FunctionTable, Instruction, Operation};
pub use execute::{Fault, Machine, MachineError, MachineState};
