//! # Reduced Machine Emulator
//!
//! An emulator of the Reduced Machine — the minimised Manchester Mark I
//! described by Turing in the Mark I programming manual. Memory is
//! addressed by pairs of teleprinter symbols, extended-precision values
//! span pairs of lines with an alphabet-defined carry partner, and the
//! program counter advances by symbol succession rather than integer
//! increment. There is no halt opcode: programs stop by jumping a line at
//! itself, and the engine reports `Halted` when the counter holds still.

pub mod symbol;
pub mod machine;
pub mod loader;

// Re-export commonly used types
pub use symbol::{Address, CodecError, Field, Symbol, SymbolError, ALPHABET};
pub use machine::{
    CarryRule, Fault, FunctionCode, FunctionTable, Instruction, LineStore, Machine, MachineError,
    MachineState, Operation, StoreError, PAIR_MODULUS,
};
pub use loader::{LoadError, Program, Record};
