//! Instruction decoding and the function table.
//!
//! A fetched line is read as four symbols: the first two are the operand
//! address (row, column), the last two the function code. The code selects
//! an operation through the [`FunctionTable`], a plain code-to-operation
//! mapping; the original function-code space was open-ended, so new codes
//! register in the table without the step loop changing.
//!
//! The loader never validates codes — a line only has to decode as an
//! instruction if the program counter actually reaches it.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::symbol::{Address, Field, Symbol, SYMBOL_BITS};

/// A two-symbol function code, the suffix of an operand field.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionCode([Symbol; 2]);

impl FunctionCode {
    pub const fn new(symbols: [Symbol; 2]) -> Self {
        Self(symbols)
    }

    /// Parse a two-character code such as `"T/"`.
    pub fn parse(text: &str) -> Result<Self, crate::symbol::CodecError> {
        let addr = Address::parse(text)?;
        Ok(Self([addr.row(), addr.col()]))
    }

    #[inline]
    pub const fn symbols(self) -> [Symbol; 2] {
        self.0
    }
}

impl fmt::Debug for FunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FunctionCode({}{})", self.0[0], self.0[1])
    }
}

impl fmt::Display for FunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.0[0], self.0[1])
    }
}

/// A decoded instruction: operand address plus function code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// The line the operation acts on (or through, for indirect branches).
    pub operand: Address,
    /// Which operation to perform.
    pub code: FunctionCode,
}

impl Instruction {
    pub const fn new(operand: Address, code: FunctionCode) -> Self {
        Self { operand, code }
    }

    /// Split a line word into operand address and function code.
    ///
    /// Total: every line value decodes; whether the code means anything is
    /// the function table's business.
    pub fn decode(word: u32) -> Self {
        let [s0, s1, s2, s3] = Field::from_word(word).symbols();
        Self {
            operand: Address::new(s0, s1),
            code: FunctionCode([s2, s3]),
        }
    }

    /// Pack back into a line word.
    pub fn encode(self) -> u32 {
        let [c0, c1] = self.code.0;
        self.operand.to_word()
            | (c0.ordinal() as u32) << (2 * SYMBOL_BITS)
            | (c1.ordinal() as u32) << (3 * SYMBOL_BITS)
    }

    /// The instruction as a four-symbol field.
    pub fn field(self) -> Field {
        let [c0, c1] = self.code.0;
        Field::new([self.operand.row(), self.operand.col(), c0, c1])
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operand, self.code)
    }
}

/// What a function code does when executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// `A := pair[n]`
    Load,
    /// `A := (A + pair[n]) mod 2^40`
    Add,
    /// `A := (A - pair[n]) mod 2^40`, wrapping on underflow
    Subtract,
    /// `pair[n] := A`
    Store,
    /// Same write as [`Operation::Store`]; counter maintenance is its own
    /// operation class even though the mechanics are identical.
    CounterStore,
    /// If `A != 0`, jump to the address stored in line `n`.
    LoopNonzero,
    /// Jump to the address stored in line `n` — double indirection. Jumping
    /// a line at itself is the machine's halt idiom.
    Jump,
    /// `A := 0`
    Clear,
    /// `A := (2 * pair[n]) mod 2^40`
    Double,
    /// No effect.
    Nop,
}

impl Operation {
    /// Does this operation read a line pair?
    pub const fn reads_memory(self) -> bool {
        matches!(
            self,
            Operation::Load
                | Operation::Add
                | Operation::Subtract
                | Operation::Double
                | Operation::LoopNonzero
                | Operation::Jump
        )
    }

    /// Does this operation write memory with carry (a pair store)?
    pub const fn writes_memory(self) -> bool {
        matches!(self, Operation::Store | Operation::CounterStore)
    }

    /// Does this operation replace the accumulator?
    pub const fn writes_accumulator(self) -> bool {
        matches!(
            self,
            Operation::Load
                | Operation::Add
                | Operation::Subtract
                | Operation::Clear
                | Operation::Double
        )
    }

    /// Can this operation redirect the program counter?
    pub const fn branches(self) -> bool {
        matches!(self, Operation::LoopNonzero | Operation::Jump)
    }
}

/// The code-to-operation mapping the engine dispatches through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionTable {
    entries: Vec<(FunctionCode, Operation)>,
}

impl FunctionTable {
    /// An empty table. Every fetch faults until codes are registered.
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// The Reduced Machine's documented repertoire.
    pub fn reduced() -> Self {
        let mut table = Self::empty();
        // Accumulator group
        table.insert(code("T/"), Operation::Load);
        table.insert(code("T:"), Operation::Clear);
        table.insert(code("TI"), Operation::Add);
        table.insert(code("TN"), Operation::Subtract);
        table.insert(code("TK"), Operation::Double);
        table.insert(code("T£"), Operation::Nop);
        // Store group
        table.insert(code("/S"), Operation::Store);
        table.insert(code("/C"), Operation::CounterStore);
        // Control group
        table.insert(code("/H"), Operation::LoopNonzero);
        table.insert(code("/P"), Operation::Jump);
        table
    }

    /// Register a code, replacing any previous binding.
    pub fn insert(&mut self, code: FunctionCode, op: Operation) {
        if let Some(entry) = self.entries.iter_mut().find(|(c, _)| *c == code) {
            entry.1 = op;
        } else {
            self.entries.push((code, op));
        }
    }

    /// Look up a code. `None` is an execution-time fault, not a load error.
    pub fn lookup(&self, code: FunctionCode) -> Option<Operation> {
        self.entries
            .iter()
            .find(|(c, _)| *c == code)
            .map(|&(_, op)| op)
    }

    /// Inspect the table's entries.
    pub fn iter(&self) -> impl Iterator<Item = (FunctionCode, Operation)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for FunctionTable {
    fn default() -> Self {
        Self::reduced()
    }
}

fn code(text: &str) -> FunctionCode {
    FunctionCode::parse(text).expect("builtin function code")
}
