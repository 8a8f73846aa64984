//! The fetch-execute engine.
//!
//! One machine owns one line store and one accumulator for the duration of
//! a run. A step fetches the line under the program counter, splits it into
//! operand address and function code, dispatches through the function
//! table, then advances the counter to the successor row unless a branch
//! already moved it.
//!
//! There is no halt opcode. A program stops by jumping a line at itself;
//! the engine recognises the idiom as "program counter unchanged across a
//! step" and reports `Halted` instead of spinning. Callers that cannot
//! trust a program to reach that state should run with a step budget.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::loader::{self, LoadError, Program};
use crate::machine::decode::{FunctionCode, FunctionTable, Instruction, Operation};
use crate::machine::pair::{CarryRule, PAIR_MODULUS};
use crate::machine::store::{LineStore, StoreError};
use crate::symbol::Address;

/// Engine state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineState {
    /// Fetching and executing normally.
    Running,
    /// The program counter held still across a step (the self-jump idiom).
    Halted,
    /// The run died; the payload says where and why.
    Faulted(Fault),
}

/// A fatal execution fault. The run is over; there is no retry.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum Fault {
    /// The fetched function code has no entry in the function table.
    #[error("unknown function code {code} at {at}")]
    UnknownFunction { at: Address, code: FunctionCode },

    /// The program counter or an operand escaped the grid.
    #[error("address out of range at {at}")]
    AddressOutOfRange { at: Address },
}

impl From<StoreError> for Fault {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AddressOutOfRange { at } => Fault::AddressOutOfRange { at },
        }
    }
}

/// Errors returned by [`Machine::step`] and the run loops.
#[derive(Debug, Clone, Error)]
pub enum MachineError {
    #[error("machine is not running: {0:?}")]
    NotRunning(MachineState),

    #[error(transparent)]
    Fault(#[from] Fault),

    #[error("load error: {0}")]
    Load(#[from] LoadError),
}

/// The Reduced Machine.
#[derive(Clone, Serialize, Deserialize)]
pub struct Machine {
    /// Main memory.
    pub store: LineStore,
    /// The accumulator, always in `[0, 2^40)`.
    pub acc: u64,
    /// The address currently being fetched.
    pub pc: Address,
    /// Current engine state.
    pub state: MachineState,
    /// Steps executed so far.
    pub steps: u64,
    /// Where pair stores send their carry.
    pub carry: CarryRule,
    table: FunctionTable,
    last_instr: Option<Instruction>,
}

impl Machine {
    /// A machine with zeroed store and accumulator, the documented function
    /// repertoire, and the program counter at the grid origin.
    pub fn new() -> Self {
        Self {
            store: LineStore::new(),
            acc: 0,
            pc: Address::ORIGIN,
            state: MachineState::Running,
            steps: 0,
            carry: CarryRule::RowSuccessor,
            table: FunctionTable::reduced(),
            last_instr: None,
        }
    }

    /// Reset to initial state: store cleared, accumulator zero, counter at
    /// the origin.
    pub fn reset(&mut self) {
        self.store.clear();
        self.acc = 0;
        self.pc = Address::ORIGIN;
        self.state = MachineState::Running;
        self.steps = 0;
        self.last_instr = None;
    }

    /// Write a parsed program's records into the store.
    pub fn load_program(&mut self, program: &Program) -> Result<(), LoadError> {
        loader::load(&mut self.store, program)
    }

    /// The dispatch table, for inspection.
    pub fn function_table(&self) -> &FunctionTable {
        &self.table
    }

    /// The dispatch table, for registering codes.
    pub fn function_table_mut(&mut self) -> &mut FunctionTable {
        &mut self.table
    }

    /// Read the line pair at `addr` under the machine's carry rule.
    ///
    /// This is how external tooling observes the designated total cell once
    /// the machine reports `Halted` or `Faulted`.
    pub fn pair(&self, addr: Address) -> Result<u64, StoreError> {
        self.store.get_pair(addr, self.carry)
    }

    /// Execute one instruction.
    ///
    /// Returns the instruction that was executed. A fault transitions the
    /// machine to `Faulted` and performs no other mutation.
    pub fn step(&mut self) -> Result<Instruction, MachineError> {
        if self.state != MachineState::Running {
            return Err(MachineError::NotRunning(self.state.clone()));
        }

        // Fetch and split
        let pc = self.pc;
        let instr = Instruction::decode(self.store.get(pc));

        // Dispatch through the table
        let op = match self.table.lookup(instr.code) {
            Some(op) => op,
            None => {
                return Err(self.raise(Fault::UnknownFunction {
                    at: pc,
                    code: instr.code,
                }))
            }
        };

        // Execute
        let mut branch = None;
        match op {
            Operation::Load => {
                self.acc = self.read_pair(instr.operand)?;
            }
            Operation::Add => {
                let operand = self.read_pair(instr.operand)?;
                self.acc = (self.acc + operand) % PAIR_MODULUS;
            }
            Operation::Subtract => {
                let operand = self.read_pair(instr.operand)?;
                self.acc = (self.acc + PAIR_MODULUS - operand) % PAIR_MODULUS;
            }
            Operation::Double => {
                let operand = self.read_pair(instr.operand)?;
                self.acc = (2 * operand) % PAIR_MODULUS;
            }
            Operation::Store | Operation::CounterStore => {
                self.write_pair(instr.operand, self.acc)?;
            }
            Operation::Clear => {
                self.acc = 0;
            }
            Operation::Nop => {}
            Operation::LoopNonzero => {
                if self.acc != 0 {
                    branch = Some(self.destination(instr.operand));
                }
            }
            Operation::Jump => {
                branch = Some(self.destination(instr.operand));
            }
        }

        // Advance, unless a branch already moved the counter
        self.pc = match branch {
            Some(addr) => addr,
            None => match pc.next_row() {
                Some(addr) => addr,
                None => return Err(self.raise(Fault::AddressOutOfRange { at: pc })),
            },
        };

        self.steps += 1;
        self.last_instr = Some(instr);

        // Self-jump: the halt idiom
        if self.pc == pc {
            self.state = MachineState::Halted;
        }

        Ok(instr)
    }

    /// Run until the machine leaves `Running`.
    ///
    /// Returns the number of steps executed. A program that loops without
    /// ever holding its counter still will not return; prefer
    /// [`Machine::run_limited`] for untrusted programs.
    pub fn run(&mut self) -> Result<u64, MachineError> {
        let start = self.steps;
        while self.state == MachineState::Running {
            self.step()?;
        }
        Ok(self.steps - start)
    }

    /// Run for at most `max_steps` steps.
    pub fn run_limited(&mut self, max_steps: u64) -> Result<u64, MachineError> {
        let start = self.steps;
        let limit = self.steps + max_steps;
        while self.state == MachineState::Running && self.steps < limit {
            self.step()?;
        }
        Ok(self.steps - start)
    }

    /// The last executed instruction (for tracing).
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    pub fn is_running(&self) -> bool {
        self.state == MachineState::Running
    }

    pub fn is_halted(&self) -> bool {
        self.state == MachineState::Halted
    }

    /// The fault that ended the run, if one did.
    pub fn fault(&self) -> Option<&Fault> {
        match &self.state {
            MachineState::Faulted(fault) => Some(fault),
            _ => None,
        }
    }

    /// A branch destination: the address stored *in* the operand line.
    ///
    /// Single-line read, low ten bits — the double indirection that also
    /// gives programs their self-jump halt.
    fn destination(&self, operand: Address) -> Address {
        Address::from_word(self.store.get(operand))
    }

    fn read_pair(&mut self, addr: Address) -> Result<u64, MachineError> {
        match self.store.get_pair(addr, self.carry) {
            Ok(value) => Ok(value),
            Err(e) => Err(self.raise(e.into())),
        }
    }

    fn write_pair(&mut self, addr: Address, value: u64) -> Result<(), MachineError> {
        match self.store.set_pair(addr, value, self.carry) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.raise(e.into())),
        }
    }

    fn raise(&mut self, fault: Fault) -> MachineError {
        self.state = MachineState::Faulted(fault.clone());
        MachineError::Fault(fault)
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("state", &self.state)
            .field("pc", &self.pc)
            .field("acc", &self.acc)
            .field("steps", &self.steps)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Symbol;

    fn addr(row: u8, col: u8) -> Address {
        Address::new(
            Symbol::from_ordinal(row).unwrap(),
            Symbol::from_ordinal(col).unwrap(),
        )
    }

    fn instr(row: u8, col: u8, code: &str) -> u32 {
        Instruction::new(addr(row, col), FunctionCode::parse(code).unwrap()).encode()
    }

    #[test]
    fn test_self_jump_halts() {
        let mut machine = Machine::new();
        // Line // jumps through line /E, which holds the word for // itself.
        machine.store.set(addr(0, 0), instr(0, 1, "/P"));
        machine.store.set(addr(0, 1), addr(0, 0).to_word());

        let steps = machine.run().unwrap();

        assert_eq!(steps, 1);
        assert!(machine.is_halted());
        assert_eq!(machine.pc, addr(0, 0));
    }

    #[test]
    fn test_load_add_store() {
        let mut machine = Machine::new();
        machine.store.set_pair(addr(10, 2), 1_000_000, machine.carry).unwrap();
        machine.store.set_pair(addr(12, 2), 234_567, machine.carry).unwrap();

        machine.store.set(addr(0, 0), instr(10, 2, "T/"));
        machine.store.set(addr(1, 0), instr(12, 2, "TI"));
        machine.store.set(addr(2, 0), instr(14, 2, "/S"));
        machine.store.set(addr(3, 0), instr(0, 1, "/P"));
        machine.store.set(addr(0, 1), addr(3, 0).to_word());

        machine.run().unwrap();

        assert!(machine.is_halted());
        assert_eq!(machine.acc, 1_234_567);
        assert_eq!(machine.pair(addr(14, 2)).unwrap(), 1_234_567);
        assert_eq!(
            machine.last_instruction().map(|i| i.code.to_string()),
            Some("/P".to_string())
        );
    }

    #[test]
    fn test_add_wraps_at_pair_modulus() {
        let mut machine = Machine::new();
        machine.store.set_pair(addr(10, 2), PAIR_MODULUS - 1, machine.carry).unwrap();
        machine.store.set_pair(addr(12, 2), 5, machine.carry).unwrap();

        machine.store.set(addr(0, 0), instr(10, 2, "T/"));
        machine.store.set(addr(1, 0), instr(12, 2, "TI"));
        machine.store.set(addr(2, 0), instr(0, 1, "/P"));
        machine.store.set(addr(0, 1), addr(2, 0).to_word());

        machine.run().unwrap();

        assert!(machine.is_halted());
        assert_eq!(machine.acc, 4);
    }

    #[test]
    fn test_subtract_wraps_below_zero() {
        let mut machine = Machine::new();
        machine.store.set_pair(addr(10, 2), 3, machine.carry).unwrap();

        // Accumulator starts at 0; 0 - 3 wraps modulo 2^40
        machine.store.set(addr(0, 0), instr(10, 2, "TN"));
        machine.store.set(addr(1, 0), instr(0, 1, "/P"));
        machine.store.set(addr(0, 1), addr(1, 0).to_word());

        machine.run().unwrap();

        assert!(machine.is_halted());
        assert_eq!(machine.acc, PAIR_MODULUS - 3);
    }

    #[test]
    fn test_clear_and_double() {
        let mut machine = Machine::new();
        machine.store.set_pair(addr(10, 2), 21, machine.carry).unwrap();

        machine.store.set(addr(0, 0), instr(10, 2, "TK"));
        machine.store.set(addr(1, 0), instr(14, 2, "/S"));
        machine.store.set(addr(2, 0), instr(0, 0, "T:"));
        machine.store.set(addr(3, 0), instr(0, 1, "/P"));
        machine.store.set(addr(0, 1), addr(3, 0).to_word());

        machine.run().unwrap();

        assert!(machine.is_halted());
        assert_eq!(machine.pair(addr(14, 2)).unwrap(), 42);
        assert_eq!(machine.acc, 0);
    }

    #[test]
    fn test_counter_store_writes_like_store() {
        let mut machine = Machine::new();
        machine.store.set_pair(addr(10, 2), 99, machine.carry).unwrap();

        machine.store.set(addr(0, 0), instr(10, 2, "T/"));
        machine.store.set(addr(1, 0), instr(14, 2, "/C"));
        machine.store.set(addr(2, 0), instr(0, 1, "/P"));
        machine.store.set(addr(0, 1), addr(2, 0).to_word());

        machine.run().unwrap();

        assert_eq!(machine.pair(addr(14, 2)).unwrap(), 99);
    }

    #[test]
    fn test_loop_falls_through_on_zero() {
        let mut machine = Machine::new();
        // Accumulator is 0: /H must not branch, so execution falls into the
        // self-jump on the next row.
        machine.store.set(addr(0, 0), instr(0, 1, "/H"));
        machine.store.set(addr(1, 0), instr(0, 1, "/P"));
        machine.store.set(addr(0, 1), addr(1, 0).to_word());

        let steps = machine.run().unwrap();

        assert_eq!(steps, 2);
        assert!(machine.is_halted());
    }

    #[test]
    fn test_unknown_function_faults_without_mutation() {
        let mut machine = Machine::new();
        // "XX" is a valid field but no table entry binds it
        machine.store.set(addr(0, 0), instr(5, 5, "XX"));

        let err = machine.step();

        assert!(matches!(err, Err(MachineError::Fault(Fault::UnknownFunction { .. }))));
        match &machine.state {
            MachineState::Faulted(Fault::UnknownFunction { at, code }) => {
                assert_eq!(*at, addr(0, 0));
                assert_eq!(code.to_string(), "XX");
            }
            other => panic!("unexpected state {:?}", other),
        }
        // Nothing else moved
        assert_eq!(machine.acc, 0);
        assert_eq!(machine.pc, addr(0, 0));
        assert_eq!(machine.steps, 0);

        // And the machine refuses further steps
        assert!(matches!(machine.step(), Err(MachineError::NotRunning(_))));
    }

    #[test]
    fn test_advance_off_grid_faults() {
        let mut machine = Machine::new();
        // A no-op on the last row has nowhere to advance to.
        machine.pc = addr(31, 0);
        machine.store.set(addr(31, 0), instr(0, 0, "T£"));

        let err = machine.step();

        assert!(matches!(err, Err(MachineError::Fault(Fault::AddressOutOfRange { .. }))));
        assert_eq!(machine.fault(), Some(&Fault::AddressOutOfRange { at: addr(31, 0) }));
    }

    #[test]
    fn test_pair_read_on_last_row_faults() {
        let mut machine = Machine::new();
        machine.store.set(addr(0, 0), instr(31, 2, "T/"));

        let err = machine.step();

        assert!(matches!(err, Err(MachineError::Fault(Fault::AddressOutOfRange { .. }))));
        assert_eq!(machine.fault(), Some(&Fault::AddressOutOfRange { at: addr(31, 2) }));
    }

    // The reference workload: sum 32 line-pair values into a total cell.
    //
    // The array occupies rows //-E of every column (one pair per column).
    // Code sits in column /, working storage in column E:
    //   @E  total        AE  count        IE  one
    //   8E  column step  RE  loop top     JE  halt target
    // The add instruction rewrites its own operand column each time round,
    // which is safe because the pair store puts the unchanged partner line
    // straight back.
    fn sum_program(values: &[u64; 32]) -> Machine {
        let mut machine = Machine::new();
        let rule = machine.carry;

        for (col, &value) in values.iter().enumerate() {
            machine.store.set_pair(addr(0, col as u8), value, rule).unwrap();
        }

        machine.store.set_pair(addr(2, 1), 0, rule).unwrap(); // total
        machine.store.set_pair(addr(4, 1), 32, rule).unwrap(); // count
        machine.store.set_pair(addr(6, 1), 1, rule).unwrap(); // one
        machine.store.set_pair(addr(8, 1), 32, rule).unwrap(); // one column, in word units
        machine.store.set(addr(10, 1), addr(2, 0).to_word()); // loop top
        machine.store.set(addr(11, 1), addr(12, 0).to_word()); // the final jump, aimed at itself

        machine.store.set(addr(2, 0), instr(2, 1, "T/")); // A := total
        machine.store.set(addr(3, 0), instr(0, 0, "TI")); // A += array[col]
        machine.store.set(addr(4, 0), instr(2, 1, "/S")); // total := A
        machine.store.set(addr(5, 0), instr(3, 0, "T/")); // A := the add instruction's pair
        machine.store.set(addr(6, 0), instr(8, 1, "TI")); // step its operand one column
        machine.store.set(addr(7, 0), instr(3, 0, "/S")); // write it back
        machine.store.set(addr(8, 0), instr(4, 1, "T/")); // A := count
        machine.store.set(addr(9, 0), instr(6, 1, "TN")); // A -= 1
        machine.store.set(addr(10, 0), instr(4, 1, "/C")); // count := A
        machine.store.set(addr(11, 0), instr(10, 1, "/H")); // round again while A != 0
        machine.store.set(addr(12, 0), instr(11, 1, "/P")); // self-jump: halt

        machine.pc = addr(2, 0);
        machine
    }

    fn run_sum(values: &[u64; 32]) -> Machine {
        let mut machine = sum_program(values);
        machine.run_limited(2_000).unwrap();
        assert!(machine.is_halted(), "machine did not halt: {:?}", machine);
        machine
    }

    #[test]
    fn test_sum_program_totals_the_array() {
        let mut values = [0u64; 32];
        for (i, v) in values.iter_mut().enumerate() {
            *v = (i as u64) * 1_000 + 7;
        }
        let expected: u64 = values.iter().sum();

        let machine = run_sum(&values);

        assert_eq!(machine.pair(addr(2, 1)).unwrap(), expected);
        // The loop counter ran down to zero
        assert_eq!(machine.pair(addr(4, 1)).unwrap(), 0);
    }

    #[test]
    fn test_sum_program_all_zero_array() {
        let machine = run_sum(&[0u64; 32]);
        assert_eq!(machine.pair(addr(2, 1)).unwrap(), 0);
    }

    #[test]
    fn test_sum_program_wraps_past_pair_modulus() {
        let mut values = [0u64; 32];
        for (i, v) in values.iter_mut().enumerate() {
            *v = (1u64 << 35) + i as u64;
        }
        // 32 * 2^35 = 2^40, so the total wraps to just the small parts
        let expected: u64 = (0..32).sum();

        let machine = run_sum(&values);

        assert_eq!(machine.pair(addr(2, 1)).unwrap(), expected);
    }

    #[test]
    fn test_sum_program_survives_codefile_roundtrip() {
        use crate::symbol::Field;

        let mut values = [0u64; 32];
        for (i, v) in values.iter_mut().enumerate() {
            *v = (i as u64) * 999 + 1;
        }
        let expected: u64 = values.iter().sum();

        // Dump the built image as program text, reload it, and re-run.
        let image = sum_program(&values);
        let mut text = String::from("# reference summation program\n");
        for (a, word) in image.store.dump() {
            text.push_str(&format!("{} {}\n", a, Field::from_word(word)));
        }

        let program = Program::parse(&text).unwrap();
        let mut machine = Machine::new();
        machine.load_program(&program).unwrap();
        machine.pc = addr(2, 0);
        machine.run_limited(2_000).unwrap();

        assert!(machine.is_halted());
        assert_eq!(machine.pair(addr(2, 1)).unwrap(), expected);
    }

    #[test]
    fn test_sum_program_is_deterministic() {
        let mut values = [0u64; 32];
        for (i, v) in values.iter_mut().enumerate() {
            *v = (i as u64 + 3) * 12_345;
        }

        let a = run_sum(&values);
        let b = run_sum(&values);

        assert_eq!(a.steps, b.steps);
        assert_eq!(a.pair(addr(2, 1)).unwrap(), b.pair(addr(2, 1)).unwrap());
    }
}
