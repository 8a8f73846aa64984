//! Reduced Machine Emulator - CLI Entry Point
//!
//! Commands:
//! - `reduced-machine run <program>` - Load a codefile and run to halt
//! - `reduced-machine check <program>` - Parse a codefile and list records
//! - `reduced-machine dump <program>` - Show the loaded memory image

use clap::{Parser, Subcommand};

use reduced::{Address, Field, Machine, MachineState, Program};

#[derive(Parser)]
#[command(name = "reduced-machine")]
#[command(author = "Yigit")]
#[command(version = "0.1.0")]
#[command(about = "An emulator of Turing's Reduced Machine, a minimised Manchester Mark I")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts or faults
    Run {
        /// Path to the codefile to execute
        program: String,
        /// Maximum number of steps to run (default: 10000)
        #[arg(short, long, default_value = "10000")]
        max_steps: u64,
        /// Print each executed instruction
        #[arg(short, long)]
        trace: bool,
        /// Entry address, two symbols (default: the grid origin `//`)
        #[arg(short, long)]
        entry: Option<String>,
        /// After the run, print the line pair at this address
        #[arg(long)]
        total: Option<String>,
        /// After the run, dump every non-zero line
        #[arg(long)]
        dump: bool,
        /// Write the final machine state as JSON
        #[arg(long)]
        snapshot: Option<String>,
    },
    /// Parse a codefile and report its records without running
    Check {
        /// Path to the codefile
        program: String,
    },
    /// Show the memory image a codefile loads to
    Dump {
        /// Path to the codefile
        program: String,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            program,
            max_steps,
            trace,
            entry,
            total,
            dump,
            snapshot,
        } => {
            run_program(&program, max_steps, trace, entry, total, dump, snapshot);
        }
        Commands::Check { program } => {
            check_program(&program);
        }
        Commands::Dump { program } => {
            dump_program(&program);
        }
    }
}

fn load_machine(path: &str) -> Machine {
    let program = match Program::load_file(path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to read program: {}", e);
            std::process::exit(1);
        }
    };

    if program.is_empty() {
        eprintln!("No records to load");
        std::process::exit(1);
    }

    let mut machine = Machine::new();
    if let Err(e) = machine.load_program(&program) {
        eprintln!("Failed to load program: {}", e);
        std::process::exit(1);
    }

    println!("Loaded {} records from {}", program.len(), path);
    machine
}

fn parse_address(text: &str, what: &str) -> Address {
    match Address::parse(text) {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("Bad {} address {:?}: {}", what, text, e);
            std::process::exit(1);
        }
    }
}

fn run_program(
    path: &str,
    max_steps: u64,
    trace: bool,
    entry: Option<String>,
    total: Option<String>,
    dump: bool,
    snapshot: Option<String>,
) {
    let mut machine = load_machine(path);

    if let Some(text) = entry {
        machine.pc = parse_address(&text, "entry");
    }

    if trace {
        println!();
        println!("Step   Addr  Instr  Accumulator");
    }

    while machine.is_running() && machine.steps < max_steps {
        let pc = machine.pc;
        match machine.step() {
            Ok(instr) => {
                if trace {
                    println!(
                        "{:<6} {}    {}   {:>14}",
                        machine.steps,
                        pc,
                        instr.field(),
                        machine.acc
                    );
                }
            }
            Err(e) => {
                eprintln!("Fault at {}: {}", pc, e);
                break;
            }
        }
    }

    println!();
    match &machine.state {
        MachineState::Halted => println!("Halting loop detected after {} steps.", machine.steps),
        MachineState::Faulted(fault) => println!("Faulted after {} steps: {}", machine.steps, fault),
        MachineState::Running => {
            println!(
                "Reached the step budget ({}). Use --max-steps to raise it.",
                max_steps
            );
        }
    }
    println!("Accumulator: {}", machine.acc);

    if let Some(text) = total {
        let addr = parse_address(&text, "total");
        match machine.pair(addr) {
            Ok(value) => println!("Pair at {}: {}", addr, value),
            Err(e) => eprintln!("Cannot read pair at {}: {}", addr, e),
        }
    }

    if dump {
        println!();
        println!("Addr  Line");
        for (addr, word) in machine.store.dump() {
            println!("{}    {}", addr, Field::from_word(word));
        }
    }

    if let Some(out_path) = snapshot {
        match serde_json::to_string_pretty(&machine) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&out_path, json) {
                    eprintln!("Failed to write snapshot: {}", e);
                    std::process::exit(1);
                }
                println!("Snapshot written to {}", out_path);
            }
            Err(e) => {
                eprintln!("Failed to serialize machine: {}", e);
                std::process::exit(1);
            }
        }
    }

    if machine.fault().is_some() {
        std::process::exit(1);
    }
}

fn check_program(path: &str) {
    let program = match Program::load_file(path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    println!("{} records", program.len());
    for record in &program.records {
        println!("{}  {}  (line {})", record.addr, record.field, record.line);
    }
}

fn dump_program(path: &str) {
    let machine = load_machine(path);

    println!();
    println!("Addr  Line   Word");
    for (addr, word) in machine.store.dump() {
        println!("{}    {}   {:>7}", addr, Field::from_word(word), word);
    }
}
