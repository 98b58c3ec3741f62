//! CVM CLI: assemble, disassemble and run CVM assembly programs.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Input/assembly error
//! - 2: Usage error (reported by clap)
//! - 3: Runtime error

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use cvm_cli::{commands, logging};
use cvm_vm::config::{DEFAULT_MAX_CALL_DEPTH, DEFAULT_MAX_MEMORY_CELLS, DEFAULT_MAX_STACK_DEPTH};
use cvm_vm::Config;

/// CVM - a stack virtual machine for a small assembly language
#[derive(Parser, Debug)]
#[command(name = "cvm", version)]
#[command(about = "Assemble and run CVM assembly programs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assemble and execute a program, printing each output line
    Run {
        /// Assembly source file
        input: PathBuf,

        #[command(flatten)]
        vm: VmArgs,
    },
    /// Print the resolved instruction listing
    Assemble {
        /// Assembly source file
        input: PathBuf,
    },
    /// Print canonical assembly text for a program
    Disassemble {
        /// Assembly source file
        input: PathBuf,
    },
}

#[derive(Args, Debug)]
struct VmArgs {
    /// Log every executed instruction (RUST_LOG overrides the level)
    #[arg(long)]
    debug: bool,

    /// Log the step count and elapsed time when the run ends
    #[arg(long)]
    trace_timing: bool,

    /// Maximum number of live call frames, including MAIN
    #[arg(long, default_value_t = DEFAULT_MAX_CALL_DEPTH)]
    max_call_depth: usize,

    /// Maximum operand stack depth
    #[arg(long, default_value_t = DEFAULT_MAX_STACK_DEPTH)]
    max_stack_depth: usize,

    /// Maximum memory elements (a scalar counts one, an array its length)
    #[arg(long, default_value_t = DEFAULT_MAX_MEMORY_CELLS)]
    max_memory_cells: usize,
}

impl From<&VmArgs> for Config {
    fn from(args: &VmArgs) -> Self {
        Config {
            debug: args.debug,
            trace_timing: args.trace_timing,
            max_call_depth: args.max_call_depth,
            max_stack_depth: args.max_stack_depth,
            max_memory_cells: args.max_memory_cells,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let level = match &cli.command {
        Command::Run { vm, .. } => logging::default_level(vm.debug, vm.trace_timing),
        _ => logging::default_level(false, false),
    };
    logging::init(level);

    let result = match &cli.command {
        Command::Run { input, vm } => commands::run(input, &Config::from(vm)),
        Command::Assemble { input } => commands::assemble(input),
        Command::Disassemble { input } => commands::disassemble(input),
    };

    if let Err(code) = result {
        process::exit(code);
    }
}
