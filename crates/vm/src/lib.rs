//! CVM virtual machine: executes resolved instruction sequences.
//!
//! The VM is a stack machine with:
//! - An operand stack of [`Value`](cvm_common::Value)s
//! - A flat, append-only memory arena of scalar and array cells
//! - A global address map and one local address map per call frame
//! - An explicit frame stack; the bottom frame is `MAIN`
//!
//! Dispatch goes through a table of handlers indexed by opcode number.
//!
//! # Usage
//!
//! ```
//! use cvm_common::{Instruction, Opcode, Program};
//! use cvm_vm::{run, Config};
//!
//! let program = Program::new(
//!     vec![
//!         Instruction::push_int(-7),
//!         Instruction::push_int(2),
//!         Instruction::bare(Opcode::Div),
//!         Instruction::bare(Opcode::Print),
//!         Instruction::bare(Opcode::Return),
//!     ],
//!     0,
//! );
//!
//! let output = run(&program, &Config::default()).unwrap();
//! assert_eq!(output, vec!["-4"]);
//! ```

pub mod config;
pub mod error;
pub mod execute;
pub mod machine;
pub mod memory;

pub use config::Config;
pub use error::RuntimeError;
pub use execute::Flow;
pub use machine::{Frame, VM};

use cvm_common::Program;

/// Execute a program on a fresh VM and return its printed lines.
///
/// # Errors
///
/// Returns [`RuntimeError`] if execution fails (stack underflow, division
/// by zero, uninitialized read, etc.).
pub fn run(program: &Program, config: &Config) -> Result<Vec<String>, RuntimeError> {
    let mut vm = VM::new(config.clone());
    vm.execute(&program.instructions, program.entry())
}
