//! Program representation: a resolved instruction sequence plus its entry.

use std::fmt;

use crate::instruction::Instruction;

/// An assembled program.
///
/// Instructions are 0-indexed; every address operand is an index into
/// `instructions`. `entry` is the index bound to the `MAIN` label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    /// The instruction stream.
    pub instructions: Vec<Instruction>,
    /// Index of the first instruction of `MAIN`.
    pub entry: usize,
}

impl Program {
    /// Create a program from instructions and an entry address.
    pub fn new(instructions: Vec<Instruction>, entry: usize) -> Self {
        Self {
            instructions,
            entry,
        }
    }

    /// The resolved `MAIN` entry address.
    pub fn entry(&self) -> usize {
        self.entry
    }

    /// Number of instructions in the program.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns true if the program has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// Numbered listing, one instruction per line, entry marked with `>`.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (pc, instr) in self.instructions.iter().enumerate() {
            let marker = if pc == self.entry { '>' } else { ' ' };
            writeln!(f, "{marker}{pc:04}  {instr}")?;
        }
        Ok(())
    }
}
