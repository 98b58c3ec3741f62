//! Error types for the CVM assembler.

use thiserror::Error;

/// Errors produced while assembling text into a program.
///
/// Every variant except [`AsmError::MissingEntryPoint`] and
/// [`AsmError::ProgramTooLarge`] carries the 1-based source line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AsmError {
    /// The mnemonic is not in the opcode catalog.
    #[error("line {line}: invalid instruction '{token}'")]
    InvalidInstruction { line: usize, token: String },

    /// An instruction did not have enough operands.
    #[error("line {line}: {mnemonic} expects {expected} operand(s)")]
    MissingArgument {
        line: usize,
        mnemonic: &'static str,
        expected: usize,
    },

    /// A token appeared where it was not expected.
    #[error("line {line}: unexpected token '{token}'")]
    UnexpectedToken { line: usize, token: String },

    /// A numeric literal could not be parsed or is out of range.
    #[error("line {line}: invalid number '{token}'")]
    InvalidNumber { line: usize, token: String },

    /// A string literal has no closing quote or uses an unknown escape.
    #[error("line {line}: malformed string literal")]
    MalformedString { line: usize },

    /// A label name is not a valid identifier.
    #[error("line {line}: invalid label '{token}'")]
    InvalidLabel { line: usize, token: String },

    /// A variable operand is not `name`, `name[N]` or `name[]`.
    #[error("line {line}: invalid variable '{token}'")]
    InvalidVariable { line: usize, token: String },

    /// A declaration names a type outside the catalog.
    #[error("line {line}: unknown type '{token}'")]
    UnknownType { line: usize, token: String },

    /// A label was defined twice.
    #[error("line {line}: duplicate label '{name}'")]
    DuplicateLabel { line: usize, name: String },

    /// A global variable was declared twice.
    #[error("line {line}: duplicate global '{name}'")]
    DuplicateGlobal { line: usize, name: String },

    /// A jump or call names a label that is never defined.
    #[error("line {line}: undefined label '{name}'")]
    UndefinedLabel { line: usize, name: String },

    /// A variable is used before (or without) a declaration in scope.
    #[error("line {line}: undefined variable '{name}'")]
    UndefinedVariable { line: usize, name: String },

    /// `call` targets the program entry point.
    #[error("line {line}: MAIN is not callable")]
    CallToEntryPoint { line: usize },

    /// `call` targets a label with no instruction after it.
    #[error("line {line}: call target '{name}' is past the last instruction")]
    CallPastEnd { line: usize, name: String },

    /// An instruction before the first label; nothing can reach it.
    #[error("line {line}: instruction before the first label never executes")]
    UnreachableInstruction { line: usize },

    /// No `MAIN` label was defined.
    #[error("program has no MAIN label")]
    MissingEntryPoint,

    /// More instructions than an address operand can express.
    #[error("program has {len} instructions, more than an address can hold")]
    ProgramTooLarge { len: usize },
}
