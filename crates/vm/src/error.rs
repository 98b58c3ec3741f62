//! Runtime errors for the CVM.
//!
//! Every error aborts the run. Variants that arise while executing an
//! instruction carry its index (`at`).

use thiserror::Error;

/// Errors that occur during program execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Pop on an empty operand stack.
    #[error("stack underflow at instruction {at}")]
    StackUnderflow { at: usize },

    /// Push beyond the configured operand-stack capacity.
    #[error("stack overflow (limit {limit}) at instruction {at}")]
    StackOverflow { at: usize, limit: usize },

    /// `call` beyond the configured frame-stack capacity.
    #[error("call depth exceeded limit {limit} at instruction {at}")]
    CallDepthExceeded { at: usize, limit: usize },

    /// A declaration that would push memory past the configured capacity.
    #[error("memory exhausted: {requested} more elements exceed limit {limit} at instruction {at}")]
    MemoryExhausted {
        at: usize,
        requested: usize,
        limit: usize,
    },

    /// `div` or `mod` with a zero divisor.
    #[error("division by zero at instruction {at}")]
    DivisionByZero { at: usize },

    /// Read of a declared cell that was never written.
    #[error("read of uninitialized variable at instruction {at}")]
    NotInitialized { at: usize },

    /// Array access outside `0..length`.
    #[error("array index {index} out of bounds (length {length}) at instruction {at}")]
    IndexOutOfBounds { at: usize, index: i64, length: usize },

    /// Indexed access to a scalar.
    #[error("indexed access to a scalar at instruction {at}")]
    NotAnArray { at: usize },

    /// Scalar access to an array.
    #[error("scalar access to an array at instruction {at}")]
    NotAScalar { at: usize },

    /// Access to a variable whose declaration has not executed in scope.
    #[error("variable ${id} is not bound at instruction {at}")]
    UnboundVariable { at: usize, id: u32 },

    /// A string value used where an integer is required.
    #[error("expected an integer at instruction {at}")]
    TypeMismatch { at: usize },

    /// `call` targeting the program entry point.
    #[error("call to the entry point at instruction {at}")]
    InvalidCall { at: usize },

    /// `return` with no frame to pop.
    #[error("return without a frame at instruction {at}")]
    InvalidReturn { at: usize },

    /// The entry address is outside the program.
    #[error("entry address {entry} outside program of {len} instructions")]
    InvalidEntry { entry: usize, len: usize },

    /// Operands don't match the opcode's layout, or a target is out of range.
    #[error("malformed instruction at {at}")]
    MalformedInstruction { at: usize },
}
