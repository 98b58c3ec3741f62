//! CVM common types.
//!
//! This crate provides the data model shared by the assembler and the VM:
//!
//! - [`Opcode`]: the fixed opcode catalog
//! - [`Operand`]: resolved operands (literals, symbol ids, addresses)
//! - [`Instruction`]: an opcode with its resolved operands
//! - [`Program`]: an instruction sequence plus its `MAIN` entry address
//! - [`CType`]: declared variable types (bookkeeping only)
//! - [`Value`]: runtime values on the operand stack
//!
//! # Dependencies
//!
//! This crate uses `thiserror` for its catalog lookup error and has no
//! other dependencies.

pub mod ctype;
pub mod error;
pub mod instruction;
pub mod opcode;
pub mod operand;
pub mod program;
pub mod value;

// Re-export commonly used types at the crate root.
pub use ctype::CType;
pub use error::CatalogError;
pub use instruction::Instruction;
pub use opcode::Opcode;
pub use operand::{Declaration, IndexMode, Operand, SymbolId, VarRef};
pub use program::Program;
pub use value::Value;
