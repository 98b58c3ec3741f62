//! Resolved instruction operands.
//!
//! Every symbolic operand in assembly text is resolved to one of these
//! variants before execution, so the VM never looks anything up by name.

use std::fmt;

use crate::ctype::CType;

/// Dense id of a global or local variable, assigned in declaration order.
pub type SymbolId = u32;

/// A resolved argument attached to an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Integer literal (`push 7`, or a literal array index).
    Int(i64),
    /// String literal (`push "hello"`).
    Str(String),
    /// Resolved global or local variable id.
    Symbol(SymbolId),
    /// Resolved jump or call target (instruction index).
    Address(u32),
    /// Declared type of a variable.
    Type(CType),
    /// Declared array length.
    Length(u32),
    /// Array index taken from the operand stack at run time.
    StackIndex,
}

/// How a variable access selects its cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    /// The variable is a scalar.
    Scalar,
    /// Array element at a literal index.
    Literal(i64),
    /// Array element whose index is popped from the stack.
    Stack,
}

/// Decoded operands of a `set*`/`get*` instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarRef {
    pub id: SymbolId,
    pub index: IndexMode,
}

/// Decoded operands of a `declare*` instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Declaration {
    pub id: SymbolId,
    pub ctype: CType,
    /// `Some(len)` for arrays.
    pub length: Option<u32>,
}

/// Escape a string literal the way the assembler reads it back.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Int(n) => write!(f, "{n}"),
            Operand::Str(s) => f.write_str(&quote(s)),
            Operand::Symbol(id) => write!(f, "${id}"),
            Operand::Address(addr) => write!(f, "@{addr}"),
            Operand::Type(t) => write!(f, "{t}"),
            Operand::Length(n) => write!(f, "[{n}]"),
            Operand::StackIndex => f.write_str("[]"),
        }
    }
}
