//! Resolved instructions.
//!
//! An instruction is an opcode plus its resolved operands. The operand
//! layout per opcode is:
//!
//! ```text
//! push                      [Int | Str]
//! jump/jumpIf/jumpIfZero    [Address]
//! call                      [Address]
//! declareGlobal/Local       [Symbol, Type]            scalar
//!                           [Symbol, Type, Length]    array
//! set*/get*                 [Symbol]                  scalar
//!                           [Symbol, Int]             literal index
//!                           [Symbol, StackIndex]      index from stack
//! everything else           []
//! ```
//!
//! Instructions are immutable once produced.

use std::fmt;

use crate::ctype::CType;
use crate::opcode::Opcode;
use crate::operand::{Declaration, IndexMode, Operand, SymbolId, VarRef};

/// A single resolved instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// The operation to perform.
    pub opcode: Opcode,
    /// Resolved operands. Meaning depends on opcode.
    pub operands: Vec<Operand>,
}

impl Instruction {
    /// Create an instruction with explicit operands.
    pub fn new(opcode: Opcode, operands: Vec<Operand>) -> Self {
        Self { opcode, operands }
    }

    /// Create an instruction that takes no operands.
    pub fn bare(opcode: Opcode) -> Self {
        Self::new(opcode, Vec::new())
    }

    /// `push <n>`
    pub fn push_int(value: i64) -> Self {
        Self::new(Opcode::Push, vec![Operand::Int(value)])
    }

    /// `push "<s>"`
    pub fn push_str(value: impl Into<String>) -> Self {
        Self::new(Opcode::Push, vec![Operand::Str(value.into())])
    }

    /// A jump or call to a resolved address.
    pub fn branch(opcode: Opcode, target: u32) -> Self {
        Self::new(opcode, vec![Operand::Address(target)])
    }

    /// A scalar or array declaration.
    pub fn declare(opcode: Opcode, id: SymbolId, ctype: CType, length: Option<u32>) -> Self {
        let mut operands = vec![Operand::Symbol(id), Operand::Type(ctype)];
        if let Some(len) = length {
            operands.push(Operand::Length(len));
        }
        Self::new(opcode, operands)
    }

    /// A variable access (`set*`/`get*`).
    pub fn access(opcode: Opcode, id: SymbolId, index: IndexMode) -> Self {
        let mut operands = vec![Operand::Symbol(id)];
        match index {
            IndexMode::Scalar => {}
            IndexMode::Literal(i) => operands.push(Operand::Int(i)),
            IndexMode::Stack => operands.push(Operand::StackIndex),
        }
        Self::new(opcode, operands)
    }

    /// The jump/call target, if this instruction carries exactly one address.
    pub fn address(&self) -> Option<usize> {
        match self.operands.as_slice() {
            [Operand::Address(addr)] => Some(*addr as usize),
            _ => None,
        }
    }

    /// The literal carried by `push`.
    pub fn literal(&self) -> Option<&Operand> {
        match self.operands.as_slice() {
            [op @ (Operand::Int(_) | Operand::Str(_))] => Some(op),
            _ => None,
        }
    }

    /// Decode a `set*`/`get*` operand layout.
    pub fn var_ref(&self) -> Option<VarRef> {
        match self.operands.as_slice() {
            [Operand::Symbol(id)] => Some(VarRef {
                id: *id,
                index: IndexMode::Scalar,
            }),
            [Operand::Symbol(id), Operand::Int(i)] => Some(VarRef {
                id: *id,
                index: IndexMode::Literal(*i),
            }),
            [Operand::Symbol(id), Operand::StackIndex] => Some(VarRef {
                id: *id,
                index: IndexMode::Stack,
            }),
            _ => None,
        }
    }

    /// Decode a `declare*` operand layout.
    pub fn declaration(&self) -> Option<Declaration> {
        match self.operands.as_slice() {
            [Operand::Symbol(id), Operand::Type(ctype)] => Some(Declaration {
                id: *id,
                ctype: *ctype,
                length: None,
            }),
            [Operand::Symbol(id), Operand::Type(ctype), Operand::Length(len)] => {
                Some(Declaration {
                    id: *id,
                    ctype: *ctype,
                    length: Some(*len),
                })
            }
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.opcode.mnemonic())?;
        for op in &self.operands {
            write!(f, " {op}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_decoding() {
        assert_eq!(Instruction::branch(Opcode::Jump, 7).address(), Some(7));
        assert_eq!(Instruction::bare(Opcode::Jump).address(), None);
        assert_eq!(Instruction::push_int(7).address(), None);
    }

    #[test]
    fn literal_decoding() {
        assert_eq!(
            Instruction::push_int(-4).literal(),
            Some(&Operand::Int(-4))
        );
        assert_eq!(
            Instruction::push_str("hi").literal(),
            Some(&Operand::Str("hi".to_string()))
        );
        assert_eq!(Instruction::bare(Opcode::Push).literal(), None);
    }

    #[test]
    fn var_ref_decoding() {
        let scalar = Instruction::access(Opcode::GetLocal, 3, IndexMode::Scalar);
        assert_eq!(
            scalar.var_ref(),
            Some(VarRef {
                id: 3,
                index: IndexMode::Scalar
            })
        );

        let literal = Instruction::access(Opcode::SetGlobal, 0, IndexMode::Literal(5));
        assert_eq!(literal.var_ref().map(|r| r.index), Some(IndexMode::Literal(5)));

        let stack = Instruction::access(Opcode::SetGlobal, 0, IndexMode::Stack);
        assert_eq!(stack.var_ref().map(|r| r.index), Some(IndexMode::Stack));
    }

    #[test]
    fn var_ref_rejects_bad_layout() {
        let instr = Instruction::new(Opcode::GetLocal, vec![Operand::Int(1)]);
        assert_eq!(instr.var_ref(), None);
    }

    #[test]
    fn declaration_decoding() {
        let scalar = Instruction::declare(Opcode::DeclareLocal, 1, CType::Int, None);
        assert_eq!(
            scalar.declaration(),
            Some(Declaration {
                id: 1,
                ctype: CType::Int,
                length: None
            })
        );

        let array = Instruction::declare(Opcode::DeclareGlobal, 0, CType::Char, Some(10));
        assert_eq!(array.declaration().and_then(|d| d.length), Some(10));
    }

    #[test]
    fn display_listing_form() {
        assert_eq!(Instruction::push_int(7).to_string(), "push 7");
        assert_eq!(Instruction::branch(Opcode::Call, 12).to_string(), "call @12");
        assert_eq!(
            Instruction::declare(Opcode::DeclareGlobal, 0, CType::Int, Some(3)).to_string(),
            "declareGlobal $0 int [3]"
        );
        assert_eq!(
            Instruction::access(Opcode::SetGlobal, 0, IndexMode::Stack).to_string(),
            "setGlobal $0 []"
        );
    }
}
