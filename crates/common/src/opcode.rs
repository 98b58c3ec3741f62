//! The fixed opcode catalog shared by the assembler and the VM.
//!
//! Opcode numbers are dense (`0..Opcode::COUNT`) so the VM can index its
//! dispatch table directly with `opcode as usize`.

use std::fmt;
use std::str::FromStr;

use crate::error::CatalogError;

/// Identifies the operation to perform.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Output
    /// Pop a value and append its decimal form to the output.
    Print = 0,

    // Stack
    /// Discard the top of the stack.
    Pop = 1,
    /// Push a literal operand.
    Push = 2,

    // Arithmetic: pop `a`, pop `b`, push `b OP a`
    /// `b + a`, wrapping.
    Add = 3,
    /// `b - a`, wrapping.
    Sub = 4,
    /// `b * a`, wrapping.
    Mul = 5,
    /// `b / a`, rounded toward negative infinity.
    Div = 6,
    /// `b % a`, sign follows the dividend.
    Mod = 7,

    // Comparison: push 1 if `b CMP a`, else 0
    /// `b == a`
    Eq = 8,
    /// `b != a`
    Ne = 9,
    /// `b > a`
    Gt = 10,
    /// `b >= a`
    Ge = 11,
    /// `b < a`
    Lt = 12,
    /// `b <= a`
    Le = 13,

    // Unary
    /// Pop, push value + 1.
    Increment = 14,
    /// Pop, push value - 1.
    Decrement = 15,

    // Control flow
    /// Unconditional jump to an address.
    Jump = 16,
    /// Pop; jump if nonzero.
    JumpIf = 17,

    // Variables
    /// Allocate a global scalar or array cell.
    DeclareGlobal = 18,
    /// Pop a value into a global cell.
    SetGlobal = 19,
    /// Push the value of a global cell.
    GetGlobal = 20,
    /// Allocate a cell in the current frame.
    DeclareLocal = 21,
    /// Pop a value into a local cell.
    SetLocal = 22,
    /// Push the value of a local cell.
    GetLocal = 23,

    // Functions
    /// Push a call frame and jump to a function entry.
    Call = 24,
    /// Pop the current call frame; halts when it is the entry frame.
    Return = 25,

    // Extras
    /// Pop; jump if zero.
    JumpIfZero = 26,
    /// Log the operand stack. No stack effect.
    DebugShowStack = 27,
}

/// All opcodes in numeric order. `ALL_OPCODES[i] as usize == i`.
pub const ALL_OPCODES: [Opcode; Opcode::COUNT] = [
    Opcode::Print,
    Opcode::Pop,
    Opcode::Push,
    Opcode::Add,
    Opcode::Sub,
    Opcode::Mul,
    Opcode::Div,
    Opcode::Mod,
    Opcode::Eq,
    Opcode::Ne,
    Opcode::Gt,
    Opcode::Ge,
    Opcode::Lt,
    Opcode::Le,
    Opcode::Increment,
    Opcode::Decrement,
    Opcode::Jump,
    Opcode::JumpIf,
    Opcode::DeclareGlobal,
    Opcode::SetGlobal,
    Opcode::GetGlobal,
    Opcode::DeclareLocal,
    Opcode::SetLocal,
    Opcode::GetLocal,
    Opcode::Call,
    Opcode::Return,
    Opcode::JumpIfZero,
    Opcode::DebugShowStack,
];

impl Opcode {
    /// Number of opcodes in the catalog.
    pub const COUNT: usize = 28;

    /// Returns the canonical assembly mnemonic.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::Print => "print",
            Opcode::Pop => "pop",
            Opcode::Push => "push",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::Mod => "mod",
            Opcode::Eq => "eq",
            Opcode::Ne => "ne",
            Opcode::Gt => "gt",
            Opcode::Ge => "ge",
            Opcode::Lt => "lt",
            Opcode::Le => "le",
            Opcode::Increment => "increment",
            Opcode::Decrement => "decrement",
            Opcode::Jump => "jump",
            Opcode::JumpIf => "jumpIf",
            Opcode::DeclareGlobal => "declareGlobal",
            Opcode::SetGlobal => "setGlobal",
            Opcode::GetGlobal => "getGlobal",
            Opcode::DeclareLocal => "declareLocal",
            Opcode::SetLocal => "setLocal",
            Opcode::GetLocal => "getLocal",
            Opcode::Call => "call",
            Opcode::Return => "return",
            Opcode::JumpIfZero => "jumpIfZero",
            Opcode::DebugShowStack => "debugShowStack",
        }
    }

    /// Look up an opcode by mnemonic, accepting the legacy snake_case
    /// spellings and the short `inc`/`dec` forms.
    pub fn from_mnemonic(mnemonic: &str) -> Option<Opcode> {
        let alias = match mnemonic {
            "inc" => Some(Opcode::Increment),
            "dec" => Some(Opcode::Decrement),
            "jump_if" => Some(Opcode::JumpIf),
            "jump_if_zero" => Some(Opcode::JumpIfZero),
            "declare_global" => Some(Opcode::DeclareGlobal),
            "set_global" => Some(Opcode::SetGlobal),
            "get_global" => Some(Opcode::GetGlobal),
            "declare_local" => Some(Opcode::DeclareLocal),
            "set_local" => Some(Opcode::SetLocal),
            "get_local" => Some(Opcode::GetLocal),
            "debug_show_stack" => Some(Opcode::DebugShowStack),
            _ => None,
        };
        alias.or_else(|| {
            ALL_OPCODES
                .iter()
                .find(|op| op.mnemonic() == mnemonic)
                .copied()
        })
    }

    /// True for opcodes whose single operand is a jump or call target.
    pub fn takes_address(&self) -> bool {
        matches!(
            self,
            Opcode::Jump | Opcode::JumpIf | Opcode::JumpIfZero | Opcode::Call
        )
    }

    /// True for the variable-access opcodes (`set*`/`get*`).
    pub fn is_variable_access(&self) -> bool {
        matches!(
            self,
            Opcode::SetGlobal | Opcode::GetGlobal | Opcode::SetLocal | Opcode::GetLocal
        )
    }

    /// True when the opcode addresses the per-frame local table.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Opcode::DeclareLocal | Opcode::SetLocal | Opcode::GetLocal
        )
    }
}

impl FromStr for Opcode {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Opcode::from_mnemonic(s).ok_or_else(|| CatalogError::UnknownMnemonic(s.to_string()))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
