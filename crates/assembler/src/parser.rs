//! Second pass: mnemonic + operand tokens → resolved instructions.
//!
//! Dispatches on the opcode to the operand pattern it takes and resolves
//! every symbolic operand against the label and variable tables.

use cvm_common::{CType, IndexMode, Instruction, Opcode, Operand};

use crate::error::AsmError;
use crate::lexer::{is_variable_name, parse_int, Token};
use crate::symbols::{LabelTable, SymbolTable};

/// Name of the entry-point label.
pub(crate) const ENTRY_LABEL: &str = "MAIN";

/// Resolution state for the second pass.
pub(crate) struct Resolver {
    labels: LabelTable,
    entry: Option<u32>,
    end: u32,
    globals: SymbolTable,
    locals: SymbolTable,
}

impl Resolver {
    /// `end` is the instruction count; a label there marks the end of the
    /// program.
    pub(crate) fn new(labels: LabelTable, end: u32) -> Self {
        let entry = labels.get(ENTRY_LABEL);
        Self {
            labels,
            entry,
            end,
            globals: SymbolTable::new(),
            locals: SymbolTable::new(),
        }
    }

    /// Start a new function body: locals declared from here on get a fresh
    /// id space.
    pub(crate) fn enter_function(&mut self) {
        self.locals = SymbolTable::new();
    }

    pub(crate) fn entry(&self) -> Option<u32> {
        self.entry
    }

    pub(crate) fn global_count(&self) -> usize {
        self.globals.len()
    }

    /// Resolve one instruction line.
    pub(crate) fn resolve(
        &mut self,
        mnemonic: &str,
        args: &[Token],
        line: usize,
    ) -> Result<Instruction, AsmError> {
        let opcode =
            Opcode::from_mnemonic(mnemonic).ok_or_else(|| AsmError::InvalidInstruction {
                line,
                token: mnemonic.to_string(),
            })?;

        match opcode {
            // No operands
            Opcode::Print
            | Opcode::Pop
            | Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod
            | Opcode::Eq
            | Opcode::Ne
            | Opcode::Gt
            | Opcode::Ge
            | Opcode::Lt
            | Opcode::Le
            | Opcode::Increment
            | Opcode::Decrement
            | Opcode::Return
            | Opcode::DebugShowStack => {
                expect_end(args, line)?;
                Ok(Instruction::bare(opcode))
            }

            // Literal
            Opcode::Push => {
                let literal = match expect_token(args, 0, line, opcode, 1)? {
                    Token::Number(n) => Operand::Int(*n),
                    Token::Str(s) => Operand::Str(s.clone()),
                    Token::Word(w) => {
                        return Err(AsmError::InvalidNumber {
                            line,
                            token: w.clone(),
                        })
                    }
                };
                expect_end(&args[1..], line)?;
                Ok(Instruction::new(opcode, vec![literal]))
            }

            // Label target
            Opcode::Jump | Opcode::JumpIf | Opcode::JumpIfZero | Opcode::Call => {
                let name = expect_word(args, 0, line, opcode, 1)?;
                expect_end(&args[1..], line)?;
                let target = self.resolve_label(name, line)?;
                if opcode == Opcode::Call && (name == ENTRY_LABEL || Some(target) == self.entry) {
                    return Err(AsmError::CallToEntryPoint { line });
                }
                if opcode == Opcode::Call && target == self.end {
                    return Err(AsmError::CallPastEnd {
                        line,
                        name: name.to_string(),
                    });
                }
                Ok(Instruction::branch(opcode, target))
            }

            // Declaration: name or name[len], then type
            Opcode::DeclareGlobal | Opcode::DeclareLocal => {
                let token = expect_word(args, 0, line, opcode, 2)?;
                let type_name = expect_word(args, 1, line, opcode, 2)?;
                expect_end(&args[2..], line)?;

                let (name, length) = parse_declarator(token, line)?;
                let ctype: CType = type_name.parse().map_err(|_| AsmError::UnknownType {
                    line,
                    token: type_name.to_string(),
                })?;

                let id = if opcode == Opcode::DeclareGlobal {
                    self.globals
                        .declare_unique(name)
                        .ok_or_else(|| AsmError::DuplicateGlobal {
                            line,
                            name: name.to_string(),
                        })?
                } else {
                    self.locals.declare(name)
                };
                Ok(Instruction::declare(opcode, id, ctype, length))
            }

            // Variable access: name, name[N] or name[]
            Opcode::SetGlobal | Opcode::GetGlobal | Opcode::SetLocal | Opcode::GetLocal => {
                let token = expect_word(args, 0, line, opcode, 1)?;
                expect_end(&args[1..], line)?;

                let (name, index) = parse_access(token, line)?;
                let table = if opcode.is_local() {
                    &self.locals
                } else {
                    &self.globals
                };
                let id = table
                    .lookup(name)
                    .ok_or_else(|| AsmError::UndefinedVariable {
                        line,
                        name: name.to_string(),
                    })?;
                Ok(Instruction::access(opcode, id, index))
            }
        }
    }

    fn resolve_label(&self, name: &str, line: usize) -> Result<u32, AsmError> {
        self.labels
            .get(name)
            .ok_or_else(|| AsmError::UndefinedLabel {
                line,
                name: name.to_string(),
            })
    }
}

/// Split `name[inner]` into `(name, Some(inner))`, or `name` into `(name, None)`.
fn split_subscript(token: &str) -> Option<(&str, Option<&str>)> {
    match token.find('[') {
        None => Some((token, None)),
        Some(open) => {
            let inner = token[open + 1..].strip_suffix(']')?;
            Some((&token[..open], Some(inner)))
        }
    }
}

fn checked_name<'t>(name: &'t str, token: &str, line: usize) -> Result<&'t str, AsmError> {
    if is_variable_name(name) {
        Ok(name)
    } else {
        Err(AsmError::InvalidVariable {
            line,
            token: token.to_string(),
        })
    }
}

/// `name` → scalar, `name[len]` → array of `len` cells.
fn parse_declarator(token: &str, line: usize) -> Result<(&str, Option<u32>), AsmError> {
    let invalid = || AsmError::InvalidVariable {
        line,
        token: token.to_string(),
    };
    let (name, inner) = split_subscript(token).ok_or_else(invalid)?;
    let name = checked_name(name, token, line)?;

    let length = match inner {
        None => None,
        Some("") => return Err(invalid()),
        Some(digits) => {
            if !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(AsmError::InvalidNumber {
                    line,
                    token: digits.to_string(),
                });
            }
            let len = digits.parse::<u32>().map_err(|_| AsmError::InvalidNumber {
                line,
                token: digits.to_string(),
            })?;
            Some(len)
        }
    };
    Ok((name, length))
}

/// `name` → scalar, `name[N]` → literal index, `name[]` → index from stack.
fn parse_access(token: &str, line: usize) -> Result<(&str, IndexMode), AsmError> {
    let (name, inner) = split_subscript(token).ok_or_else(|| AsmError::InvalidVariable {
        line,
        token: token.to_string(),
    })?;
    let name = checked_name(name, token, line)?;

    let index = match inner {
        None => IndexMode::Scalar,
        Some("") => IndexMode::Stack,
        Some(text) => IndexMode::Literal(parse_int(text).ok_or_else(|| {
            AsmError::InvalidNumber {
                line,
                token: text.to_string(),
            }
        })?),
    };
    Ok((name, index))
}

fn expect_token<'t>(
    args: &'t [Token],
    idx: usize,
    line: usize,
    opcode: Opcode,
    expected: usize,
) -> Result<&'t Token, AsmError> {
    args.get(idx).ok_or(AsmError::MissingArgument {
        line,
        mnemonic: opcode.mnemonic(),
        expected,
    })
}

fn expect_word<'t>(
    args: &'t [Token],
    idx: usize,
    line: usize,
    opcode: Opcode,
    expected: usize,
) -> Result<&'t str, AsmError> {
    match expect_token(args, idx, line, opcode, expected)? {
        Token::Word(w) => Ok(w.as_str()),
        other => Err(AsmError::UnexpectedToken {
            line,
            token: other.text(),
        }),
    }
}

/// Check that there are no extra tokens.
fn expect_end(remaining: &[Token], line: usize) -> Result<(), AsmError> {
    if let Some(tok) = remaining.first() {
        return Err(AsmError::UnexpectedToken {
            line,
            token: tok.text(),
        });
    }
    Ok(())
}
