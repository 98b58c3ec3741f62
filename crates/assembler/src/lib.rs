//! CVM assembler: text assembly to resolved instruction sequence.
//!
//! Assembly runs in two passes:
//!
//! 1. Every line is tokenized. Blank and comment lines are dropped, and each
//!    `label:` line binds the label to the index of the next instruction.
//!    Duplicate labels are rejected here, before anything executes, and so
//!    is any instruction ahead of the first label, which could never run.
//! 2. Every instruction line is resolved: labels become addresses and
//!    variable names become dense ids, so the VM never looks up a name.
//!
//! # Usage
//!
//! ```
//! use cvm_assembler::assemble;
//!
//! let program = assemble("MAIN:\n  push 7\n  push 2\n  div\n  print\n").unwrap();
//! assert_eq!(program.len(), 4);
//! assert_eq!(program.entry(), 0);
//! ```
//!
//! # Function scopes
//!
//! A label that is the target of some `call`, or `MAIN` itself, starts a new
//! function: locals declared after it get their own id space. Other labels
//! (`.L1:` and friends) stay inside the enclosing function.

pub mod error;
pub mod symbols;

mod disassembler;
mod lexer;
mod parser;

pub use error::AsmError;

use std::collections::HashSet;

use cvm_common::{Opcode, Program};
use lexer::{tokenize_line, Line, Token};
use parser::{Resolver, ENTRY_LABEL};
use symbols::LabelTable;
use tracing::debug;

/// A tokenized line kept between the passes.
enum Item {
    Label(String),
    Instruction {
        line: usize,
        mnemonic: String,
        operands: Vec<Token>,
    },
}

/// Assemble text into a program.
///
/// Returns the first error encountered. The returned [`Program`] carries the
/// resolved `MAIN` address as its entry point.
pub fn assemble(text: &str) -> Result<Program, AsmError> {
    // Pass 1: tokenize, bind labels, find call targets.
    let mut items = Vec::new();
    let mut labels = LabelTable::new();
    let mut functions: HashSet<String> = HashSet::new();
    let mut count: usize = 0;

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        match tokenize_line(raw, line)? {
            None => {}
            Some(Line::Label(name)) => {
                let address = to_address(count)?;
                if !labels.define(&name, address) {
                    return Err(AsmError::DuplicateLabel { line, name });
                }
                items.push(Item::Label(name));
            }
            Some(Line::Instruction { mnemonic, operands }) => {
                if labels.is_empty() {
                    return Err(AsmError::UnreachableInstruction { line });
                }
                if Opcode::from_mnemonic(&mnemonic) == Some(Opcode::Call) {
                    if let Some(Token::Word(target)) = operands.first() {
                        functions.insert(target.clone());
                    }
                }
                items.push(Item::Instruction {
                    line,
                    mnemonic,
                    operands,
                });
                count += 1;
            }
        }
    }
    let end = to_address(count)?;
    debug!(
        labels = labels.len(),
        functions = functions.len(),
        instructions = count,
        "assembler pass 1 complete"
    );

    // Pass 2: resolve operands.
    let mut resolver = Resolver::new(labels, end);
    let mut instructions = Vec::with_capacity(count);

    for item in &items {
        match item {
            Item::Label(name) => {
                if name == ENTRY_LABEL || functions.contains(name) {
                    resolver.enter_function();
                }
            }
            Item::Instruction {
                line,
                mnemonic,
                operands,
            } => instructions.push(resolver.resolve(mnemonic, operands, *line)?),
        }
    }

    let entry = resolver.entry().ok_or(AsmError::MissingEntryPoint)? as usize;
    debug!(
        instructions = instructions.len(),
        globals = resolver.global_count(),
        entry,
        "assembler pass 2 complete"
    );

    Ok(Program::new(instructions, entry))
}

/// Disassemble a program into canonical assembly text.
///
/// Labels are named `MAIN` (the entry) and `L<address>`; globals and locals
/// are named `g<id>` and `l<id>`. The output reassembles to an identical
/// program.
pub fn disassemble(program: &Program) -> String {
    disassembler::disassemble(program)
}

fn to_address(count: usize) -> Result<u32, AsmError> {
    u32::try_from(count).map_err(|_| AsmError::ProgramTooLarge { len: count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvm_common::{CType, IndexMode, Instruction};

    #[test]
    fn assemble_minimal() {
        let program = assemble("MAIN:\npush 42\nprint\n").unwrap();
        assert_eq!(
            program.instructions,
            vec![Instruction::push_int(42), Instruction::bare(Opcode::Print)]
        );
        assert_eq!(program.entry(), 0);
    }

    #[test]
    fn labels_bind_instruction_index_not_line() {
        let text = "\
// header comment

FOO:
    push 1
    return

MAIN:
    # another comment
    call FOO
    return
";
        let program = assemble(text).unwrap();
        assert_eq!(program.entry(), 2);
        assert_eq!(program.instructions[2], Instruction::branch(Opcode::Call, 0));
    }

    #[test]
    fn label_at_end_of_program() {
        let program = assemble("MAIN:\njump END\nEND:\n").unwrap();
        assert_eq!(program.instructions, vec![Instruction::branch(Opcode::Jump, 1)]);
    }

    #[test]
    fn forward_label_reference() {
        let program = assemble("MAIN:\njumpIf .L1\npush 1\n.L1:\nreturn\n").unwrap();
        assert_eq!(program.instructions[0], Instruction::branch(Opcode::JumpIf, 2));
    }

    #[test]
    fn duplicate_label_detected_in_first_pass() {
        // The bogus mnemonic on line 2 would fail in pass 2; the duplicate
        // must be reported first.
        let err = assemble("MAIN:\nfrobnicate\nMAIN:\n").unwrap_err();
        assert_eq!(
            err,
            AsmError::DuplicateLabel {
                line: 3,
                name: "MAIN".to_string()
            }
        );
    }

    #[test]
    fn missing_main() {
        let err = assemble("START:\npush 1\nprint\n").unwrap_err();
        assert_eq!(err, AsmError::MissingEntryPoint);
    }

    #[test]
    fn instruction_before_first_label_is_rejected() {
        let err = assemble("// prologue\n\ndeclareGlobal total int\nMAIN:\nreturn\n").unwrap_err();
        assert_eq!(err, AsmError::UnreachableInstruction { line: 3 });
    }

    #[test]
    fn call_to_label_at_end_is_rejected() {
        let err = assemble("MAIN:\ncall END\nreturn\nEND:\n").unwrap_err();
        assert_eq!(
            err,
            AsmError::CallPastEnd {
                line: 2,
                name: "END".to_string()
            }
        );
    }

    #[test]
    fn error_reports_correct_line() {
        let err = assemble("MAIN:\n\npush 1\nfrob\n").unwrap_err();
        assert!(matches!(err, AsmError::InvalidInstruction { line: 4, .. }));
    }

    #[test]
    fn call_target_opens_local_scope() {
        let text = "\
MAIN:
    declareLocal i int
    declareLocal j int
    call F
    return
F:
    declareLocal k int
    getLocal k
    return
";
        let program = assemble(text).unwrap();
        // k is the first local of F, so it gets id 0 again.
        assert_eq!(
            program.instructions[4],
            Instruction::declare(Opcode::DeclareLocal, 0, CType::Int, None)
        );
        assert_eq!(
            program.instructions[5],
            Instruction::access(Opcode::GetLocal, 0, IndexMode::Scalar)
        );
    }

    #[test]
    fn local_from_other_function_is_undefined() {
        let text = "\
MAIN:
    declareLocal i int
    call F
    return
F:
    getLocal i
    return
";
        let err = assemble(text).unwrap_err();
        assert_eq!(
            err,
            AsmError::UndefinedVariable {
                line: 6,
                name: "i".to_string()
            }
        );
    }

    #[test]
    fn inner_labels_keep_scope() {
        let text = "\
MAIN:
    declareLocal i int
.L1:
    getLocal i
    return
";
        assert!(assemble(text).is_ok());
    }

    #[test]
    fn globals_visible_everywhere() {
        let text = "\
MAIN:
    declareGlobal total int
    push 3
    setGlobal total
    call F
    return
F:
    getGlobal total
    print
    return
";
        let program = assemble(text).unwrap();
        assert_eq!(
            program.instructions[5],
            Instruction::access(Opcode::GetGlobal, 0, IndexMode::Scalar)
        );
        let output = cvm_vm::run(&program, &cvm_vm::Config::default()).unwrap();
        assert_eq!(output, vec!["3"]);
    }

    #[test]
    fn assemble_is_repeatable() {
        let text = "MAIN:\ndeclareGlobal x int\npush 1\nsetGlobal x\nreturn\n";
        assert_eq!(assemble(text).unwrap(), assemble(text).unwrap());
    }
}
