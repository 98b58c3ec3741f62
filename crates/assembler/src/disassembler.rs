//! Disassembler: resolved program → canonical assembly text.
//!
//! Labels sit on their own line, instructions are indented four spaces.
//! Names are synthesized from ids and addresses, so the text reassembles to
//! the same instructions and entry point. Address 0 is always labelled,
//! since the assembler rejects instructions ahead of the first label.

use std::collections::BTreeSet;

use cvm_common::operand::quote;
use cvm_common::{IndexMode, Instruction, Opcode, Operand, Program};

use crate::parser::ENTRY_LABEL;

pub(crate) fn disassemble(program: &Program) -> String {
    let instrs = &program.instructions;
    let entry = program.entry();

    let targets: BTreeSet<usize> = instrs
        .iter()
        .filter(|i| i.opcode.takes_address())
        .filter_map(Instruction::address)
        .chain([0, entry])
        .collect();

    let mut out = String::new();
    for (pc, instr) in instrs.iter().enumerate() {
        if targets.contains(&pc) {
            push_label(&mut out, pc, entry);
        }
        out.push_str("    ");
        out.push_str(&render(instr, entry));
        out.push('\n');
    }
    // Labels may point one past the last instruction.
    for &pc in targets.range(instrs.len()..) {
        push_label(&mut out, pc, entry);
    }
    out
}

fn push_label(out: &mut String, pc: usize, entry: usize) {
    out.push_str(&label(pc, entry));
    out.push_str(":\n");
}

fn label(pc: usize, entry: usize) -> String {
    if pc == entry {
        ENTRY_LABEL.to_string()
    } else {
        format!("L{pc}")
    }
}

fn var_name(opcode: Opcode, id: u32) -> String {
    if opcode.is_local() {
        format!("l{id}")
    } else {
        format!("g{id}")
    }
}

fn render(instr: &Instruction, entry: usize) -> String {
    let mnemonic = instr.opcode.mnemonic();

    if instr.opcode.takes_address() {
        if let Some(target) = instr.address() {
            return format!("{mnemonic} {}", label(target, entry));
        }
    }

    match instr.opcode {
        Opcode::Push => match instr.literal() {
            Some(Operand::Int(n)) => return format!("{mnemonic} {n}"),
            Some(Operand::Str(s)) => return format!("{mnemonic} {}", quote(s)),
            _ => {}
        },
        Opcode::DeclareGlobal | Opcode::DeclareLocal => {
            if let Some(decl) = instr.declaration() {
                let name = var_name(instr.opcode, decl.id);
                return match decl.length {
                    Some(len) => format!("{mnemonic} {name}[{len}] {}", decl.ctype),
                    None => format!("{mnemonic} {name} {}", decl.ctype),
                };
            }
        }
        op if op.is_variable_access() => {
            if let Some(var) = instr.var_ref() {
                let name = var_name(op, var.id);
                return match var.index {
                    IndexMode::Scalar => format!("{mnemonic} {name}"),
                    IndexMode::Literal(i) => format!("{mnemonic} {name}[{i}]"),
                    IndexMode::Stack => format!("{mnemonic} {name}[]"),
                };
            }
        }
        _ => {}
    }

    // Bare opcodes, and anything whose operands don't match the layout.
    instr.to_string()
}
