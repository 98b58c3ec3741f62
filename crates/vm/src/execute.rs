//! Fetch-execute loop and opcode handlers.
//!
//! Every opcode maps to one handler of type [`Handler`]. Handlers never touch
//! the program counter; they report what happens next through [`Flow`] and
//! the loop applies it.

use std::time::Instant;

use cvm_common::{Declaration, IndexMode, Instruction, Opcode, Operand, Value, VarRef};
use tracing::{debug, info, trace};

use crate::error::RuntimeError;
use crate::machine::{bind, Frame, VM};

/// Control-flow outcome of one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Continue with the following instruction.
    Next,
    /// Continue at exactly this instruction index.
    Jump(usize),
    /// Stop; the run is complete.
    Halt,
}

/// An opcode's state transition.
pub type Handler = fn(&mut VM, &Instruction) -> Result<Flow, RuntimeError>;

/// The handler for `opcode`.
pub fn handler(opcode: Opcode) -> Handler {
    match opcode {
        Opcode::Print => VM::exec_print,
        Opcode::Pop => VM::exec_pop,
        Opcode::Push => VM::exec_push,
        Opcode::Add => VM::exec_add,
        Opcode::Sub => VM::exec_sub,
        Opcode::Mul => VM::exec_mul,
        Opcode::Div => VM::exec_div,
        Opcode::Mod => VM::exec_mod,
        Opcode::Eq => VM::exec_eq,
        Opcode::Ne => VM::exec_ne,
        Opcode::Gt => VM::exec_gt,
        Opcode::Ge => VM::exec_ge,
        Opcode::Lt => VM::exec_lt,
        Opcode::Le => VM::exec_le,
        Opcode::Increment => VM::exec_increment,
        Opcode::Decrement => VM::exec_decrement,
        Opcode::Jump => VM::exec_jump,
        Opcode::JumpIf => VM::exec_jump_if,
        Opcode::JumpIfZero => VM::exec_jump_if_zero,
        Opcode::DeclareGlobal => VM::exec_declare_global,
        Opcode::SetGlobal => VM::exec_set_global,
        Opcode::GetGlobal => VM::exec_get_global,
        Opcode::DeclareLocal => VM::exec_declare_local,
        Opcode::SetLocal => VM::exec_set_local,
        Opcode::GetLocal => VM::exec_get_local,
        Opcode::Call => VM::exec_call,
        Opcode::Return => VM::exec_return,
        Opcode::DebugShowStack => VM::exec_debug_show_stack,
    }
}

/// Integer division rounding toward negative infinity.
///
/// The caller rejects `divisor == 0`. `i64::MIN / -1` wraps to `i64::MIN`.
pub fn floor_div(dividend: i64, divisor: i64) -> i64 {
    let q = dividend.wrapping_div(divisor);
    if dividend.wrapping_rem(divisor) != 0 && ((dividend < 0) != (divisor < 0)) {
        q - 1
    } else {
        q
    }
}

impl VM {
    /// Execute `instructions` starting at `entry` and return the printed
    /// lines.
    ///
    /// Execution stops when the `MAIN` frame returns or control falls off
    /// the end. All state from any earlier run is discarded first.
    ///
    /// # Errors
    ///
    /// Returns the first [`RuntimeError`]; the run is not resumable.
    pub fn execute(
        &mut self,
        instructions: &[Instruction],
        entry: usize,
    ) -> Result<Vec<String>, RuntimeError> {
        if entry > instructions.len() {
            return Err(RuntimeError::InvalidEntry {
                entry,
                len: instructions.len(),
            });
        }
        self.reset(instructions.len(), entry);

        let started = Instant::now();
        let result = self.run_loop(instructions);
        if self.config.trace_timing {
            info!(
                steps = self.steps,
                elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
                ok = result.is_ok(),
                "execution finished"
            );
        }
        result?;

        Ok(std::mem::take(&mut self.output))
    }

    fn run_loop(&mut self, instructions: &[Instruction]) -> Result<(), RuntimeError> {
        while let Some(instr) = instructions.get(self.pc) {
            if self.config.debug {
                debug!(
                    pc = self.pc,
                    instr = %instr,
                    stack = self.stack.len(),
                    frames = self.frames.len(),
                    "step"
                );
            }
            self.steps += 1;

            let handler = self.dispatch[instr.opcode as usize];
            match handler(self, instr)? {
                Flow::Next => self.pc += 1,
                Flow::Jump(target) => {
                    if target > instructions.len() {
                        return Err(RuntimeError::MalformedInstruction { at: self.pc });
                    }
                    self.pc = target;
                }
                Flow::Halt => break,
            }
        }
        Ok(())
    }

    fn malformed(&self) -> RuntimeError {
        RuntimeError::MalformedInstruction { at: self.pc }
    }

    fn target(&self, instr: &Instruction) -> Result<usize, RuntimeError> {
        instr.address().ok_or_else(|| self.malformed())
    }

    fn declaration(&self, instr: &Instruction) -> Result<Declaration, RuntimeError> {
        instr.declaration().ok_or_else(|| self.malformed())
    }

    fn var_ref(&self, instr: &Instruction) -> Result<VarRef, RuntimeError> {
        instr.var_ref().ok_or_else(|| self.malformed())
    }

    // ---- Stack ----

    fn exec_print(&mut self, _instr: &Instruction) -> Result<Flow, RuntimeError> {
        let value = self.pop()?;
        self.output.push(value.to_string());
        Ok(Flow::Next)
    }

    fn exec_pop(&mut self, _instr: &Instruction) -> Result<Flow, RuntimeError> {
        self.pop()?;
        Ok(Flow::Next)
    }

    fn exec_push(&mut self, instr: &Instruction) -> Result<Flow, RuntimeError> {
        let value = match instr.literal() {
            Some(Operand::Int(n)) => Value::Int(*n),
            Some(Operand::Str(s)) => Value::Str(s.clone()),
            _ => return Err(self.malformed()),
        };
        self.push(value)?;
        Ok(Flow::Next)
    }

    fn exec_debug_show_stack(&mut self, _instr: &Instruction) -> Result<Flow, RuntimeError> {
        debug!(pc = self.pc, stack = ?self.stack, "debugShowStack");
        Ok(Flow::Next)
    }

    // ---- Arithmetic & comparison ----

    /// Pop `a`, pop `b`, push `op(b, a)`.
    fn binary(
        &mut self,
        op: impl FnOnce(i64, i64) -> Result<Value, RuntimeError>,
    ) -> Result<Flow, RuntimeError> {
        let a = self.pop_int()?;
        let b = self.pop_int()?;
        let result = op(b, a)?;
        self.push(result)?;
        Ok(Flow::Next)
    }

    fn unary(&mut self, op: impl FnOnce(i64) -> i64) -> Result<Flow, RuntimeError> {
        let a = self.pop_int()?;
        self.push(Value::Int(op(a)))?;
        Ok(Flow::Next)
    }

    fn exec_add(&mut self, _instr: &Instruction) -> Result<Flow, RuntimeError> {
        self.binary(|b, a| Ok(b.wrapping_add(a).into()))
    }

    fn exec_sub(&mut self, _instr: &Instruction) -> Result<Flow, RuntimeError> {
        self.binary(|b, a| Ok(b.wrapping_sub(a).into()))
    }

    fn exec_mul(&mut self, _instr: &Instruction) -> Result<Flow, RuntimeError> {
        self.binary(|b, a| Ok(b.wrapping_mul(a).into()))
    }

    fn exec_div(&mut self, _instr: &Instruction) -> Result<Flow, RuntimeError> {
        let at = self.pc;
        self.binary(|b, a| {
            if a == 0 {
                return Err(RuntimeError::DivisionByZero { at });
            }
            Ok(floor_div(b, a).into())
        })
    }

    fn exec_mod(&mut self, _instr: &Instruction) -> Result<Flow, RuntimeError> {
        let at = self.pc;
        self.binary(|b, a| {
            if a == 0 {
                return Err(RuntimeError::DivisionByZero { at });
            }
            Ok(b.wrapping_rem(a).into())
        })
    }

    fn exec_eq(&mut self, _instr: &Instruction) -> Result<Flow, RuntimeError> {
        self.binary(|b, a| Ok((b == a).into()))
    }

    fn exec_ne(&mut self, _instr: &Instruction) -> Result<Flow, RuntimeError> {
        self.binary(|b, a| Ok((b != a).into()))
    }

    fn exec_gt(&mut self, _instr: &Instruction) -> Result<Flow, RuntimeError> {
        self.binary(|b, a| Ok((b > a).into()))
    }

    fn exec_ge(&mut self, _instr: &Instruction) -> Result<Flow, RuntimeError> {
        self.binary(|b, a| Ok((b >= a).into()))
    }

    fn exec_lt(&mut self, _instr: &Instruction) -> Result<Flow, RuntimeError> {
        self.binary(|b, a| Ok((b < a).into()))
    }

    fn exec_le(&mut self, _instr: &Instruction) -> Result<Flow, RuntimeError> {
        self.binary(|b, a| Ok((b <= a).into()))
    }

    fn exec_increment(&mut self, _instr: &Instruction) -> Result<Flow, RuntimeError> {
        self.unary(|a| a.wrapping_add(1))
    }

    fn exec_decrement(&mut self, _instr: &Instruction) -> Result<Flow, RuntimeError> {
        self.unary(|a| a.wrapping_sub(1))
    }

    // ---- Control flow ----

    fn exec_jump(&mut self, instr: &Instruction) -> Result<Flow, RuntimeError> {
        Ok(Flow::Jump(self.target(instr)?))
    }

    fn exec_jump_if(&mut self, instr: &Instruction) -> Result<Flow, RuntimeError> {
        let target = self.target(instr)?;
        if self.pop_int()? != 0 {
            Ok(Flow::Jump(target))
        } else {
            Ok(Flow::Next)
        }
    }

    fn exec_jump_if_zero(&mut self, instr: &Instruction) -> Result<Flow, RuntimeError> {
        let target = self.target(instr)?;
        if self.pop_int()? == 0 {
            Ok(Flow::Jump(target))
        } else {
            Ok(Flow::Next)
        }
    }

    fn exec_call(&mut self, instr: &Instruction) -> Result<Flow, RuntimeError> {
        let target = self.target(instr)?;
        if target == self.entry {
            return Err(RuntimeError::InvalidCall { at: self.pc });
        }
        if target >= self.program_len {
            return Err(self.malformed());
        }
        let limit = self.config.max_call_depth;
        if self.frames.len() >= limit {
            return Err(RuntimeError::CallDepthExceeded { at: self.pc, limit });
        }
        if self.config.debug {
            trace!(from = self.pc, to = target, depth = self.frames.len(), "call");
        }
        self.frames.push(Frame::new(target, self.pc + 1));
        Ok(Flow::Jump(target))
    }

    fn exec_return(&mut self, _instr: &Instruction) -> Result<Flow, RuntimeError> {
        let frame = self
            .frames
            .pop()
            .ok_or(RuntimeError::InvalidReturn { at: self.pc })?;
        if self.frames.is_empty() {
            // The root MAIN frame returned.
            return Ok(Flow::Halt);
        }
        if self.config.debug {
            trace!(from = self.pc, to = frame.return_address, "return");
        }
        Ok(Flow::Jump(frame.return_address))
    }

    // ---- Variables ----

    fn exec_declare_global(&mut self, instr: &Instruction) -> Result<Flow, RuntimeError> {
        let decl = self.declaration(instr)?;
        let address = self
            .memory
            .allocate(&decl, self.config.max_memory_cells, self.pc)?;
        bind(&mut self.globals, decl.id, address);
        Ok(Flow::Next)
    }

    fn exec_declare_local(&mut self, instr: &Instruction) -> Result<Flow, RuntimeError> {
        let decl = self.declaration(instr)?;
        let at = self.pc;
        let address = self
            .memory
            .allocate(&decl, self.config.max_memory_cells, at)?;
        let frame = self
            .frame_mut()
            .ok_or(RuntimeError::UnboundVariable { at, id: decl.id })?;
        bind(&mut frame.locals, decl.id, address);
        Ok(Flow::Next)
    }

    fn exec_set_global(&mut self, instr: &Instruction) -> Result<Flow, RuntimeError> {
        let var = self.var_ref(instr)?;
        let address = self.global_address(var.id)?;
        self.store(address, var.index)
    }

    fn exec_get_global(&mut self, instr: &Instruction) -> Result<Flow, RuntimeError> {
        let var = self.var_ref(instr)?;
        let address = self.global_address(var.id)?;
        self.load(address, var.index)
    }

    fn exec_set_local(&mut self, instr: &Instruction) -> Result<Flow, RuntimeError> {
        let var = self.var_ref(instr)?;
        let address = self.local_address(var.id)?;
        self.store(address, var.index)
    }

    fn exec_get_local(&mut self, instr: &Instruction) -> Result<Flow, RuntimeError> {
        let var = self.var_ref(instr)?;
        let address = self.local_address(var.id)?;
        self.load(address, var.index)
    }

    fn index(&mut self, mode: IndexMode) -> Result<Option<i64>, RuntimeError> {
        match mode {
            IndexMode::Scalar => Ok(None),
            IndexMode::Literal(i) => Ok(Some(i)),
            IndexMode::Stack => Ok(Some(self.pop_int()?)),
        }
    }

    /// Index (if taken from the stack) is popped before the value.
    fn store(&mut self, address: usize, mode: IndexMode) -> Result<Flow, RuntimeError> {
        let index = self.index(mode)?;
        let value = self.pop_int()?;
        self.memory.store(address, index, value, self.pc)?;
        Ok(Flow::Next)
    }

    fn load(&mut self, address: usize, mode: IndexMode) -> Result<Flow, RuntimeError> {
        let index = self.index(mode)?;
        let value = self.memory.load(address, index, self.pc)?;
        self.push(Value::Int(value))?;
        Ok(Flow::Next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use cvm_common::opcode::ALL_OPCODES;
    use cvm_common::CType;

    fn run(instrs: Vec<Instruction>) -> Result<Vec<String>, RuntimeError> {
        VM::new(Config::default()).execute(&instrs, 0)
    }

    fn binop(b: i64, a: i64, op: Opcode) -> Result<Vec<String>, RuntimeError> {
        run(vec![
            Instruction::push_int(b),
            Instruction::push_int(a),
            Instruction::bare(op),
            Instruction::bare(Opcode::Print),
        ])
    }

    #[test]
    fn dispatch_table_covers_catalog() {
        let vm = VM::new(Config::default());
        assert_eq!(vm.dispatch.len(), ALL_OPCODES.len());
    }

    #[test]
    fn floor_division() {
        assert_eq!(floor_div(7, 2), 3);
        assert_eq!(floor_div(-7, 2), -4);
        assert_eq!(floor_div(7, -2), -4);
        assert_eq!(floor_div(-7, -2), 3);
        assert_eq!(floor_div(-8, 2), -4);
        assert_eq!(floor_div(i64::MIN, -1), i64::MIN);
    }

    #[test]
    fn operand_order() {
        assert_eq!(binop(10, 3, Opcode::Sub).unwrap(), vec!["7"]);
        assert_eq!(binop(3, 5, Opcode::Gt).unwrap(), vec!["0"]);
        assert_eq!(binop(3, 5, Opcode::Lt).unwrap(), vec!["1"]);
        assert_eq!(binop(-7, 2, Opcode::Mod).unwrap(), vec!["-1"]);
    }

    #[test]
    fn overflow_wraps() {
        assert_eq!(
            binop(i64::MAX, 1, Opcode::Add).unwrap(),
            vec![i64::MIN.to_string()]
        );
        assert_eq!(binop(i64::MIN, -1, Opcode::Mod).unwrap(), vec!["0"]);
    }

    #[test]
    fn division_by_zero() {
        assert_eq!(
            binop(1, 0, Opcode::Div),
            Err(RuntimeError::DivisionByZero { at: 2 })
        );
        assert_eq!(
            binop(1, 0, Opcode::Mod),
            Err(RuntimeError::DivisionByZero { at: 2 })
        );
    }

    #[test]
    fn jump_lands_on_target() {
        let out = run(vec![
            Instruction::branch(Opcode::Jump, 3),
            Instruction::push_int(1),
            Instruction::bare(Opcode::Print),
            Instruction::push_int(2),
            Instruction::bare(Opcode::Print),
        ])
        .unwrap();
        assert_eq!(out, vec!["2"]);
    }

    #[test]
    fn jump_past_end_is_malformed() {
        let err = run(vec![Instruction::branch(Opcode::Jump, 9)]).unwrap_err();
        assert_eq!(err, RuntimeError::MalformedInstruction { at: 0 });
    }

    #[test]
    fn call_returns_past_call_site() {
        // 0: call 3   1: print   2: return   3: push 5   4: return
        let out = run(vec![
            Instruction::branch(Opcode::Call, 3),
            Instruction::bare(Opcode::Print),
            Instruction::bare(Opcode::Return),
            Instruction::push_int(5),
            Instruction::bare(Opcode::Return),
        ])
        .unwrap();
        assert_eq!(out, vec!["5"]);
    }

    #[test]
    fn call_entry_is_invalid() {
        let err = run(vec![Instruction::branch(Opcode::Call, 0)]).unwrap_err();
        assert_eq!(err, RuntimeError::InvalidCall { at: 0 });
    }

    #[test]
    fn set_with_stack_index_pops_index_first() {
        let out = run(vec![
            Instruction::declare(Opcode::DeclareLocal, 0, CType::Int, Some(4)),
            Instruction::push_int(42), // value
            Instruction::push_int(3),  // index
            Instruction::access(Opcode::SetLocal, 0, IndexMode::Stack),
            Instruction::access(Opcode::GetLocal, 0, IndexMode::Literal(3)),
            Instruction::bare(Opcode::Print),
        ])
        .unwrap();
        assert_eq!(out, vec!["42"]);
    }

    #[test]
    fn local_declaration_is_per_frame() {
        // The callee's local 0 is distinct from MAIN's local 0.
        let out = run(vec![
            Instruction::declare(Opcode::DeclareLocal, 0, CType::Int, None),
            Instruction::push_int(1),
            Instruction::access(Opcode::SetLocal, 0, IndexMode::Scalar),
            Instruction::branch(Opcode::Call, 7),
            Instruction::access(Opcode::GetLocal, 0, IndexMode::Scalar),
            Instruction::bare(Opcode::Print),
            Instruction::bare(Opcode::Return),
            Instruction::declare(Opcode::DeclareLocal, 0, CType::Int, None),
            Instruction::push_int(2),
            Instruction::access(Opcode::SetLocal, 0, IndexMode::Scalar),
            Instruction::bare(Opcode::Return),
        ])
        .unwrap();
        assert_eq!(out, vec!["1"]);
    }

    #[test]
    fn undeclared_local_in_callee_is_unbound() {
        let err = run(vec![
            Instruction::declare(Opcode::DeclareLocal, 0, CType::Int, None),
            Instruction::branch(Opcode::Call, 3),
            Instruction::bare(Opcode::Return),
            Instruction::access(Opcode::GetLocal, 0, IndexMode::Scalar),
            Instruction::bare(Opcode::Return),
        ])
        .unwrap_err();
        assert_eq!(err, RuntimeError::UnboundVariable { at: 3, id: 0 });
    }

    #[test]
    fn malformed_operands() {
        let err = run(vec![Instruction::bare(Opcode::Push)]).unwrap_err();
        assert_eq!(err, RuntimeError::MalformedInstruction { at: 0 });
        let err = run(vec![Instruction::bare(Opcode::GetGlobal)]).unwrap_err();
        assert_eq!(err, RuntimeError::MalformedInstruction { at: 0 });
    }

    #[test]
    fn string_arithmetic_is_type_mismatch() {
        let err = run(vec![
            Instruction::push_str("a"),
            Instruction::push_int(1),
            Instruction::bare(Opcode::Add),
        ])
        .unwrap_err();
        assert_eq!(err, RuntimeError::TypeMismatch { at: 2 });
    }

    #[test]
    fn debug_show_stack_has_no_effect() {
        let out = run(vec![
            Instruction::push_int(4),
            Instruction::bare(Opcode::DebugShowStack),
            Instruction::bare(Opcode::Print),
        ])
        .unwrap();
        assert_eq!(out, vec!["4"]);
    }
}
