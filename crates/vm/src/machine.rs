//! VM state: operand stack, memory arena, global map, call frames.

use cvm_common::opcode::ALL_OPCODES;
use cvm_common::{Opcode, SymbolId, Value};

use crate::config::Config;
use crate::error::RuntimeError;
use crate::execute::{handler, Handler};
use crate::memory::Memory;

/// A call frame.
///
/// The bottom frame is the synthetic `MAIN` frame; its return address is the
/// program length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Entry address of the function this frame belongs to.
    pub function: usize,
    /// Instruction index to resume at after `return`.
    pub return_address: usize,
    /// Local symbol id → memory address. `None` until the declaration runs.
    pub(crate) locals: Vec<Option<usize>>,
}

impl Frame {
    pub(crate) fn new(function: usize, return_address: usize) -> Self {
        Self {
            function,
            return_address,
            locals: Vec::new(),
        }
    }

    /// Memory address bound to local `id`, if its declaration has run.
    pub fn local(&self, id: SymbolId) -> Option<usize> {
        self.locals.get(id as usize).copied().flatten()
    }
}

/// The CVM virtual machine.
///
/// One instance can execute any number of programs; all state is reset at
/// the start of every [`VM::execute`] call.
pub struct VM {
    pub(crate) config: Config,
    /// Operand stack.
    pub(crate) stack: Vec<Value>,
    pub(crate) memory: Memory,
    /// Global symbol id → memory address.
    pub(crate) globals: Vec<Option<usize>>,
    pub(crate) frames: Vec<Frame>,
    /// Printed lines, in order.
    pub(crate) output: Vec<String>,
    /// Index of the instruction being executed.
    pub(crate) pc: usize,
    /// Entry address of the current run.
    pub(crate) entry: usize,
    /// Length of the current program.
    pub(crate) program_len: usize,
    /// Instructions executed in the current run.
    pub(crate) steps: u64,
    /// Handler per opcode, indexed by `opcode as usize`.
    pub(crate) dispatch: [Handler; Opcode::COUNT],
}

impl VM {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            stack: Vec::new(),
            memory: Memory::new(),
            globals: Vec::new(),
            frames: Vec::new(),
            output: Vec::new(),
            pc: 0,
            entry: 0,
            program_len: 0,
            steps: 0,
            dispatch: ALL_OPCODES.map(handler),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Instructions executed by the last run.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Memory address bound to global `id`, if its declaration has run.
    pub fn global(&self, id: SymbolId) -> Option<usize> {
        self.globals.get(id as usize).copied().flatten()
    }

    /// Clear all state and set up the root `MAIN` frame.
    pub(crate) fn reset(&mut self, program_len: usize, entry: usize) {
        self.stack.clear();
        self.memory.clear();
        self.globals.clear();
        self.frames.clear();
        self.output.clear();
        self.pc = entry;
        self.entry = entry;
        self.program_len = program_len;
        self.steps = 0;
        self.frames.push(Frame::new(entry, program_len));
    }

    /// Push a value onto the stack, checking for overflow.
    pub(crate) fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        if self.stack.len() >= self.config.max_stack_depth {
            return Err(RuntimeError::StackOverflow {
                at: self.pc,
                limit: self.config.max_stack_depth,
            });
        }
        self.stack.push(value);
        Ok(())
    }

    /// Pop a value from the stack.
    pub(crate) fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack
            .pop()
            .ok_or(RuntimeError::StackUnderflow { at: self.pc })
    }

    /// Pop a value that must be an integer.
    pub(crate) fn pop_int(&mut self) -> Result<i64, RuntimeError> {
        let at = self.pc;
        self.pop()?
            .as_int()
            .ok_or(RuntimeError::TypeMismatch { at })
    }

    pub(crate) fn frame_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    /// Address of a global, failing if its declaration has not run.
    pub(crate) fn global_address(&self, id: SymbolId) -> Result<usize, RuntimeError> {
        self.global(id)
            .ok_or(RuntimeError::UnboundVariable { at: self.pc, id })
    }

    /// Address of a local in the current frame.
    pub(crate) fn local_address(&self, id: SymbolId) -> Result<usize, RuntimeError> {
        self.frames
            .last()
            .and_then(|frame| frame.local(id))
            .ok_or(RuntimeError::UnboundVariable { at: self.pc, id })
    }
}

/// Bind `id` to `address`, growing the table as needed.
pub(crate) fn bind(table: &mut Vec<Option<usize>>, id: SymbolId, address: usize) {
    let idx = id as usize;
    if table.len() <= idx {
        table.resize(idx + 1, None);
    }
    table[idx] = Some(address);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_installs_root_frame() {
        let mut vm = VM::new(Config::default());
        vm.stack.push(Value::Int(1));
        vm.reset(10, 4);
        assert!(vm.stack().is_empty());
        assert_eq!(vm.frames(), &[Frame::new(4, 10)]);
        assert_eq!(vm.pc, 4);
    }

    #[test]
    fn push_respects_limit() {
        let mut vm = VM::new(Config {
            max_stack_depth: 2,
            ..Config::default()
        });
        vm.push(Value::Int(1)).unwrap();
        vm.push(Value::Int(2)).unwrap();
        assert_eq!(
            vm.push(Value::Int(3)),
            Err(RuntimeError::StackOverflow { at: 0, limit: 2 })
        );
    }

    #[test]
    fn pop_empty_underflows() {
        let mut vm = VM::new(Config::default());
        vm.pc = 7;
        assert_eq!(vm.pop(), Err(RuntimeError::StackUnderflow { at: 7 }));
    }

    #[test]
    fn pop_int_rejects_strings() {
        let mut vm = VM::new(Config::default());
        vm.push(Value::Str("x".to_string())).unwrap();
        assert_eq!(vm.pop_int(), Err(RuntimeError::TypeMismatch { at: 0 }));
    }

    #[test]
    fn bind_grows_table() {
        let mut table = Vec::new();
        bind(&mut table, 3, 9);
        assert_eq!(table, vec![None, None, None, Some(9)]);
        bind(&mut table, 0, 1);
        assert_eq!(table[0], Some(1));
    }

    #[test]
    fn unbound_lookups() {
        let mut vm = VM::new(Config::default());
        vm.reset(1, 0);
        assert_eq!(
            vm.global_address(2),
            Err(RuntimeError::UnboundVariable { at: 0, id: 2 })
        );
        assert_eq!(
            vm.local_address(0),
            Err(RuntimeError::UnboundVariable { at: 0, id: 0 })
        );
    }
}
