//! Execution configuration.

/// Default frame-stack capacity.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;

/// Default operand-stack capacity.
pub const DEFAULT_MAX_STACK_DEPTH: usize = 65_536;

/// Default memory capacity, in elements across all cells.
pub const DEFAULT_MAX_MEMORY_CELLS: usize = 1 << 24;

/// Per-VM execution settings.
///
/// Passed to [`VM::new`](crate::VM::new); the VM never consults the
/// environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Emit a tracing event for every executed instruction.
    pub debug: bool,
    /// Emit a summary event with step count and elapsed time.
    pub trace_timing: bool,
    /// Frame-stack capacity, including the root `MAIN` frame.
    pub max_call_depth: usize,
    /// Operand-stack capacity.
    pub max_stack_depth: usize,
    /// Memory capacity: a scalar counts one element, an array its length.
    pub max_memory_cells: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            trace_timing: false,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_stack_depth: DEFAULT_MAX_STACK_DEPTH,
            max_memory_cells: DEFAULT_MAX_MEMORY_CELLS,
        }
    }
}
