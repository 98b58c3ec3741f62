//! Flat, append-only memory arena.
//!
//! Each executed declaration appends one cell; its index is the address
//! bound in the global map or the current frame. Nothing is ever freed
//! during a run. [`Memory::clear`] resets the arena between runs.
//!
//! A scalar occupies one element, an array one per slot. The total is
//! checked against a caller-supplied limit before anything is allocated.

use cvm_common::{CType, Declaration};

use crate::error::RuntimeError;

/// A variable's storage. `None` marks a cell that was never written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Scalar { ctype: CType, value: Option<i64> },
    Array { ctype: CType, values: Vec<Option<i64>> },
}

impl Cell {
    fn from_declaration(decl: &Declaration) -> Self {
        match decl.length {
            None => Cell::Scalar {
                ctype: decl.ctype,
                value: None,
            },
            Some(len) => Cell::Array {
                ctype: decl.ctype,
                values: vec![None; len as usize],
            },
        }
    }

    /// Number of elements the declaration occupies.
    fn size(decl: &Declaration) -> usize {
        decl.length.map_or(1, |len| len as usize)
    }

    /// Declared type, kept for bookkeeping only.
    pub fn ctype(&self) -> CType {
        match self {
            Cell::Scalar { ctype, .. } | Cell::Array { ctype, .. } => *ctype,
        }
    }
}

#[derive(Debug, Default)]
pub struct Memory {
    cells: Vec<Cell>,
    elements: usize,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.elements = 0;
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Elements allocated so far, across all cells.
    pub fn elements(&self) -> usize {
        self.elements
    }

    pub fn cell(&self, address: usize) -> Option<&Cell> {
        self.cells.get(address)
    }

    /// Append a fresh, uninitialized cell and return its address.
    ///
    /// Fails with `MemoryExhausted` when the total element count would
    /// exceed `limit`; the arena is unchanged in that case.
    pub fn allocate(
        &mut self,
        decl: &Declaration,
        limit: usize,
        at: usize,
    ) -> Result<usize, RuntimeError> {
        let requested = Cell::size(decl);
        let total = self
            .elements
            .checked_add(requested)
            .filter(|&total| total <= limit)
            .ok_or(RuntimeError::MemoryExhausted {
                at,
                requested,
                limit,
            })?;
        self.cells.push(Cell::from_declaration(decl));
        self.elements = total;
        Ok(self.cells.len() - 1)
    }

    /// Read a scalar (`index == None`) or an array element.
    pub fn load(&self, address: usize, index: Option<i64>, at: usize) -> Result<i64, RuntimeError> {
        let slot = match (self.cells.get(address), index) {
            (None, _) => return Err(RuntimeError::MalformedInstruction { at }),
            (Some(Cell::Scalar { value, .. }), None) => value,
            (Some(Cell::Scalar { .. }), Some(_)) => return Err(RuntimeError::NotAnArray { at }),
            (Some(Cell::Array { .. }), None) => return Err(RuntimeError::NotAScalar { at }),
            (Some(Cell::Array { values, .. }), Some(i)) => &values[element(values.len(), i, at)?],
        };
        (*slot).ok_or(RuntimeError::NotInitialized { at })
    }

    /// Write a scalar (`index == None`) or an array element.
    pub fn store(
        &mut self,
        address: usize,
        index: Option<i64>,
        value: i64,
        at: usize,
    ) -> Result<(), RuntimeError> {
        let slot = match (self.cells.get_mut(address), index) {
            (None, _) => return Err(RuntimeError::MalformedInstruction { at }),
            (Some(Cell::Scalar { value, .. }), None) => value,
            (Some(Cell::Scalar { .. }), Some(_)) => return Err(RuntimeError::NotAnArray { at }),
            (Some(Cell::Array { .. }), None) => return Err(RuntimeError::NotAScalar { at }),
            (Some(Cell::Array { values, .. }), Some(i)) => {
                let i = element(values.len(), i, at)?;
                &mut values[i]
            }
        };
        *slot = Some(value);
        Ok(())
    }
}

fn element(length: usize, index: i64, at: usize) -> Result<usize, RuntimeError> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < length)
        .ok_or(RuntimeError::IndexOutOfBounds { at, index, length })
}
