//! Assemble-time symbol tables.
//!
//! Both tables are rebuilt from scratch on every `assemble` call and are
//! dropped once the program is produced. The VM only ever sees the ids and
//! addresses they hand out.

use std::collections::HashMap;

use cvm_common::SymbolId;

/// Label name → instruction index.
#[derive(Debug, Default)]
pub struct LabelTable {
    addresses: HashMap<String, u32>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `address`. Returns `false` if the name was already bound,
    /// leaving the first binding in place.
    pub fn define(&mut self, name: &str, address: u32) -> bool {
        if self.addresses.contains_key(name) {
            return false;
        }
        self.addresses.insert(name.to_string(), address);
        true
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.addresses.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

/// Variable name → dense id, assigned in first-declaration order.
///
/// One table holds the globals for the whole program; each function gets a
/// fresh table for its locals.
#[derive(Debug, Default)]
pub struct SymbolTable {
    ids: HashMap<String, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next id to `name`. Returns `None` if `name` is already
    /// declared.
    pub fn declare_unique(&mut self, name: &str) -> Option<SymbolId> {
        if self.ids.contains_key(name) {
            return None;
        }
        Some(self.declare(name))
    }

    /// Return the id of `name`, assigning the next one on first sight.
    pub fn declare(&mut self, name: &str) -> SymbolId {
        let next = self.ids.len() as SymbolId;
        *self.ids.entry(name.to_string()).or_insert(next)
    }

    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.ids.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
