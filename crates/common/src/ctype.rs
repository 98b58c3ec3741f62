//! Declared C types for variable cells.
//!
//! Types are bookkeeping only: every cell holds an `i64` regardless of the
//! declared type. The tag is kept so listings and traces can show what the
//! program declared.

use std::fmt;
use std::str::FromStr;

use crate::error::CatalogError;

/// The declared type of a variable or array element.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CType {
    Int = 0,
    Char = 1,
    Short = 2,
    Long = 3,
}

/// All declarable types, in definition order.
pub const ALL_CTYPES: [CType; 4] = [CType::Int, CType::Char, CType::Short, CType::Long];

impl CType {
    /// Returns the assembly name for this type.
    pub fn name(&self) -> &'static str {
        match self {
            CType::Int => "int",
            CType::Char => "char",
            CType::Short => "short",
            CType::Long => "long",
        }
    }
}

impl FromStr for CType {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_CTYPES
            .iter()
            .find(|t| t.name() == s)
            .copied()
            .ok_or_else(|| CatalogError::UnknownType(s.to_string()))
    }
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
