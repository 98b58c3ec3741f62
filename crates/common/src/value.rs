//! Runtime value representation for the VM operand stack.

use std::fmt;

/// A value on the operand stack.
///
/// Memory cells only ever hold integers; strings exist so `push "text"`
/// followed by `print` works.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Signed 64-bit integer.
    Int(i64),
    /// String literal pushed by `push "..."`.
    Str(String),
}

impl Value {
    /// The integer payload, or `None` for strings.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Str(_) => None,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Int(b as i64)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Str(s) => f.write_str(s),
        }
    }
}
