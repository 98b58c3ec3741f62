//! Name-lookup errors for the CVM catalogs.

use thiserror::Error;

/// A textual name did not match any entry in a fixed catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// No opcode has this mnemonic.
    #[error("unknown mnemonic '{0}'")]
    UnknownMnemonic(String),

    /// No declarable type has this name.
    #[error("unknown type '{0}'")]
    UnknownType(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unknown_mnemonic() {
        assert_eq!(
            CatalogError::UnknownMnemonic("frob".to_string()).to_string(),
            "unknown mnemonic 'frob'"
        );
    }

    #[test]
    fn display_unknown_type() {
        assert_eq!(
            CatalogError::UnknownType("float".to_string()).to_string(),
            "unknown type 'float'"
        );
    }
}
