//! Registry error types.

use std::fmt;

use thiserror::Error;

use crate::types::TokenId;

/// The key a failed lookup was made with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Id(TokenId),
    Name(String),
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "token #{id}"),
            Self::Name(name) => write!(f, "name {name:?}"),
        }
    }
}

/// Errors returned by registry operations.
///
/// Every variant is a precondition violation: deterministic, never worth retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The name is already bound to an identifier.
    #[error("already mint: {name:?}")]
    DuplicateName { name: String },

    /// No entry exists for the identifier or name.
    #[error("not mint: {0}")]
    NotFound(Lookup),

    /// Names must be non-empty.
    #[error("name must not be empty")]
    EmptyName,

    /// Entries cannot be registered to the zero address.
    #[error("cannot register to the zero address")]
    ZeroOwner,

    /// A snapshot violates the registry invariants.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

impl RegistryError {
    /// Returns `true` for unknown identifiers or names.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns `true` if the name was already taken.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateName { .. })
    }
}

/// Errors from parsing an [`Address`](crate::Address).
#[derive(Debug, Error)]
pub enum AddressError {
    #[error("address must start with 0x")]
    MissingPrefix,

    #[error("invalid hex in address: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("address must be 20 bytes, got {0}")]
    Length(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_contract_reverts() {
        let dup = RegistryError::DuplicateName { name: "A".into() };
        assert!(dup.to_string().starts_with("already mint"));
        let missing = RegistryError::NotFound(Lookup::Name("C".into()));
        assert_eq!(missing.to_string(), "not mint: name \"C\"");
        let missing_id = RegistryError::NotFound(Lookup::Id(TokenId::new(9)));
        assert_eq!(missing_id.to_string(), "not mint: token #9");
    }

    #[test]
    fn classification() {
        assert!(RegistryError::NotFound(Lookup::Name("x".into())).is_not_found());
        assert!(RegistryError::DuplicateName { name: "x".into() }.is_duplicate());
        assert!(!RegistryError::EmptyName.is_not_found());
    }
}
