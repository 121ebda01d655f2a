//! Entry and identifier types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::content::{content_pointer, ContentPointer};

/// Sequential token identifier. The first registered entry gets `1`; `0` is never assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(u64);

impl TokenId {
    /// The identifier assigned to the first registration.
    pub const FIRST: TokenId = TokenId(1);

    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<TokenId> for u64 {
    fn from(id: TokenId) -> Self {
        id.0
    }
}

/// One registered asset. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: TokenId,
    pub name: String,
    pub owner: Address,
    /// Always `content_pointer(&name)`.
    pub content: ContentPointer,
}

impl Entry {
    pub(crate) fn new(id: TokenId, name: String, owner: Address) -> Self {
        let content = content_pointer(&name);
        Self {
            id,
            name,
            owner,
            content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_derives_pointer() {
        let e = Entry::new(TokenId::FIRST, "A".into(), Address::from_bytes([1; 20]));
        assert_eq!(e.content.as_str(), "ipfs://A");
    }

    #[test]
    fn token_id_is_transparent_in_json() {
        let json = serde_json::to_string(&TokenId::new(7)).unwrap();
        assert_eq!(json, "7");
        assert_eq!(TokenId::FIRST.next().get(), 2);
    }
}
