//! Content pointers derived from entry names.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Scheme prefix for every content pointer.
pub const IPFS_PREFIX: &str = "ipfs://";

/// A retrievable pointer to an entry's content, `ipfs://<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentPointer(String);

impl ContentPointer {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name this pointer was derived from.
    pub fn name(&self) -> &str {
        self.0.strip_prefix(IPFS_PREFIX).unwrap_or(&self.0)
    }
}

impl fmt::Display for ContentPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentPointer {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derive the content pointer for `name`.
///
/// Pure and deterministic. Empty names are rejected by registration, never here.
pub fn content_pointer(name: &str) -> ContentPointer {
    ContentPointer(format!("{IPFS_PREFIX}{name}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_name() {
        assert_eq!(content_pointer("A").as_str(), "ipfs://A");
        assert_eq!(
            content_pointer("QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG").to_string(),
            "ipfs://QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG"
        );
    }

    #[test]
    fn deterministic() {
        assert_eq!(content_pointer("same"), content_pointer("same"));
        assert_ne!(content_pointer("a"), content_pointer("b"));
    }

    #[test]
    fn name_strips_prefix() {
        assert_eq!(content_pointer("B").name(), "B");
    }
}
