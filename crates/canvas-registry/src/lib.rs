//! canvas-registry: the Canvas name registry.
//!
//! # Overview
//!
//! Every asset is registered exactly once under a human-readable name and
//! receives the next sequential identifier, starting at 1. Assets can then be
//! looked up by identifier or by name. The registry is append-only: entries are
//! never renamed, transferred or removed.
//!
//! - [`NameRegistry`]: the registry trait
//! - [`MemoryRegistry`]: in-memory implementation with single-writer locking
//! - [`Entry`] / [`TokenId`]: one registered asset and its identifier
//! - [`ContentPointer`]: `ipfs://<name>` pointer derived from the name
//! - [`Address`]: 20-byte account address of an entry's owner
//! - [`RegistryError`]: structured error type
//!
//! # Quick start
//! ```rust
//! use canvas_registry::{Address, MemoryRegistry, NameRegistry};
//!
//! let registry = MemoryRegistry::new();
//! let owner: Address = "0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0".parse().unwrap();
//! let id = registry.register(owner, "A").unwrap();
//! assert_eq!(id.get(), 1);
//! assert_eq!(registry.resolve_content(id).unwrap().as_str(), "ipfs://A");
//! ```

pub mod address;
pub mod content;
pub mod error;
pub mod registry;
pub mod types;

pub use address::Address;
pub use content::{content_pointer, ContentPointer, IPFS_PREFIX};
pub use error::{AddressError, Lookup, RegistryError};
pub use registry::{MemoryRegistry, NameRegistry, NAME, SYMBOL};
pub use types::{Entry, TokenId};
