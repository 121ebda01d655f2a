//! The name registry - maps unique names to sequential identifiers.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::address::Address;
use crate::content::{content_pointer, ContentPointer};
use crate::error::{Lookup, RegistryError};
use crate::types::{Entry, TokenId};

/// Collection name reported by [`NameRegistry::display_name`].
pub const NAME: &str = "Canvas";
/// Collection symbol reported by [`NameRegistry::display_symbol`].
pub const SYMBOL: &str = "CS";

/// An append-only registry of uniquely named entries.
///
/// Implementations must serialize `register` so that, of two concurrent
/// registrations of one name, exactly one succeeds. Reads must never observe
/// one index updated without the other.
pub trait NameRegistry: Send + Sync {
    /// Register `name` for `owner` and return its new identifier.
    fn register(&self, owner: Address, name: &str) -> Result<TokenId, RegistryError>;

    /// Look up the full entry for an identifier.
    fn entry(&self, id: TokenId) -> Result<Entry, RegistryError>;

    /// Look up the identifier bound to `name`.
    fn identifier_of(&self, name: &str) -> Result<TokenId, RegistryError>;

    /// Number of registered entries. Equal to the last assigned identifier.
    fn total_supply(&self) -> u64;

    /// Number of entries registered to `owner`.
    fn balance_of(&self, owner: &Address) -> u64;

    /// Content pointer of the entry with identifier `id`.
    fn resolve_content(&self, id: TokenId) -> Result<ContentPointer, RegistryError> {
        self.entry(id).map(|e| e.content)
    }

    /// Owner of the entry with identifier `id`.
    fn owner_of(&self, id: TokenId) -> Result<Address, RegistryError> {
        self.entry(id).map(|e| e.owner)
    }

    fn display_name(&self) -> &'static str {
        NAME
    }

    fn display_symbol(&self) -> &'static str {
        SYMBOL
    }
}

// ─── In-memory registry ───────────────────────────────────────────────────────

/// Both indexes live behind one lock so they always change together.
#[derive(Default)]
struct RegistryState {
    /// name → identifier
    ids_by_name: HashMap<String, TokenId>,
    /// identifier → entry; `entries[i]` holds identifier `i + 1`
    entries: Vec<Entry>,
}

impl RegistryState {
    fn next_id(&self) -> TokenId {
        self.entries.last().map_or(TokenId::FIRST, |e| e.id.next())
    }

    fn get(&self, id: TokenId) -> Option<&Entry> {
        let idx = id.get().checked_sub(1)?;
        self.entries.get(usize::try_from(idx).ok()?)
    }
}

/// In-memory [`NameRegistry`] guarded by a single `RwLock`.
///
/// Writers are serialized; readers share the lock and always see a
/// consistent pair of indexes.
#[derive(Default)]
pub struct MemoryRegistry {
    state: RwLock<RegistryState>,
}

impl MemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from a snapshot produced by [`MemoryRegistry::entries`].
    ///
    /// Rejects snapshots whose identifiers are not `1..=n` in order, whose
    /// names repeat or are empty, or whose pointers do not match their names.
    pub fn from_entries(entries: Vec<Entry>) -> Result<Self, RegistryError> {
        let mut state = RegistryState::default();
        for entry in entries {
            let expected = state.next_id();
            if entry.id != expected {
                return Err(RegistryError::InvalidSnapshot(format!(
                    "expected identifier {expected}, found {}",
                    entry.id
                )));
            }
            if entry.name.is_empty() {
                return Err(RegistryError::InvalidSnapshot(format!(
                    "entry {} has an empty name",
                    entry.id
                )));
            }
            if entry.content != content_pointer(&entry.name) {
                return Err(RegistryError::InvalidSnapshot(format!(
                    "entry {} points at {} instead of its name",
                    entry.id, entry.content
                )));
            }
            if state.ids_by_name.contains_key(&entry.name) {
                return Err(RegistryError::InvalidSnapshot(format!(
                    "name {:?} appears more than once",
                    entry.name
                )));
            }
            state.ids_by_name.insert(entry.name.clone(), entry.id);
            state.entries.push(entry);
        }
        tracing::debug!(entries = state.entries.len(), "registry restored from snapshot");
        Ok(Self {
            state: RwLock::new(state),
        })
    }

    /// Load a JSON snapshot: `[{ "id": 1, "name": "...", "owner": "0x...", "content": "ipfs://..." }, ...]`.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let entries: Vec<Entry> = serde_json::from_str(json)
            .map_err(|e| RegistryError::InvalidSnapshot(e.to_string()))?;
        Self::from_entries(entries)
    }

    /// All entries in identifier order.
    pub fn entries(&self) -> Vec<Entry> {
        self.read().entries.clone()
    }

    /// Serialize all entries as a JSON array.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.read().entries)
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NameRegistry for MemoryRegistry {
    fn register(&self, owner: Address, name: &str) -> Result<TokenId, RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if owner.is_zero() {
            return Err(RegistryError::ZeroOwner);
        }

        let mut state = self.write();
        if state.ids_by_name.contains_key(name) {
            tracing::debug!(name, "rejected duplicate registration");
            return Err(RegistryError::DuplicateName {
                name: name.to_string(),
            });
        }

        let id = state.next_id();
        state.ids_by_name.insert(name.to_string(), id);
        state.entries.push(Entry::new(id, name.to_string(), owner));
        tracing::debug!(%id, name, %owner, "registered");
        Ok(id)
    }

    fn entry(&self, id: TokenId) -> Result<Entry, RegistryError> {
        self.read()
            .get(id)
            .cloned()
            .ok_or(RegistryError::NotFound(Lookup::Id(id)))
    }

    fn identifier_of(&self, name: &str) -> Result<TokenId, RegistryError> {
        self.read()
            .ids_by_name
            .get(name)
            .copied()
            .ok_or_else(|| RegistryError::NotFound(Lookup::Name(name.to_string())))
    }

    fn total_supply(&self) -> u64 {
        self.read().entries.len() as u64
    }

    fn balance_of(&self, owner: &Address) -> u64 {
        self.read()
            .entries
            .iter()
            .filter(|e| &e.owner == owner)
            .count() as u64
    }
}

impl std::fmt::Debug for MemoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRegistry")
            .field("total_supply", &self.total_supply())
            .finish()
    }
}
