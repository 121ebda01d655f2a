//! Registry snapshot files.
//!
//! Writers hold an exclusive lock on `<snapshot>.lock` across the whole
//! load → register → save cycle, and the new snapshot replaces the old one by
//! rename, so readers see either the old file or the new one.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use canvas_registry::{Address, MemoryRegistry, NameRegistry, TokenId};
use fs2::FileExt;
use tempfile::NamedTempFile;

/// Exclusive lock on a snapshot. Released on drop.
pub struct SnapshotLock {
    _file: File,
}

impl SnapshotLock {
    /// Block until no other writer holds the lock for `path`.
    pub fn acquire(path: &Path) -> Result<Self> {
        let lock_path = lock_path(path);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("opening {}", lock_path.display()))?;
        file.lock_exclusive()
            .with_context(|| format!("locking {}", lock_path.display()))?;
        Ok(Self { _file: file })
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

/// Load a snapshot; a missing file is an empty registry.
pub fn load(path: &Path) -> Result<MemoryRegistry> {
    match fs::read_to_string(path) {
        Ok(json) => Ok(MemoryRegistry::from_json(&json)
            .with_context(|| format!("loading {}", path.display()))?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(MemoryRegistry::new()),
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}

/// Replace the snapshot at `path` with `registry`.
pub fn save(path: &Path, registry: &MemoryRegistry) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temporary file in {}", dir.display()))?;
    tmp.write_all(registry.to_json()?.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Register `name` for `owner` in the snapshot at `path`.
pub fn register(path: &Path, owner: Address, name: &str) -> Result<(TokenId, MemoryRegistry)> {
    let _lock = SnapshotLock::acquire(path)?;
    let registry = load(path)?;
    let id = registry.register(owner, name)?;
    save(path, &registry)?;
    tracing::debug!(%id, name, path = %path.display(), "snapshot updated");
    Ok((id, registry))
}
