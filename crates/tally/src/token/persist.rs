// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable key-value media backing the token store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

/// A string key-value medium that survives process restarts.
///
/// Multi-key writes must land together: a reader never observes some keys
/// from one `set_many` and others from an earlier one.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set_many(&self, entries: &[(&str, &str)]) -> anyhow::Result<()>;
    fn remove_many(&self, keys: &[&str]) -> anyhow::Result<()>;
}

/// Process-local medium. Used in tests and when no token file is wanted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> anyhow::Result<()> {
        let mut map = self.entries.lock();
        for (k, v) in entries {
            map.insert((*k).to_owned(), (*v).to_owned());
        }
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> anyhow::Result<()> {
        let mut map = self.entries.lock();
        for k in keys {
            map.remove(*k);
        }
        Ok(())
    }
}

/// JSON-object file medium with atomic writes (write tmp + rename).
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> anyhow::Result<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Uses a unique temp filename (PID + counter) so concurrent saves from
    /// several processes never interleave bytes in a shared `.tmp` file.
    fn write_all(&self, map: &BTreeMap<String, String>) -> anyhow::Result<()> {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(map)?;
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_name = format!(
            "{}.{}.{}.tmp",
            self.path.file_name().unwrap_or_default().to_string_lossy(),
            std::process::id(),
            seq,
        );
        let tmp_path = self.path.with_file_name(tmp_name);
        std::fs::write(&tmp_path, json)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
        }
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        match self.read_all() {
            Ok(map) => map.get(key).cloned(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), err = %e, "unreadable token file");
                None
            }
        }
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock();
        // A corrupt file is replaced rather than blocking new writes.
        let mut map = self.read_all().unwrap_or_default();
        for (k, v) in entries {
            map.insert((*k).to_owned(), (*v).to_owned());
        }
        self.write_all(&map)
    }

    fn remove_many(&self, keys: &[&str]) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock();
        let mut map = self.read_all().unwrap_or_default();
        let before = map.len();
        for k in keys {
            map.remove(*k);
        }
        if map.len() == before {
            return Ok(());
        }
        self.write_all(&map)
    }
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
