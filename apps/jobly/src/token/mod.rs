//! Persisted bearer token, the terminal analogue of browser local storage.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::errors::StorageError;

pub mod claims;

/// Storage key the token lives under.
pub const TOKEN_STORAGE_ID: &str = "jobly-token";

/// A get/set pair over one persisted token. Setting `None` removes it.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<String>;
    fn set(&self, token: Option<&str>) -> Result<(), StorageError>;
}

/// Key/value JSON file shared by everything the client persists.
/// Only `TOKEN_STORAGE_ID` is used today; other keys are preserved on write.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Replaces the file atomically so a crash never leaves half a token behind.
    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(serde_json::to_string_pretty(entries)?.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.path)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<String> {
        match self.read_all() {
            Ok(mut entries) => entries.remove(TOKEN_STORAGE_ID),
            Err(e) => {
                warn!("Ignoring unreadable storage {}: {e}", self.path.display());
                None
            }
        }
    }

    fn set(&self, token: Option<&str>) -> Result<(), StorageError> {
        // A corrupt file is overwritten rather than blocking login.
        let mut entries = self.read_all().unwrap_or_default();
        match token {
            Some(token) => {
                entries.insert(TOKEN_STORAGE_ID.to_string(), token.to_string());
            }
            None => {
                entries.remove(TOKEN_STORAGE_ID);
            }
        }
        self.write_all(&entries)?;
        debug!(
            "Token {} in {}",
            if token.is_some() { "stored" } else { "removed" },
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct MemoryTokenStore {
    token: std::sync::Mutex<Option<String>>,
}

#[cfg(test)]
impl MemoryTokenStore {
    pub fn with_token(token: &str) -> Self {
        Self {
            token: std::sync::Mutex::new(Some(token.to_string())),
        }
    }
}

#[cfg(test)]
impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }

    fn set(&self, token: Option<&str>) -> Result<(), StorageError> {
        *self.token.lock().unwrap() = token.map(str::to_string);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_has_no_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("storage.json"));
        assert_eq!(store.get(), None);
    }

    #[test]
    fn test_set_get_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");
        let store = FileTokenStore::new(&path);

        store.set(Some("abc.def.ghi")).unwrap();
        assert_eq!(store.get().as_deref(), Some("abc.def.ghi"));

        // A second handle on the same file sees the persisted token.
        assert_eq!(
            FileTokenStore::new(&path).get().as_deref(),
            Some("abc.def.ghi")
        );

        store.set(None).unwrap();
        assert_eq!(store.get(), None);
    }

    #[test]
    fn test_other_keys_survive_token_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, r#"{"theme":"dark"}"#).unwrap();

        let store = FileTokenStore::new(&path);
        store.set(Some("t.o.k")).unwrap();
        store.set(None).unwrap();

        let raw: BTreeMap<String, String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw.get("theme").map(String::as_str), Some("dark"));
        assert!(!raw.contains_key(TOKEN_STORAGE_ID));
    }

    #[test]
    fn test_corrupt_file_reads_empty_and_is_repaired() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileTokenStore::new(&path);
        assert_eq!(store.get(), None);
        store.set(Some("a.b.c")).unwrap();
        assert_eq!(store.get().as_deref(), Some("a.b.c"));
    }
}
