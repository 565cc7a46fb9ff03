//! Small persistent key-value store for credentials and chat preferences.
//!
//! Values are plain strings kept in one JSON object on disk. Every mutation is
//! written through immediately, so a crash never loses a login.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{CoreError, Result};

/// Well-known keys
pub mod keys {
    pub const TOKEN: &str = "tr4ction_token";
    pub const ROLE: &str = "tr4ction_role";
    pub const STARTUP: &str = "tr4ction_startup";
    pub const FOUNDER: &str = "tr4ction_founder";
    pub const AGENT_CONFIG: &str = "tr4ction_agent_config";
}

#[derive(Debug, Clone, Default)]
pub struct KeyValueStore {
    path: Option<PathBuf>,
    entries: BTreeMap<String, String>,
    /// The file on disk could not be parsed and has not been rewritten yet
    damaged: bool,
}

impl KeyValueStore {
    /// Store that never touches the disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn open(path: &Path) -> Result<Self> {
        let mut damaged = false;
        let entries = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                // Unparsable: start empty and rewrite on the next flush
                serde_json::from_str(&content).unwrap_or_else(|e| {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable store");
                    damaged = true;
                    BTreeMap::new()
                })
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path: Some(path.to_path_buf()),
            entries,
            damaged,
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(&Config::config_dir()?.join("store.json"))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        self.entries.insert(key.to_string(), value.into());
        self.flush()
    }

    pub fn remove(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    /// Removes several keys with a single write.
    pub fn remove_all(&mut self, keys: &[&str]) -> Result<()> {
        let before = self.entries.len();
        for key in keys {
            self.entries.remove(*key);
        }
        if self.entries.len() != before || self.damaged {
            self.flush()?;
        }
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.flush()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn flush(&mut self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
        }
        let content = serde_json::to_string_pretty(&self.entries)?;
        fs::write(path, content).map_err(|e| CoreError::io(path, e))?;
        self.damaged = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_through_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut store = KeyValueStore::open(&path).unwrap();
        store.set(keys::TOKEN, "abc").unwrap();
        store.set(keys::ROLE, "founder").unwrap();

        let reopened = KeyValueStore::open(&path).unwrap();
        assert_eq!(reopened.get(keys::TOKEN), Some("abc"));
        assert_eq!(reopened.get(keys::ROLE), Some("founder"));
    }

    #[test]
    fn remove_all_only_touches_named_keys() {
        let mut store = KeyValueStore::in_memory();
        store.set(keys::TOKEN, "abc").unwrap();
        store.set(keys::AGENT_CONFIG, "{}").unwrap();

        store.remove_all(&[keys::TOKEN, keys::ROLE]).unwrap();
        assert_eq!(store.get(keys::TOKEN), None);
        assert_eq!(store.get(keys::AGENT_CONFIG), Some("{}"));

        store.clear().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn empty_file_is_an_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "").unwrap();
        assert!(KeyValueStore::open(&path).unwrap().is_empty());
    }

    #[test]
    fn truncated_file_starts_empty_and_is_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, r#"{"tr4ction_token": "abc""#).unwrap();

        let mut store = KeyValueStore::open(&path).unwrap();
        assert!(store.is_empty());

        // logout on a damaged file still leaves valid JSON behind
        store.remove_all(&[keys::TOKEN, keys::ROLE]).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(serde_json::from_str::<BTreeMap<String, String>>(&content).is_ok());

        store.set(keys::ROLE, "admin").unwrap();
        let reopened = KeyValueStore::open(&path).unwrap();
        assert_eq!(reopened.get(keys::ROLE), Some("admin"));
        assert_eq!(reopened.get(keys::TOKEN), None);
    }
}
