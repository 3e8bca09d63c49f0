// ABOUTME: Local device persistent key-value storage for keys and anonymous identifiers
// ABOUTME: In-memory and file-backed implementations of the DeviceStorage seam
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

//! Local device persistent storage
//!
//! A small key-value string store that survives application restarts. Two
//! things live here and nowhere else: the anonymous device encryption key
//! and the anonymous identifier. Clearing this storage permanently orphans
//! any anonymous-scoped data on the server.

use crate::errors::{AppError, AppResult};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

/// Storage key under which the anonymous identifier is persisted
pub const ANONYMOUS_ID_STORAGE_KEY: &str = "sl_anonymous_id";

/// Key-value string storage surviving across application restarts
pub trait DeviceStorage: Send + Sync {
    /// Read a value, `None` if absent
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written
    fn set(&self, key: &str, value: &str) -> AppResult<()>;

    /// Remove a value; removing an absent key is not an error
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written
    fn remove(&self, key: &str) -> AppResult<()>;
}

/// Volatile in-memory device storage for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryDeviceStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryDeviceStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeviceStorage for MemoryDeviceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .expect("device storage lock poisoned")
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.values
            .write()
            .expect("device storage lock poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        self.values
            .write()
            .expect("device storage lock poisoned")
            .remove(key);
        Ok(())
    }
}

/// File-backed device storage: a single JSON object per namespace under
/// the platform data directory
pub struct FileDeviceStore {
    path: PathBuf,
    values: RwLock<HashMap<String, String>>,
}

impl FileDeviceStore {
    /// Open (or create) the store for a namespace, e.g. `solace`
    ///
    /// # Errors
    ///
    /// Returns an error if the platform data directory cannot be
    /// determined or the existing file is unreadable
    pub fn new(namespace: &str) -> AppResult<Self> {
        let base = dirs::data_dir()
            .ok_or_else(|| AppError::config("platform data directory unavailable"))?;
        Self::open(base.join("solace").join(format!("{namespace}.json")))
    }

    /// Open a store at an explicit path
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed
    pub fn open(path: PathBuf) -> AppResult<Self> {
        let values = if path.exists() {
            let raw = fs::read_to_string(&path)
                .map_err(|e| AppError::internal(format!("device storage read failed: {e}")))?;
            serde_json::from_str(&raw)
                .map_err(|e| AppError::internal(format!("device storage is corrupt: {e}")))?
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    fn flush(&self, values: &HashMap<String, String>) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::internal(format!("device storage mkdir failed: {e}")))?;
        }
        let raw = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, raw)
            .map_err(|e| AppError::internal(format!("device storage write failed: {e}")))
    }
}

impl DeviceStorage for FileDeviceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .expect("device storage lock poisoned")
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let mut values = self.values.write().expect("device storage lock poisoned");
        values.insert(key.to_string(), value.to_string());
        self.flush(&values)
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        let mut values = self.values.write().expect("device storage lock poisoned");
        values.remove(key);
        self.flush(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryDeviceStore::new();
        assert!(store.get("missing").is_none());

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").as_deref(), Some("v"));

        store.remove("k").unwrap();
        assert!(store.get("k").is_none());
        // removing twice is fine
        store.remove("k").unwrap();
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device.json");

        {
            let store = FileDeviceStore::open(path.clone()).unwrap();
            store.set(ANONYMOUS_ID_STORAGE_KEY, "abcd1234abcd1234").unwrap();
        }

        let reopened = FileDeviceStore::open(path).unwrap();
        assert_eq!(
            reopened.get(ANONYMOUS_ID_STORAGE_KEY).as_deref(),
            Some("abcd1234abcd1234")
        );
    }
}
