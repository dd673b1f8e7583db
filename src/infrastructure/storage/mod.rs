//! File-based and in-memory config storage

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::application::errors::StorageError;
use crate::domain::traits::{ConfigMap, ConfigStore};

/// JSON file store, one pretty-printed file per key under `base_path`
pub struct JsonFileStore {
    base_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let mut path = self.base_path.clone();
        for part in key.split('/').filter(|p| !p.is_empty() && *p != "..") {
            path.push(part);
        }
        path.set_extension("json");
        path
    }
}

impl ConfigStore for JsonFileStore {
    fn read(&self, key: &str) -> Result<Option<ConfigMap>, StorageError> {
        let path = self.path_for(key);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        let value: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
            StorageError::Serialization(format!(
                "{} (line {}, column {}) in {}",
                e,
                e.line(),
                e.column(),
                path.display()
            ))
        })?;

        match value {
            serde_json::Value::Object(map) => Ok(Some(map)),
            serde_json::Value::Null => Ok(None),
            other => Err(StorageError::Serialization(format!(
                "expected an object in {}, found {}",
                path.display(),
                other
            ))),
        }
    }

    fn write(&self, key: &str, value: &ConfigMap) -> Result<(), StorageError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        tracing::debug!("writing {}", path.display());
        let content = serde_json::to_string_pretty(value)?;
        std::fs::write(&path, content)?;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral sessions
#[derive(Default, Clone)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, ConfigMap>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<ConfigMap>, StorageError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StorageError::Poisoned("memory store".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &ConfigMap) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StorageError::Poisoned("memory store".to_string()))?;
        entries.insert(key.to_string(), value.clone());
        Ok(())
    }
}

/// A single config object in a store, with a declared default schema
#[derive(Clone)]
pub struct ConfigHandle {
    store: Arc<dyn ConfigStore>,
    key: String,
    defaults: ConfigMap,
}

impl ConfigHandle {
    pub fn new(store: Arc<dyn ConfigStore>, key: impl Into<String>, defaults: ConfigMap) -> Self {
        Self {
            store,
            key: key.into(),
            defaults,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn defaults(&self) -> &ConfigMap {
        &self.defaults
    }

    /// Read the object, writing the defaults when nothing is stored and
    /// backfilling any default key missing from what is stored.
    pub fn read(&self) -> Result<ConfigMap, StorageError> {
        let Some(mut data) = self.store.read(&self.key)? else {
            if !self.defaults.is_empty() {
                tracing::debug!("{} not found, writing default", self.key);
                self.store.write(&self.key, &self.defaults)?;
            }
            return Ok(self.defaults.clone());
        };

        let mut backfilled = false;
        for (key, value) in &self.defaults {
            if data.contains_key(key) {
                continue;
            }
            tracing::warn!("{} - missing default key '{}', saving default '{}'", self.key, key, value);
            data.insert(key.clone(), value.clone());
            backfilled = true;
        }

        if backfilled {
            self.store.write(&self.key, &data)?;
        }

        Ok(data)
    }

    pub fn write(&self, data: &ConfigMap) -> Result<(), StorageError> {
        self.store.write(&self.key, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defaults() -> ConfigMap {
        json!({ "greeting": "hi", "limit": 3 })
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_missing_object_writes_defaults() {
        let store = Arc::new(MemoryStore::new());
        let handle = ConfigHandle::new(store.clone(), "1/modules/x", defaults());

        let data = handle.read().unwrap();

        assert_eq!(data, defaults());
        assert_eq!(store.read("1/modules/x").unwrap(), Some(defaults()));
    }

    #[test]
    fn test_backfill_keeps_existing_keys() {
        let store = Arc::new(MemoryStore::new());
        let existing = json!({ "greeting": "yo", "extra": true }).as_object().cloned().unwrap();
        store.write("k", &existing).unwrap();

        let data = ConfigHandle::new(store.clone(), "k", defaults()).read().unwrap();

        assert_eq!(data["greeting"], json!("yo"));
        assert_eq!(data["extra"], json!(true));
        assert_eq!(data["limit"], json!(3));
        assert_eq!(store.read("k").unwrap().unwrap()["limit"], json!(3));
    }

    #[test]
    fn test_json_file_store_roundtrip_creates_folders() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        assert_eq!(store.read("42/modules/sample").unwrap(), None);
        store.write("42/modules/sample", &defaults()).unwrap();

        assert!(dir.path().join("42/modules/sample.json").exists());
        assert_eq!(store.read("42/modules/sample").unwrap(), Some(defaults()));
    }

    #[test]
    fn test_json_file_store_reports_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        let store = JsonFileStore::new(dir.path());

        assert!(matches!(store.read("bad"), Err(StorageError::Serialization(_))));
    }
}
