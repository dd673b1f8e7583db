//! Per-module persisted config

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Arc, RwLock};

use crate::application::errors::StorageError;
use crate::domain::traits::{ConfigMap, ConfigStore};
use crate::infrastructure::storage::ConfigHandle;

/// A module's config object, cached in memory and written through on change
pub struct ModuleConfig {
    module: String,
    handle: ConfigHandle,
    data: RwLock<ConfigMap>,
}

impl ModuleConfig {
    pub fn load(
        module: impl Into<String>,
        store: Arc<dyn ConfigStore>,
        key: impl Into<String>,
        defaults: ConfigMap,
    ) -> Result<Self, StorageError> {
        let handle = ConfigHandle::new(store, key, defaults);
        let data = handle.read()?;
        Ok(Self {
            module: module.into(),
            handle,
            data: RwLock::new(data),
        })
    }

    /// Read a key. A key missing from the stored object but present in the
    /// declared defaults is restored from the default and persisted.
    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.data.read().ok()?.get(key) {
            return Some(value.clone());
        }

        let Some(default) = self.handle.defaults().get(key).cloned() else {
            tracing::warn!(module = %self.module, "attempt to read unknown config key '{}'", key);
            return None;
        };

        tracing::warn!(
            module = %self.module,
            "config missing key '{}', saving default '{}'",
            key,
            default
        );
        if let Err(e) = self.set(key, default.clone()) {
            tracing::error!(module = %self.module, "failed to persist default for '{}': {}", key, e);
        }
        Some(default)
    }

    /// Read a key and deserialize it
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(module = %self.module, "config key '{}' has unexpected type: {}", key, e);
                None
            }
        }
    }

    /// Set a key and save the whole object
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<(), StorageError> {
        let mut data = self
            .data
            .write()
            .map_err(|_| StorageError::Poisoned(self.module.clone()))?;
        data.insert(key.to_string(), value.into());
        self.handle.write(&data)
    }

    /// Re-read the object from the store
    pub fn reload(&self) -> Result<(), StorageError> {
        let fresh = self.handle.read()?;
        let mut data = self
            .data
            .write()
            .map_err(|_| StorageError::Poisoned(self.module.clone()))?;
        *data = fresh;
        Ok(())
    }

    pub fn snapshot(&self) -> ConfigMap {
        self.data.read().map(|d| d.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::MemoryStore;
    use serde_json::json;

    fn defaults() -> ConfigMap {
        json!({ "savedmessage": "", "default_cooldown": 5 })
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_missing_default_key_self_heals() {
        let store = Arc::new(MemoryStore::new());
        let config = ModuleConfig::load("sample", store.clone(), "1/modules/sample", defaults()).unwrap();

        // Simulate the key vanishing from the cached object, as after a hand edit
        config.data.write().unwrap().remove("default_cooldown");
        config.set("other", "kept").unwrap();

        assert_eq!(config.get_as::<u64>("default_cooldown"), Some(5));

        let stored = store.read("1/modules/sample").unwrap().unwrap();
        assert_eq!(stored["default_cooldown"], json!(5));
        assert_eq!(stored["other"], json!("kept"));
        assert_eq!(stored["savedmessage"], json!(""));
    }

    #[test]
    fn test_unknown_key_is_none() {
        let store = Arc::new(MemoryStore::new());
        let config = ModuleConfig::load("sample", store, "k", defaults()).unwrap();
        assert_eq!(config.get("nope"), None);
    }

    #[test]
    fn test_set_writes_through_and_reload() {
        let store = Arc::new(MemoryStore::new());
        let config = ModuleConfig::load("sample", store.clone(), "k", defaults()).unwrap();

        config.set("savedmessage", "hello there").unwrap();
        assert_eq!(store.read("k").unwrap().unwrap()["savedmessage"], json!("hello there"));

        let mut edited = store.read("k").unwrap().unwrap();
        edited.insert("savedmessage".into(), json!("edited"));
        store.write("k", &edited).unwrap();

        config.reload().unwrap();
        assert_eq!(config.get_as::<String>("savedmessage").as_deref(), Some("edited"));
    }
}
