use crate::application::errors::StorageError;

/// A persisted config object
pub type ConfigMap = serde_json::Map<String, serde_json::Value>;

/// Store trait - abstraction for config persistence
///
/// Keys are slash separated paths such as `<session>/modules/<name>`.
pub trait ConfigStore: Send + Sync {
    /// Read the object stored under `key`, if any
    fn read(&self, key: &str) -> Result<Option<ConfigMap>, StorageError>;

    /// Replace the object stored under `key`
    fn write(&self, key: &str, value: &ConfigMap) -> Result<(), StorageError>;
}
