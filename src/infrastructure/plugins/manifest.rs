//! Module manifest definition

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::application::errors::ModuleError;

/// File name of the manifest inside `<modules-dir>/<name>/`
pub const MANIFEST_FILE: &str = "module.yaml";

/// Module metadata
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleManifest {
    /// Module name (required)
    pub name: String,

    /// Module version (required)
    pub version: String,

    /// Module description
    #[serde(default)]
    pub description: Option<String>,

    /// Module author
    #[serde(default)]
    pub author: Option<String>,

    /// Path to the shared library, relative to the module directory
    #[serde(default)]
    pub library: Option<PathBuf>,
}

impl ModuleManifest {
    pub fn from_file(name: &str, path: impl AsRef<std::path::Path>) -> Result<Self, ModuleError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ModuleError::failed(name, format!("Failed to read manifest: {}", e)))?;

        serde_yaml::from_str(&content)
            .map_err(|e| ModuleError::failed(name, format!("Failed to parse manifest: {}", e)))
    }
}
