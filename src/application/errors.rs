//! Application layer errors

use thiserror::Error;

use crate::domain::entities::MAX_COOLDOWN;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Command(#[from] CommandError),

    #[error("{0}")]
    Module(#[from] ModuleError),

    #[error("Chat error: {0}")]
    Chat(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Command registry and execution errors
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("invalid command name '{0}'")]
    InvalidName(String),

    #[error("invalid cooldown {0}, must be between 0 and {max} seconds", max = MAX_COOLDOWN)]
    InvalidCooldown(i64),

    #[error("unknown command field '{0}'")]
    UnknownField(String),

    #[error("invalid value '{value}' for field '{field}'")]
    InvalidValue { field: String, value: String },

    #[error("command {0} does not exist")]
    NotFound(String),

    #[error(transparent)]
    Module(#[from] ModuleError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Module lifecycle and invocation errors
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("module {0} does not exist")]
    NotFound(String),

    #[error("module {0} has no module entry point")]
    Invalid(String),

    #[error("module {0} is not loaded")]
    NotLoaded(String),

    #[error("module {0} has faulted")]
    Faulted(String),

    #[error("module {module} failed: {reason}")]
    Failed { module: String, reason: String },

    #[error("module config error: {0}")]
    Storage(#[from] StorageError),
}

impl ModuleError {
    pub fn failed(module: impl Into<String>, reason: impl ToString) -> Self {
        ModuleError::Failed {
            module: module.into(),
            reason: reason.to_string(),
        }
    }
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Lock poisoned: {0}")]
    Poisoned(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
