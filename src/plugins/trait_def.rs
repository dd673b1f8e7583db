//! Module trait definitions

use async_trait::async_trait;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::watch;

use crate::application::errors::{BotError, ModuleError};
use crate::domain::entities::Message;
use crate::domain::traits::{AuthProvider, ChatSender, ConfigStore, SessionControl};
use crate::plugins::config::ModuleConfig;

/// Help text for modules that do not provide their own
pub const DEFAULT_HELP: &str = "No help message available for module.";

/// How many arguments a module takes from the shared argument cursor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Arity {
    /// Takes nothing
    #[default]
    None,
    /// Takes up to N arguments
    Exactly(usize),
    /// Takes everything that is left
    All,
}

impl Arity {
    /// Integer form: 0 for none, N for exactly N, negative for all
    pub fn from_count(count: i64) -> Self {
        match count {
            0 => Arity::None,
            n if n < 0 => Arity::All,
            n => Arity::Exactly(n as usize),
        }
    }

    pub fn as_count(&self) -> i64 {
        match self {
            Arity::None => 0,
            Arity::Exactly(n) => *n as i64,
            Arity::All => -1,
        }
    }
}

/// Lifecycle of a module instance inside a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    Loading,
    Running,
    Faulted,
    Unloaded,
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModuleState::Loading => "loading",
            ModuleState::Running => "running",
            ModuleState::Faulted => "faulted",
            ModuleState::Unloaded => "unloaded",
        };
        f.write_str(s)
    }
}

/// Core module trait that all modules must implement
#[async_trait]
pub trait Module: Send + Sync {
    /// Name the module was loaded under
    fn name(&self) -> &str;

    /// Help message shown by the `help` module
    fn help(&self) -> String {
        DEFAULT_HELP.to_string()
    }

    /// Arguments to take from the message before `main` runs
    fn arity(&self) -> Arity {
        Arity::None
    }

    /// Produce the text that replaces this module's mention in a response.
    ///
    /// `args` holds the arguments taken according to `arity`.
    fn main(&self, message: &Message, args: Vec<String>) -> Result<String, ModuleError>;

    /// Called for every chat line the session receives
    fn on_every_message(&self, _message: &Message) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Background unit, spawned once when the module is loaded.
    ///
    /// Must return once `shutdown` flips to `true`. The default waits for it.
    async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        while !*shutdown.borrow() {
            if shutdown.changed().await.is_err() {
                break;
            }
        }
    }

    /// Release owned resources. Called exactly when the module is unloaded,
    /// must be idempotent and must not block.
    fn teardown(&self) {}
}

/// Constructor for a named module
pub trait ModuleFactory: Send + Sync {
    fn create(&self, ctx: ModuleContext) -> Result<Arc<dyn Module>, ModuleError>;
}

impl<F> ModuleFactory for F
where
    F: Fn(ModuleContext) -> Result<Arc<dyn Module>, ModuleError> + Send + Sync,
{
    fn create(&self, ctx: ModuleContext) -> Result<Arc<dyn Module>, ModuleError> {
        self(ctx)
    }
}

/// Capabilities handed to a module at construction
#[derive(Clone)]
pub struct ModuleContext {
    name: String,
    session_id: String,
    store: Arc<dyn ConfigStore>,
    chat: Arc<dyn ChatSender>,
    auth: Option<Arc<dyn AuthProvider>>,
    session: Option<Weak<dyn SessionControl>>,
}

impl ModuleContext {
    pub fn new(
        name: impl Into<String>,
        session_id: impl Into<String>,
        store: Arc<dyn ConfigStore>,
        chat: Arc<dyn ChatSender>,
    ) -> Self {
        Self {
            name: name.into(),
            session_id: session_id.into(),
            store,
            chat,
            auth: None,
            session: None,
        }
    }

    pub fn with_auth(mut self, auth: Option<Arc<dyn AuthProvider>>) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_session(mut self, session: Option<Weak<dyn SessionControl>>) -> Self {
        self.session = session;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Load this module's persisted config, writing `defaults` where missing
    pub fn load_config(&self, defaults: serde_json::Value) -> Result<ModuleConfig, ModuleError> {
        let defaults = match defaults {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => Default::default(),
            other => {
                return Err(ModuleError::failed(
                    &self.name,
                    format!("default config must be an object, got {}", other),
                ))
            }
        };

        let key = format!("{}/modules/{}", self.session_id, self.name);
        Ok(ModuleConfig::load(&self.name, self.store.clone(), key, defaults)?)
    }

    pub fn chat(&self) -> Arc<dyn ChatSender> {
        self.chat.clone()
    }

    /// Send text to the session's chat
    pub fn send(&self, text: &str) -> Result<(), BotError> {
        self.chat.send_message(text)
    }

    pub fn auth(&self) -> Option<Arc<dyn AuthProvider>> {
        self.auth.clone()
    }

    /// Registry access for management modules
    pub fn session(&self) -> Result<Arc<dyn SessionControl>, ModuleError> {
        self.session
            .as_ref()
            .and_then(|s| s.upgrade())
            .ok_or_else(|| ModuleError::failed(&self.name, "session is not available"))
    }

    /// Log on behalf of the module
    pub fn log(&self, level: tracing::Level, text: &str) {
        let module = self.name.as_str();
        let session = self.session_id.as_str();
        match level {
            tracing::Level::ERROR => tracing::error!(module, session, "{}", text),
            tracing::Level::WARN => tracing::warn!(module, session, "{}", text),
            tracing::Level::INFO => tracing::info!(module, session, "{}", text),
            tracing::Level::DEBUG => tracing::debug!(module, session, "{}", text),
            _ => tracing::trace!(module, session, "{}", text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_from_count() {
        assert_eq!(Arity::from_count(0), Arity::None);
        assert_eq!(Arity::from_count(2), Arity::Exactly(2));
        assert_eq!(Arity::from_count(-5), Arity::All);
        assert_eq!(Arity::All.as_count(), -1);
        assert_eq!(Arity::Exactly(3).as_count(), 3);
    }
}
