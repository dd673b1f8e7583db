//! Bot session - One channel's commands, modules and persisted config

use std::sync::{Arc, RwLock, Weak};
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use crate::application::errors::{BotError, ConfigError};
use crate::application::messaging::template::MENTION_DELIMITER;
use crate::domain::entities::Message;
use crate::domain::traits::{AuthProvider, ChatSender, ConfigStore, SessionControl};
use crate::infrastructure::config::channel::{ChannelConfig, DEFAULT_PREFIX};
use crate::infrastructure::plugins::ModuleLoader;
use crate::infrastructure::storage::ConfigHandle;
use crate::plugins::{ModuleRegistry, ModulesHandler};
use super::commands_handler::{Clock, CommandOutput, CommandsHandler};

/// An isolated bot session bound to one channel
pub struct Session {
    id: String,
    prefix: RwLock<String>,
    always_load: RwLock<Vec<String>>,
    commands: CommandsHandler,
    modules: Arc<ModulesHandler>,
    config: ConfigHandle,
    chat: Arc<dyn ChatSender>,
}

impl Session {
    pub fn builder(
        id: impl Into<String>,
        store: Arc<dyn ConfigStore>,
        chat: Arc<dyn ChatSender>,
    ) -> SessionBuilder {
        SessionBuilder::new(id, store, chat)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn prefix(&self) -> String {
        self.prefix.read().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn commands(&self) -> &CommandsHandler {
        &self.commands
    }

    pub fn modules(&self) -> &Arc<ModulesHandler> {
        &self.modules
    }

    pub fn chat(&self) -> Arc<dyn ChatSender> {
        self.chat.clone()
    }

    /// Modules loaded on start regardless of commands
    pub fn always_load(&self) -> Vec<String> {
        self.always_load.read().map(|m| m.clone()).unwrap_or_default()
    }

    /// (Re)load the channel config: prefix, commands, then always-load modules.
    ///
    /// A command or module that fails to load is logged and skipped.
    pub fn reload(&self) -> Result<(), BotError> {
        info!(session = %self.id, "Reading config from {}...", self.config.key());
        let config = ChannelConfig::from_map(self.config.read()?)?;

        self.set_prefix_value(&config.prefix)?;
        info!(session = %self.id, "Prefix set as '{}'", config.prefix);

        self.commands.clear()?;
        for (name, command) in &config.commands {
            let foreign = command.foreign_mentions(self.commands.delimiter());
            if !foreign.is_empty() {
                warn!(
                    session = %self.id,
                    "command '{}' mentions {} with the wrong delimiter (expected '{}'); they will be sent as text",
                    name,
                    foreign.join(", "),
                    self.commands.delimiter()
                );
            }
            if let Err(e) = self.commands.add(
                name,
                command.cooldown,
                &command.response,
                command.effective_privilege(),
                command.hidden,
            ) {
                error!(session = %self.id, "command '{}' could not be imported: {}; ignoring...", name, e);
            }
        }
        info!(session = %self.id, "Imported {} command(s)", self.commands.len());

        for module in &config.modules {
            if self.modules.is_loaded(module) {
                continue;
            }
            if let Err(e) = self.modules.add(module) {
                error!(session = %self.id, "always-load module '{}' could not be imported: {}", module, e);
            }
        }
        if !config.modules.is_empty() {
            info!(session = %self.id, "Imported {} additional module(s)", config.modules.len());
        }

        *self
            .always_load
            .write()
            .map_err(|_| BotError::Internal("always-load list lock poisoned".into()))? = config.modules;
        Ok(())
    }

    /// Write the channel config back to the store
    pub fn save(&self) -> Result<(), BotError> {
        let commands = self.commands.snapshot();
        let config = ChannelConfig::from_parts(self.prefix(), commands.iter(), self.always_load());
        self.config.write(&config.to_map()?)?;
        debug!(session = %self.id, "saved channel config with {} command(s)", commands.len());
        Ok(())
    }

    /// Change the prefix and persist it
    pub fn set_prefix(&self, prefix: &str) -> Result<(), BotError> {
        self.set_prefix_value(prefix)?;
        self.save()
    }

    /// Run a command by name for an already-parsed message
    pub fn run(&self, name: &str, message: &mut Message) -> Result<CommandOutput, BotError> {
        Ok(self.commands.run(name, message)?)
    }

    /// Hand a chat line to every loaded module
    pub fn dispatch_every_message(&self, message: &Message) {
        self.modules.dispatch_every_message(message);
    }

    /// Force teardown of every module
    pub fn shutdown(&self) {
        info!(session = %self.id, "Shutting down session");
        self.modules.shutdown();
    }

    fn set_prefix_value(&self, prefix: &str) -> Result<(), BotError> {
        if prefix.trim().is_empty() {
            return Err(ConfigError::InvalidValue("prefix cannot be empty".into()).into());
        }
        let mut current = self
            .prefix
            .write()
            .map_err(|_| BotError::Internal("prefix lock poisoned".into()))?;
        *current = prefix.to_string();
        Ok(())
    }
}

impl SessionControl for Session {
    fn id(&self) -> &str {
        Session::id(self)
    }

    fn prefix(&self) -> String {
        Session::prefix(self)
    }

    fn set_prefix(&self, prefix: &str) -> Result<(), BotError> {
        Session::set_prefix(self, prefix)
    }

    fn commands(&self) -> &CommandsHandler {
        &self.commands
    }

    fn modules(&self) -> &ModulesHandler {
        &self.modules
    }

    fn save(&self) -> Result<(), BotError> {
        Session::save(self)
    }
}

/// Builder for [`Session`]
pub struct SessionBuilder {
    id: String,
    store: Arc<dyn ConfigStore>,
    chat: Arc<dyn ChatSender>,
    auth: Option<Arc<dyn AuthProvider>>,
    registry: ModuleRegistry,
    loader: Option<ModuleLoader>,
    delimiter: char,
    default_prefix: String,
    clock: Option<Clock>,
    runtime: Option<Handle>,
}

impl SessionBuilder {
    pub fn new(id: impl Into<String>, store: Arc<dyn ConfigStore>, chat: Arc<dyn ChatSender>) -> Self {
        Self {
            id: id.into(),
            store,
            chat,
            auth: None,
            registry: ModuleRegistry::with_builtins(),
            loader: None,
            delimiter: MENTION_DELIMITER,
            default_prefix: DEFAULT_PREFIX.to_string(),
            clock: None,
            runtime: None,
        }
    }

    pub fn auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn registry(mut self, registry: ModuleRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn loader(mut self, loader: ModuleLoader) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Prefix written to a channel that has no config yet
    pub fn default_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.default_prefix = prefix.into();
        self
    }

    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Runtime that module background units are spawned on
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Build the session and load its channel config
    pub fn build(self) -> Result<Arc<Session>, BotError> {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current()
                .map_err(|e| BotError::Internal(format!("no tokio runtime for session {}: {}", self.id, e)))?,
        };

        let defaults = ChannelConfig {
            prefix: self.default_prefix,
            ..ChannelConfig::default()
        }
        .to_map()?;
        let config = ConfigHandle::new(self.store.clone(), format!("{}/config", self.id), defaults);

        let SessionBuilder {
            id,
            store,
            chat,
            auth,
            registry,
            loader,
            delimiter,
            clock,
            ..
        } = self;

        let session = Arc::new_cyclic(|weak: &Weak<Session>| {
            let control: Weak<dyn SessionControl> = weak.clone();

            let mut modules = ModulesHandler::new(id.clone(), registry, store, chat.clone(), runtime)
                .with_auth(auth)
                .with_session(control);
            if let Some(loader) = loader {
                modules = modules.with_loader(loader);
            }
            let modules = Arc::new(modules);

            let mut commands = CommandsHandler::new(modules.clone()).with_delimiter(delimiter);
            if let Some(clock) = clock {
                commands = commands.with_clock(clock);
            }

            Session {
                id,
                prefix: RwLock::new(String::new()),
                always_load: RwLock::new(Vec::new()),
                commands,
                modules,
                config,
                chat,
            }
        });

        session.reload()?;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::traits::ConfigMap;
    use crate::infrastructure::storage::MemoryStore;
    use serde_json::json;

    struct NullChat;

    impl ChatSender for NullChat {
        fn send_message(&self, _text: &str) -> Result<(), BotError> {
            Ok(())
        }
    }

    fn object(value: serde_json::Value) -> ConfigMap {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_fresh_channel_gets_default_config() {
        let store = Arc::new(MemoryStore::new());
        let session = Session::builder("7", store.clone(), Arc::new(NullChat)).build().unwrap();

        assert_eq!(session.prefix(), "r!");
        assert!(session.commands().contains("help"));
        assert!(session.commands().get("admin").unwrap().hidden);
        assert!(session.modules().is_loaded("caller"));

        let stored = store.read("7/config").unwrap().unwrap();
        assert_eq!(stored["prefix"], json!("r!"));
    }

    #[tokio::test]
    async fn test_broken_entries_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        store
            .write(
                "7/config",
                &object(json!({
                    "prefix": "!",
                    "commands": {
                        "ok": { "cooldown": 1, "response": "%caller%" },
                        "bad": { "cooldown": 1, "response": "%does_not_exist%" },
                        "Bad Name": { "response": "x" }
                    },
                    "modules": ["msgcount", "nope"]
                })),
            )
            .unwrap();

        let session = Session::builder("7", store, Arc::new(NullChat)).build().unwrap();

        assert_eq!(session.prefix(), "!");
        assert!(session.commands().contains("ok"));
        assert!(!session.commands().contains("bad"));
        assert_eq!(session.commands().len(), 1);
        assert!(session.modules().is_loaded("msgcount"));
        assert_eq!(session.always_load(), vec!["msgcount", "nope"]);
    }

    #[tokio::test]
    async fn test_save_persists_commands_and_prefix() {
        let store = Arc::new(MemoryStore::new());
        let session = Session::builder("7", store.clone(), Arc::new(NullChat)).build().unwrap();

        session
            .commands()
            .add("hi", 3, "hello %caller%", crate::domain::entities::Privilege::User, false)
            .unwrap();
        session.set_prefix("?").unwrap();

        let stored = ChannelConfig::from_map(store.read("7/config").unwrap().unwrap()).unwrap();
        assert_eq!(stored.prefix, "?");
        assert_eq!(stored.commands["hi"].cooldown, 3);
        assert_eq!(stored.commands["hi"].response, "hello %caller%");

        assert!(session.set_prefix("  ").is_err());
        assert_eq!(session.prefix(), "?");
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = Arc::new(MemoryStore::new());
        let a = Session::builder("a", store.clone(), Arc::new(NullChat)).build().unwrap();
        let b = Session::builder("b", store, Arc::new(NullChat)).build().unwrap();

        a.commands().delete("help").unwrap();
        a.shutdown();

        assert!(b.commands().contains("help"));
        assert!(b.modules().is_loaded("help"));
        assert!(a.modules().is_empty());
    }
}
