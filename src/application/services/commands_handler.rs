//! Commands handler - Validates, stores and runs a session's commands

use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::application::errors::CommandError;
use crate::application::messaging::template::{is_identifier, Template, MENTION_DELIMITER, NO_MESSAGE_SIGNAL};
use crate::domain::entities::{Command, CommandField, CommandRegistry, Message, Privilege, MAX_COOLDOWN};
use crate::plugins::ModulesHandler;

/// Source of "now" for cooldown checks
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Why a run produced nothing to send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    UnknownCommand,
    Cooldown,
    Privilege,
    /// A module vetoed the reply with the no-message signal
    Signal,
}

/// Result of running a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    Reply(String),
    Suppressed(SuppressReason),
}

impl CommandOutput {
    pub fn reply(&self) -> Option<&str> {
        match self {
            CommandOutput::Reply(text) => Some(text),
            CommandOutput::Suppressed(_) => None,
        }
    }

    pub fn into_reply(self) -> Option<String> {
        match self {
            CommandOutput::Reply(text) => Some(text),
            CommandOutput::Suppressed(_) => None,
        }
    }

    pub fn is_suppressed(&self) -> bool {
        matches!(self, CommandOutput::Suppressed(_))
    }
}

/// Command registry of one session, plus the gate-and-expand run protocol
pub struct CommandsHandler {
    commands: RwLock<CommandRegistry>,
    modules: Arc<ModulesHandler>,
    delimiter: char,
    clock: Clock,
}

impl CommandsHandler {
    pub fn new(modules: Arc<ModulesHandler>) -> Self {
        Self {
            commands: RwLock::new(CommandRegistry::new()),
            modules,
            delimiter: MENTION_DELIMITER,
            clock: Arc::new(Utc::now),
        }
    }

    /// Use `delimiter` around module mentions instead of `%`
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn modules(&self) -> &Arc<ModulesHandler> {
        &self.modules
    }

    /// Add a command, replacing any command of the same name.
    ///
    /// Every module the response mentions is loaded first; if one fails to
    /// load nothing is added.
    pub fn add(
        &self,
        name: &str,
        cooldown: i64,
        response: &str,
        privilege: Privilege,
        hidden: bool,
    ) -> Result<(), CommandError> {
        debug!(
            "adding {} (cd:{}s priv:{} hidden:{} res:{})",
            name, cooldown, privilege, hidden, response
        );

        if !is_identifier(name) {
            return Err(CommandError::InvalidName(name.to_string()));
        }
        let cooldown = checked_cooldown(cooldown)?;
        if response.is_empty() {
            warn!("command {} might have been added incorrectly: empty response?", name);
        }

        self.load_mentions(response)?;

        let command = Command::new(name, response)
            .with_cooldown(cooldown)
            .with_privilege(privilege)
            .hidden(hidden);

        if self.write()?.register(command).is_some() {
            debug!("replaced existing command {}", name);
        }
        Ok(())
    }

    /// Change one field of an existing command
    pub fn modify(&self, name: &str, field: &str, value: &str) -> Result<(), CommandError> {
        let field: CommandField = field
            .parse()
            .map_err(CommandError::UnknownField)?;

        if !self.contains(name) {
            return Err(CommandError::NotFound(name.to_string()));
        }

        let invalid = || CommandError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        };

        // Parse before taking the lock; loading modules may be slow
        let update = match field {
            CommandField::Cooldown => {
                let cooldown: i64 = value.trim().parse().map_err(|_| invalid())?;
                FieldUpdate::Cooldown(checked_cooldown(cooldown)?)
            }
            CommandField::Response => {
                self.load_mentions(value)?;
                FieldUpdate::Response(value.to_string())
            }
            CommandField::Privilege => FieldUpdate::Privilege(parse_privilege(value).ok_or_else(invalid)?),
            CommandField::Hidden => FieldUpdate::Hidden(parse_bool(value).ok_or_else(invalid)?),
        };

        let mut commands = self.write()?;
        let command = commands
            .get_mut(name)
            .ok_or_else(|| CommandError::NotFound(name.to_string()))?;
        match update {
            FieldUpdate::Cooldown(cooldown) => command.cooldown = cooldown,
            FieldUpdate::Response(response) => command.response = response,
            FieldUpdate::Privilege(privilege) => command.privilege = privilege,
            FieldUpdate::Hidden(hidden) => command.hidden = hidden,
        }

        debug!("modified {} of command {} to {}", field, name, value);
        Ok(())
    }

    /// Remove a command
    pub fn delete(&self, name: &str) -> Result<(), CommandError> {
        match self.write()?.remove(name) {
            Some(_) => {
                debug!("removed command {}", name);
                Ok(())
            }
            None => Err(CommandError::NotFound(name.to_string())),
        }
    }

    /// Move a command to a new name, replacing any command already there
    pub fn rename(&self, name: &str, new_name: &str) -> Result<(), CommandError> {
        if !is_identifier(new_name) {
            return Err(CommandError::InvalidName(new_name.to_string()));
        }

        let mut commands = self.write()?;
        let mut command = commands
            .remove(name)
            .ok_or_else(|| CommandError::NotFound(name.to_string()))?;
        command.name = new_name.to_string();
        commands.register(command);

        debug!("renamed command {} to {}", name, new_name);
        Ok(())
    }

    /// Run a command for `message`.
    ///
    /// Unknown commands, commands on cooldown and commands above the
    /// author's privilege are suppressed without error. A mention of a
    /// module that is not loaded is an error. Only a run that produces a
    /// reply starts the cooldown.
    pub fn run(&self, name: &str, message: &mut Message) -> Result<CommandOutput, CommandError> {
        let now = (self.clock)();

        let Some(command) = self.read()?.get(name).cloned() else {
            debug!("ignoring unknown command '{}' from {}", name, message.author.name);
            return Ok(CommandOutput::Suppressed(SuppressReason::UnknownCommand));
        };

        if command.on_cooldown(now) {
            debug!(
                "command {} called by {} while on cooldown ({}s left)",
                name,
                message.author.name,
                command.cooldown_remaining(now)
            );
            return Ok(CommandOutput::Suppressed(SuppressReason::Cooldown));
        }

        let privilege = message.author.privilege();
        if privilege < command.privilege {
            debug!(
                "command {} requires {} but {} is {}",
                name, command.privilege, message.author.name, privilege
            );
            return Ok(CommandOutput::Suppressed(SuppressReason::Privilege));
        }

        info!(
            "Running command '{}' from {} ({}) (args: {:?})",
            name,
            message.author.name,
            privilege,
            message.args()
        );

        let template = Template::parse_with(&command.response, self.delimiter);
        let text = template.render(|module| self.modules.run(module, message))?;

        if text.contains(NO_MESSAGE_SIGNAL) {
            debug!("command {} suppressed by module signal", name);
            return Ok(CommandOutput::Suppressed(SuppressReason::Signal));
        }

        if let Some(command) = self.write()?.get_mut(name) {
            command.last_used = Some((self.clock)());
        }

        Ok(CommandOutput::Reply(text))
    }

    pub fn get(&self, name: &str) -> Option<Command> {
        self.commands.read().ok()?.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands
            .read()
            .map(|c| c.contains(name))
            .unwrap_or(false)
    }

    /// Commands ordered by name, optionally leaving out hidden ones
    pub fn list(&self, include_hidden: bool) -> Vec<Command> {
        self.commands
            .read()
            .map(|c| {
                c.all()
                    .filter(|cmd| include_hidden || !cmd.hidden)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every command, for persistence
    pub fn snapshot(&self) -> Vec<Command> {
        self.list(true)
    }

    pub fn len(&self) -> usize {
        self.commands.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every command
    pub fn clear(&self) -> Result<(), CommandError> {
        *self.write()? = CommandRegistry::new();
        Ok(())
    }

    fn load_mentions(&self, response: &str) -> Result<(), CommandError> {
        let template = Template::parse_with(response, self.delimiter);
        for module in template.mentions() {
            if !self.modules.is_loaded(module) {
                self.modules.add(module)?;
            }
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, CommandRegistry>, CommandError> {
        self.commands
            .read()
            .map_err(|_| CommandError::Internal("command registry lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, CommandRegistry>, CommandError> {
        self.commands
            .write()
            .map_err(|_| CommandError::Internal("command registry lock poisoned".into()))
    }
}

enum FieldUpdate {
    Cooldown(u64),
    Response(String),
    Privilege(Privilege),
    Hidden(bool),
}

/// Privilege names, or a legacy mod-only flag
fn parse_privilege(value: &str) -> Option<Privilege> {
    if let Ok(privilege) = value.parse() {
        return Some(privilege);
    }
    parse_bool(value).map(|mod_only| if mod_only { Privilege::Mod } else { Privilege::User })
}

fn checked_cooldown(cooldown: i64) -> Result<u64, CommandError> {
    u64::try_from(cooldown)
        .ok()
        .filter(|c| *c <= MAX_COOLDOWN)
        .ok_or(CommandError::InvalidCooldown(cooldown))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}
