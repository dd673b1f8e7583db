use super::Privilege;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Default cooldown applied when a command is created without one
pub const DEFAULT_COOLDOWN: u64 = 5;

/// Longest accepted cooldown, one year in seconds
pub const MAX_COOLDOWN: u64 = 365 * 24 * 60 * 60;

/// A chat command whose response is a template that may mention modules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    /// Cooldown in seconds
    pub cooldown: u64,
    pub privilege: Privilege,
    /// Hidden commands are left out of generic listings
    pub hidden: bool,
    pub response: String,
    pub last_used: Option<DateTime<Utc>>,
}

impl Command {
    pub fn new(name: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cooldown: DEFAULT_COOLDOWN,
            privilege: Privilege::User,
            hidden: false,
            response: response.into(),
            last_used: None,
        }
    }

    pub fn with_cooldown(mut self, seconds: u64) -> Self {
        self.cooldown = seconds;
        self
    }

    pub fn with_privilege(mut self, privilege: Privilege) -> Self {
        self.privilege = privilege;
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Whether the command was last used less than `cooldown` seconds before `now`
    ///
    /// A cooldown too large to represent keeps the command on cooldown.
    pub fn on_cooldown(&self, now: DateTime<Utc>) -> bool {
        let Some(last) = self.last_used else {
            return false;
        };
        match i64::try_from(self.cooldown).ok().and_then(Duration::try_seconds) {
            Some(cooldown) => now.signed_duration_since(last) < cooldown,
            None => true,
        }
    }

    /// Seconds left before the command may run again
    pub fn cooldown_remaining(&self, now: DateTime<Utc>) -> i64 {
        let cooldown = i64::try_from(self.cooldown).unwrap_or(i64::MAX);
        self.last_used
            .map(|last| cooldown.saturating_sub(now.signed_duration_since(last).num_seconds()))
            .unwrap_or(0)
            .max(0)
    }
}

/// Editable command fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandField {
    Cooldown,
    Response,
    Privilege,
    Hidden,
}

impl CommandField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandField::Cooldown => "cooldown",
            CommandField::Response => "response",
            CommandField::Privilege => "privilege",
            CommandField::Hidden => "hidden",
        }
    }
}

impl fmt::Display for CommandField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cooldown" | "cd" => Ok(CommandField::Cooldown),
            "response" | "res" => Ok(CommandField::Response),
            "privilege" | "priv" | "requires_mod" | "mod" => Ok(CommandField::Privilege),
            "hidden" | "hide" => Ok(CommandField::Hidden),
            _ => Err(s.to_string()),
        }
    }
}

/// Command registry, ordered by name
#[derive(Debug, Default, Clone)]
pub struct CommandRegistry {
    commands: BTreeMap<String, Command>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a command, returning the replaced one
    pub fn register(&mut self, command: Command) -> Option<Command> {
        self.commands.insert(command.name.clone(), command)
    }

    pub fn remove(&mut self, name: &str) -> Option<Command> {
        self.commands.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Command> {
        self.commands.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn all(&self) -> impl Iterator<Item = &Command> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_window() {
        let now = Utc::now();
        let mut cmd = Command::new("hi", "hello").with_cooldown(10);
        assert!(!cmd.on_cooldown(now));

        cmd.last_used = Some(now);
        assert!(cmd.on_cooldown(now + Duration::seconds(9)));
        assert!(!cmd.on_cooldown(now + Duration::seconds(10)));
        assert_eq!(cmd.cooldown_remaining(now + Duration::seconds(4)), 6);
    }

    #[test]
    fn test_huge_cooldown_stays_on_cooldown() {
        let now = Utc::now();
        let mut cmd = Command::new("big", "hello").with_cooldown(u64::MAX);
        cmd.last_used = Some(now);

        assert!(cmd.on_cooldown(now + Duration::days(1)));
        assert_eq!(cmd.cooldown_remaining(now), i64::MAX);

        cmd.cooldown = 10_000_000_000_000_000;
        assert!(cmd.on_cooldown(now + Duration::seconds(1)));
    }

    #[test]
    fn test_zero_cooldown_never_blocks() {
        let now = Utc::now();
        let mut cmd = Command::new("hi", "hello").with_cooldown(0);
        cmd.last_used = Some(now);
        assert!(!cmd.on_cooldown(now));
    }

    #[test]
    fn test_field_aliases() {
        assert_eq!("cd".parse::<CommandField>(), Ok(CommandField::Cooldown));
        assert_eq!("requires_mod".parse::<CommandField>(), Ok(CommandField::Privilege));
        assert!("name".parse::<CommandField>().is_err());
    }

    #[test]
    fn test_registry_upsert() {
        let mut registry = CommandRegistry::new();
        assert!(registry.register(Command::new("a", "one")).is_none());
        let old = registry.register(Command::new("a", "two")).unwrap();
        assert_eq!(old.response, "one");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("a").unwrap().response, "two");
    }
}
