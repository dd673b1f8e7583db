//! Per-channel config - prefix, commands and always-load modules

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::application::errors::StorageError;
use crate::application::messaging::template::{Template, LEGACY_MENTION_DELIMITER, MENTION_DELIMITER};
use crate::domain::entities::{Command, Privilege, DEFAULT_COOLDOWN};
use crate::domain::traits::ConfigMap;

/// Prefix of a freshly created channel
pub const DEFAULT_PREFIX: &str = "r!";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChannelConfig {
    pub prefix: String,
    #[serde(default)]
    pub commands: BTreeMap<String, CommandConfig>,
    /// Modules loaded on start even when no command mentions them
    #[serde(default)]
    pub modules: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommandConfig {
    #[serde(default = "default_cooldown")]
    pub cooldown: i64,
    #[serde(default)]
    pub privilege: Privilege,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub response: String,
    /// Older configs only knew mod-only commands
    #[serde(default, skip_serializing)]
    pub requires_mod: Option<bool>,
}

fn default_cooldown() -> i64 {
    DEFAULT_COOLDOWN as i64
}

impl CommandConfig {
    pub fn new(cooldown: i64, privilege: Privilege, hidden: bool, response: impl Into<String>) -> Self {
        Self {
            cooldown,
            privilege,
            hidden,
            response: response.into(),
            requires_mod: None,
        }
    }

    /// Mentions written with the other delimiter when the response has none
    /// with `delimiter`. Such a response renders as plain text.
    pub fn foreign_mentions(&self, delimiter: char) -> Vec<String> {
        if !Template::parse_with(&self.response, delimiter).mentions().is_empty() {
            return Vec::new();
        }
        let other = if delimiter == MENTION_DELIMITER {
            LEGACY_MENTION_DELIMITER
        } else {
            MENTION_DELIMITER
        };
        Template::parse_with(&self.response, other)
            .mentions()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Privilege with the legacy mod-only flag applied
    pub fn effective_privilege(&self) -> Privilege {
        match self.requires_mod {
            Some(true) if self.privilege < Privilege::Mod => Privilege::Mod,
            _ => self.privilege,
        }
    }
}

impl From<&Command> for CommandConfig {
    fn from(command: &Command) -> Self {
        Self::new(
            command.cooldown as i64,
            command.privilege,
            command.hidden,
            command.response.clone(),
        )
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        let mut commands = BTreeMap::new();
        commands.insert(
            "help".to_string(),
            CommandConfig::new(10, Privilege::User, false, "@%caller% > %help%"),
        );
        commands.insert(
            "cmd".to_string(),
            CommandConfig::new(0, Privilege::Mod, false, "@%caller% > %cmd%"),
        );
        commands.insert(
            "prefix".to_string(),
            CommandConfig::new(0, Privilege::Mod, false, "@%caller% > %prefix%"),
        );
        commands.insert(
            "admin".to_string(),
            CommandConfig::new(0, Privilege::Mod, true, "@%caller% > %admin%"),
        );

        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            commands,
            modules: Vec::new(),
        }
    }
}

impl ChannelConfig {
    /// Build the persisted form of a running session
    pub fn from_parts<'a>(
        prefix: impl Into<String>,
        commands: impl IntoIterator<Item = &'a Command>,
        modules: Vec<String>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            commands: commands
                .into_iter()
                .map(|c| (c.name.clone(), CommandConfig::from(c)))
                .collect(),
            modules,
        }
    }

    /// Parse a stored object. A prefix nested under `meta`, as older
    /// configs keep it, is lifted to the top level.
    pub fn from_map(mut map: ConfigMap) -> Result<Self, StorageError> {
        let legacy_prefix = map
            .get("meta")
            .and_then(|m| m.get("prefix"))
            .cloned();
        if let Some(prefix) = legacy_prefix {
            map.remove("meta");
            map.insert("prefix".to_string(), prefix);
        }

        Ok(serde_json::from_value(serde_json::Value::Object(map))?)
    }

    pub fn to_map(&self) -> Result<ConfigMap, StorageError> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(StorageError::Serialization(format!(
                "channel config serialized to {}",
                other
            ))),
        }
    }
}
