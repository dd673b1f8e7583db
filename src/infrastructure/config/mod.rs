//! Configuration management

pub mod channel;

pub use channel::{ChannelConfig, CommandConfig};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::application::errors::ConfigError;
use crate::application::messaging::template::{LEGACY_MENTION_DELIMITER, MENTION_DELIMITER};

/// Bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub bot: BotConfig,
    pub modules: ModulesConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub channels: Vec<ChannelEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BotConfig {
    pub name: String,
    /// Root of the per-channel and per-module config files
    pub data_dir: PathBuf,
    pub default_prefix: String,
    #[serde(default = "default_delimiter")]
    pub mention_delimiter: char,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModulesConfig {
    /// Where shared-library modules are looked up by name
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct AuthConfig {
    pub client_id: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChannelEntry {
    pub id: String,
    pub name: String,
}

fn default_delimiter() -> char {
    MENTION_DELIMITER
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                name: "rasbot".to_string(),
                data_dir: PathBuf::from("./data"),
                default_prefix: channel::DEFAULT_PREFIX.to_string(),
                mention_delimiter: MENTION_DELIMITER,
            },
            modules: ModulesConfig {
                directory: PathBuf::from("./modules"),
            },
            auth: AuthConfig::default(),
            channels: vec![ChannelEntry {
                id: "1".to_string(),
                name: "console".to_string(),
            }],
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_env() -> Self {
        // Load from environment variables
        let mut config = Config::default();

        if let Ok(prefix) = std::env::var("BOT_PREFIX") {
            config.bot.default_prefix = prefix;
        }

        if let Ok(dir) = std::env::var("BOT_DATA_DIR") {
            config.bot.data_dir = PathBuf::from(dir);
        }

        if let Ok(token) = std::env::var("BOT_TOKEN") {
            config.auth.token = Some(token);
        }

        config
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.default_prefix.is_empty() {
            return Err(ConfigError::MissingField("bot.default-prefix".into()));
        }
        if ![MENTION_DELIMITER, LEGACY_MENTION_DELIMITER].contains(&self.bot.mention_delimiter) {
            return Err(ConfigError::InvalidValue(format!(
                "mention-delimiter must be '{}' or '{}', got '{}'",
                MENTION_DELIMITER, LEGACY_MENTION_DELIMITER, self.bot.mention_delimiter
            )));
        }
        if let Some(dup) = self
            .channels
            .iter()
            .enumerate()
            .find(|(i, c)| self.channels[..*i].iter().any(|o| o.id == c.id))
        {
            return Err(ConfigError::InvalidValue(format!("duplicate channel id {}", dup.1.id)));
        }
        Ok(())
    }

    /// Channels to run, narrowed to `only` when given
    pub fn channels(&self, only: Option<&str>) -> Vec<&ChannelEntry> {
        self.channels
            .iter()
            .filter(|c| only.map_or(true, |o| c.id == o || c.name == o))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roundtrips_through_yaml() {
        let yaml = Config::default().to_yaml().unwrap();
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(config.bot.default_prefix, "r!");
        assert_eq!(config.channels.len(), 1);
    }

    #[test]
    fn test_kebab_case_and_defaults() {
        let config = Config::from_yaml(
            r#"
bot:
  name: test
  data-dir: /tmp/rasbot
  default-prefix: "!"
modules:
  directory: ./mods
channels:
  - id: "42"
    name: somechannel
"#,
        )
        .unwrap();

        assert_eq!(config.bot.mention_delimiter, '%');
        assert!(config.auth.token.is_none());
        assert_eq!(config.channels(Some("somechannel")).len(), 1);
        assert!(config.channels(Some("other")).is_empty());
    }

    #[test]
    fn test_rejects_bad_delimiter_and_duplicates() {
        let bad = r##"
bot: { name: t, data-dir: d, default-prefix: "!", mention-delimiter: "#" }
modules: { directory: m }
"##;
        assert!(matches!(Config::from_yaml(bad), Err(ConfigError::InvalidValue(_))));

        let dup = r#"
bot: { name: t, data-dir: d, default-prefix: "!" }
modules: { directory: m }
channels: [ { id: "1", name: a }, { id: "1", name: b } ]
"#;
        assert!(matches!(Config::from_yaml(dup), Err(ConfigError::InvalidValue(_))));
    }
}
