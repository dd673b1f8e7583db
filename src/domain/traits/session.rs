use crate::application::errors::BotError;
use crate::application::services::CommandsHandler;
use crate::plugins::ModulesHandler;

/// Registry access handed to management modules (help, cmd, prefix, admin)
pub trait SessionControl: Send + Sync {
    /// Session (channel) id
    fn id(&self) -> &str;

    /// Current command prefix
    fn prefix(&self) -> String;

    /// Change the command prefix and persist the channel config
    fn set_prefix(&self, prefix: &str) -> Result<(), BotError>;

    fn commands(&self) -> &CommandsHandler;

    fn modules(&self) -> &ModulesHandler;

    /// Persist the channel config (prefix, commands, always-load list)
    fn save(&self) -> Result<(), BotError>;
}
