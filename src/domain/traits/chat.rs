use std::collections::HashMap;
use crate::application::errors::BotError;

/// Outbound chat handle - the only way the engine talks back to a channel
pub trait ChatSender: Send + Sync {
    /// Send a line of text to the session's chat
    fn send_message(&self, text: &str) -> Result<(), BotError>;
}

/// Credential collaborator for modules that call the platform API
pub trait AuthProvider: Send + Sync {
    /// Headers to attach to an authenticated request
    fn auth_headers(&self) -> Result<HashMap<String, String>, BotError>;

    /// Refresh the underlying credential
    fn refresh(&self) -> Result<(), BotError>;
}
