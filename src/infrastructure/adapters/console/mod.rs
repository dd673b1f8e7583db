//! Console adapter for development/testing

use tokio::sync::mpsc;
use crate::application::errors::BotError;
use crate::domain::entities::{Author, Privilege};
use crate::domain::traits::ChatSender;

/// Name used for console lines typed without an explicit author
pub const CONSOLE_USER: &str = "console";

/// Console chat for local development.
///
/// Lines are read as `name[@role]: text`; a line without an author is sent
/// by the console operator, who owns the channel.
pub struct ConsoleAdapter {
    channel: String,
    sender: Option<mpsc::Sender<String>>,
}

impl ConsoleAdapter {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            sender: None,
        }
    }

    /// Forward outgoing lines to `sender` instead of stdout
    pub fn with_sender(mut self, sender: mpsc::Sender<String>) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Split a console line into its author and text
    pub fn parse_line(&self, line: &str) -> Option<(Author, String)> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let Some((who, text)) = line
            .split_once(':')
            .filter(|(who, _)| !who.is_empty() && !who.contains(char::is_whitespace))
        else {
            let author = Author::new(CONSOLE_USER, CONSOLE_USER).with_privilege(Privilege::Host);
            return Some((author, line.to_string()));
        };

        let (name, privilege) = match who.split_once('@') {
            Some((name, role)) => {
                let privilege = role.parse::<Privilege>().unwrap_or_else(|e| {
                    tracing::warn!("{}, treating {} as a user", e, name);
                    Privilege::User
                });
                (name, privilege)
            }
            None => (who, Privilege::User),
        };

        let name = name.to_lowercase();
        let author = Author::new(name.clone(), name).with_privilege(privilege);
        Some((author, text.trim().to_string()))
    }
}

impl ChatSender for ConsoleAdapter {
    fn send_message(&self, text: &str) -> Result<(), BotError> {
        match &self.sender {
            Some(sender) => sender
                .try_send(text.to_string())
                .map_err(|e| BotError::Chat(format!("console channel closed: {}", e))),
            None => {
                println!("[#{}] {}", self.channel, text);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_with_role() {
        let console = ConsoleAdapter::new("test");
        let (author, text) = console.parse_line("Alice@mod: r!cmd add hi hello: world").unwrap();

        assert_eq!(author.name, "alice");
        assert_eq!(author.privilege(), Privilege::Mod);
        assert_eq!(text, "r!cmd add hi hello: world");
    }

    #[test]
    fn test_parse_line_defaults() {
        let console = ConsoleAdapter::new("test");

        let (author, _) = console.parse_line("bob: hi").unwrap();
        assert_eq!(author.privilege(), Privilege::User);

        let (author, text) = console.parse_line("r!help").unwrap();
        assert_eq!(author.name, CONSOLE_USER);
        assert_eq!(author.privilege(), Privilege::Host);
        assert_eq!(text, "r!help");

        let (author, _) = console.parse_line("eve@wizard: hi").unwrap();
        assert_eq!(author.privilege(), Privilege::User);

        assert!(console.parse_line("   ").is_none());
    }

    #[tokio::test]
    async fn test_send_through_channel() {
        let (tx, mut rx) = mpsc::channel(4);
        let console = ConsoleAdapter::new("test").with_sender(tx);

        console.send_message("hello").unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("hello"));
    }
}
