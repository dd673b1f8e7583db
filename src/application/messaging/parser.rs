//! Message parser - Turns raw chat lines into structured messages

use crate::domain::entities::{Author, Message};

/// Invisible tag some clients append to defeat duplicate-message filters
pub const INVISIBLE_TAG: char = '\u{E0000}';

/// Parses incoming lines into Message objects
pub struct MessageParser {
    command_prefix: String,
}

impl MessageParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            command_prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.command_prefix
    }

    /// Parse a chat line.
    ///
    /// A line starting with the prefix immediately followed by a name gets
    /// that name (lowercased) and its whitespace-separated arguments
    /// attached as a command.
    pub fn parse(&self, author: Author, text: &str) -> Message {
        let text = Self::clean(text);
        let mut message = Message::new(author, text.clone());

        if let Some((name, args)) = self.split_command(&text) {
            message.attach_command(name, args);
        }
        message
    }

    /// Strip the invisible tag and the space clients put before it
    pub fn clean(text: &str) -> String {
        text.replace(&format!(" {}", INVISIBLE_TAG), "")
            .replace(INVISIBLE_TAG, "")
            .trim_end()
            .to_string()
    }

    fn split_command(&self, text: &str) -> Option<(String, Vec<String>)> {
        let rest = text.strip_prefix(self.command_prefix.as_str())?;
        if rest.starts_with(char::is_whitespace) {
            return None;
        }

        let mut parts = rest.split_whitespace();
        let name = parts.next()?.to_lowercase();
        Some((name, parts.map(str::to_string).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bob() -> Author {
        Author::new("bob", "1")
    }

    #[test]
    fn test_parse_command() {
        let parser = MessageParser::new("r!");
        let msg = parser.parse(bob(), "r!HELP  cmd   extra");

        assert_eq!(msg.command(), Some("help"));
        assert_eq!(msg.args(), &["cmd".to_string(), "extra".to_string()]);
        assert_eq!(msg.remaining_len(), 2);
    }

    #[test]
    fn test_plain_lines_have_no_command() {
        let parser = MessageParser::new("r!");

        assert_eq!(parser.parse(bob(), "hello r!help").command(), None);
        assert_eq!(parser.parse(bob(), "r! help").command(), None);
        assert_eq!(parser.parse(bob(), "r!").command(), None);
    }

    #[test]
    fn test_invisible_tag_is_stripped() {
        let parser = MessageParser::new("r!");
        let msg = parser.parse(bob(), "r!hi there \u{E0000}");

        assert_eq!(msg.text, "r!hi there");
        assert_eq!(msg.args(), &["there".to_string()]);
    }
}
