use super::Author;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Command invocation attached to a chat line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub name: String,
    pub args: Vec<String>,
}

/// A parsed chat line
///
/// Carries a consumption cursor over the invocation arguments. Every module
/// mentioned while expanding one command takes its arguments from the front
/// of whatever is left, so consecutive mentions partition the argument list.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub author: Author,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    invocation: Option<Invocation>,
    remaining: VecDeque<String>,
}

impl Message {
    pub fn new(author: Author, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            author,
            text: text.into(),
            timestamp: Utc::now(),
            invocation: None,
            remaining: VecDeque::new(),
        }
    }

    pub fn with_command(mut self, name: impl Into<String>, args: Vec<String>) -> Self {
        self.attach_command(name, args);
        self
    }

    /// Attach the command name and arguments, resetting the cursor
    pub fn attach_command(&mut self, name: impl Into<String>, args: Vec<String>) {
        self.remaining = args.iter().cloned().collect();
        self.invocation = Some(Invocation {
            name: name.into(),
            args,
        });
    }

    pub fn command(&self) -> Option<&str> {
        self.invocation.as_ref().map(|i| i.name.as_str())
    }

    /// The full argument list as typed, regardless of consumption
    pub fn args(&self) -> &[String] {
        self.invocation
            .as_ref()
            .map(|i| i.args.as_slice())
            .unwrap_or(&[])
    }

    /// Arguments not yet consumed
    pub fn remaining(&self) -> impl Iterator<Item = &String> {
        self.remaining.iter()
    }

    pub fn remaining_len(&self) -> usize {
        self.remaining.len()
    }

    /// Take up to `amount` arguments off the front of the remaining list.
    ///
    /// A negative amount takes everything left. Returns `None` when `amount`
    /// is zero or nothing remains.
    pub fn consume(&mut self, amount: i64) -> Option<Vec<String>> {
        if amount == 0 || self.remaining.is_empty() {
            return None;
        }

        let count = if amount < 0 {
            self.remaining.len()
        } else {
            (amount as usize).min(self.remaining.len())
        };

        Some(self.remaining.drain(..count).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_with(args: &[&str]) -> Message {
        Message::new(Author::new("bob", "1"), "r!test")
            .with_command("test", args.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_consume_partitions_in_order() {
        let mut msg = message_with(&["a", "b", "c", "d"]);

        let first = msg.consume(1).unwrap();
        let second = msg.consume(2).unwrap();
        let rest = msg.consume(-1).unwrap();

        assert_eq!(first, vec!["a"]);
        assert_eq!(second, vec!["b", "c"]);
        assert_eq!(rest, vec!["d"]);
        assert_eq!(msg.consume(-1), None);
        assert_eq!(msg.args().len(), 4);
    }

    #[test]
    fn test_consume_never_exceeds_remaining() {
        let mut msg = message_with(&["x", "y"]);
        assert_eq!(msg.consume(5).unwrap(), vec!["x", "y"]);
        assert_eq!(msg.remaining_len(), 0);
    }

    #[test]
    fn test_consume_zero_is_noop() {
        let mut msg = message_with(&["x"]);
        assert_eq!(msg.consume(0), None);
        assert_eq!(msg.remaining_len(), 1);
    }

    #[test]
    fn test_consume_empty_any_amount() {
        let mut msg = Message::new(Author::new("bob", "1"), "hello");
        for n in [-3, -1, 0, 1, 7] {
            assert_eq!(msg.consume(n), None);
        }
        assert_eq!(msg.command(), None);
    }
}
