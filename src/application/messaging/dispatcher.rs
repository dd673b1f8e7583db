//! Message dispatcher - Routes chat lines through a session

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error};

use crate::application::errors::BotError;
use crate::application::services::Session;
use crate::domain::entities::{Author, Message};
use super::parser::MessageParser;

/// Feeds chat lines into a session and sends back whatever it replies
pub struct MessageDispatcher {
    session: Arc<Session>,
}

impl MessageDispatcher {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Process one chat line.
    ///
    /// Every loaded module sees the line first; a command is run only when
    /// the line starts with the session prefix. Errors and panics are caught
    /// here, logged, and answered with a single error reply. Returns the
    /// text sent to chat, if any.
    pub fn handle_line(&self, author: Author, text: &str) -> Option<String> {
        let mut message = MessageParser::new(self.session.prefix()).parse(author, text);

        let reply = match catch_unwind(AssertUnwindSafe(|| self.process(&mut message))) {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                error!(session = %self.session.id(), "error processing '{}': {}", message.text, e);
                Some(error_reply(&e))
            }
            Err(panic) => {
                let reason = panic_reason(panic.as_ref());
                error!(session = %self.session.id(), "panic processing '{}': {}", message.text, reason);
                Some(error_reply(&reason))
            }
        };

        if let Some(text) = &reply {
            if let Err(e) = self.session.chat().send_message(text) {
                error!(session = %self.session.id(), "failed to send reply: {}", e);
            }
        }
        reply
    }

    fn process(&self, message: &mut Message) -> Result<Option<String>, BotError> {
        self.session.dispatch_every_message(message);

        let Some(name) = message.command().map(str::to_string) else {
            return Ok(None);
        };

        let output = self.session.run(&name, message)?;
        if output.is_suppressed() {
            debug!(session = %self.session.id(), "command {} produced no reply: {:?}", name, output);
        }
        Ok(output.into_reply())
    }
}

fn error_reply(e: &dyn std::fmt::Display) -> String {
    format!("An error occurred in the processing of your request: {}.", e)
}

fn panic_reason(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "internal panic".to_string()
    }
}
