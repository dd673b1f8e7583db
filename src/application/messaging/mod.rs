//! Message handling - parsing, templates and dispatch

pub mod dispatcher;
pub mod parser;
pub mod template;

pub use dispatcher::MessageDispatcher;
pub use parser::MessageParser;
pub use template::{Node, Template, NO_MESSAGE_SIGNAL};
