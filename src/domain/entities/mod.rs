//! Domain entities - Core business objects with no external dependencies

pub mod author;
pub mod message;
pub mod command;

pub use author::{Author, Privilege, Roles};
pub use message::{Invocation, Message};
pub use command::{Command, CommandField, CommandRegistry, DEFAULT_COOLDOWN, MAX_COOLDOWN};
