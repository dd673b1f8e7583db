//! rasbot - a chat bot whose commands are response templates that mention
//! independently loaded modules.
//!
//! A [`Session`](application::services::Session) owns one channel's command
//! registry and module registry. Chat lines go in through a
//! [`MessageDispatcher`](application::messaging::MessageDispatcher).

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod plugins;

pub use application::errors::{BotError, CommandError, ModuleError};
pub use application::messaging::{MessageDispatcher, Template, NO_MESSAGE_SIGNAL};
pub use application::services::{CommandOutput, CommandsHandler, Session, SuppressReason};
pub use domain::entities::{Author, Command, Message, Privilege};
pub use plugins::{Arity, Module, ModuleContext, ModuleFactory, ModulesHandler};
