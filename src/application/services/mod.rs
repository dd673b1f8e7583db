//! Application services - command registry and sessions

pub mod commands_handler;
pub mod session;

pub use commands_handler::{Clock, CommandOutput, CommandsHandler, SuppressReason};
pub use session::{Session, SessionBuilder};
