//! Domain traits - Abstractions for collaborator implementations

pub mod chat;
pub mod session;
pub mod store;

pub use chat::{AuthProvider, ChatSender};
pub use session::SessionControl;
pub use store::{ConfigMap, ConfigStore};
