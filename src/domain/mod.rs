//! Domain layer - Core business logic with no external dependencies
//! 
//! This layer contains:
//! - Entities: Core business objects (Author, Message, Command)
//! - Traits: Abstractions for collaborators (chat, auth, config storage, session)

pub mod entities;
pub mod traits;
