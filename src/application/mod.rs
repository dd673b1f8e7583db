//! Application layer - Use cases and business logic
//! 
//! This layer contains:
//! - Services: Command registry and bot sessions
//! - Errors: Domain-specific errors
//! - Messaging: Message parsing, response templates, dispatching

pub mod errors;
pub mod services;
pub mod messaging;
