//! Infrastructure layer - External concerns
//! 
//! This layer contains:
//! - Config: Application and per-channel configuration
//! - Storage: Config persistence
//! - Plugins: Shared-library module loading
//! - Adapters: Chat integrations (console)
//! - Auth: Credential providers

pub mod adapters;
pub mod auth;
pub mod config;
pub mod plugins;
pub mod storage;
