//! Module system for rasbot
//!
//! Modules are named behavior units mentioned from command responses. Each
//! session owns a [`ModulesHandler`] that constructs modules from the static
//! [`ModuleRegistry`] (or a shared library), runs their hooks and tears them
//! down.

pub mod builtin;
pub mod config;
pub mod manager;
pub mod registry;
pub mod trait_def;

pub use config::ModuleConfig;
pub use manager::ModulesHandler;
pub use registry::ModuleRegistry;
pub use trait_def::{Arity, Module, ModuleContext, ModuleFactory, ModuleState, DEFAULT_HELP};
