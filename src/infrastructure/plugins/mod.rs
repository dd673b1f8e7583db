//! Shared-library modules
//! 
//! Modules that are not compiled into the bot live in `<modules-dir>/<name>/`
//! as a `module.yaml` manifest next to a shared library exporting
//! `rasbot_module_init` (see [`export_module!`](crate::export_module)).

pub mod loader;
pub mod manifest;

pub use loader::{LoadedLibrary, ModuleLoader, MODULE_INIT_SYMBOL};
pub use manifest::{ModuleManifest, MANIFEST_FILE};
