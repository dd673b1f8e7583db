//! Module loader - Dynamically loads modules from shared libraries

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use libloading::{Library, Symbol};
use once_cell::sync::Lazy;

use crate::application::errors::ModuleError;
use crate::application::messaging::template::is_identifier;
use crate::plugins::trait_def::ModuleFactory;
use super::manifest::{ModuleManifest, MANIFEST_FILE};

/// Entry point every module library must export
pub const MODULE_INIT_SYMBOL: &[u8] = b"rasbot_module_init";

/// Function signature for the module entry point
pub type ModuleInitFn = unsafe extern "C" fn() -> *mut Box<dyn ModuleFactory>;

// Libraries stay mapped for the life of the process: an aborted background
// unit may still hold module code after teardown.
static LIBRARIES: Lazy<Mutex<Vec<Library>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Export a module factory from a shared library
#[macro_export]
macro_rules! export_module {
    ($factory:expr) => {
        #[no_mangle]
        pub extern "C" fn rasbot_module_init() -> *mut Box<dyn $crate::plugins::ModuleFactory> {
            let factory: Box<dyn $crate::plugins::ModuleFactory> = Box::new($factory);
            Box::into_raw(Box::new(factory))
        }
    };
}

/// The factory exported by a module library
pub struct LoadedLibrary {
    factory: Box<dyn ModuleFactory>,
    manifest: ModuleManifest,
}

impl LoadedLibrary {
    pub fn factory(&self) -> &dyn ModuleFactory {
        self.factory.as_ref()
    }

    pub fn manifest(&self) -> &ModuleManifest {
        &self.manifest
    }
}

/// Module loader
pub struct ModuleLoader {
    module_dir: PathBuf,
}

impl ModuleLoader {
    pub fn new(module_dir: impl Into<PathBuf>) -> Self {
        Self {
            module_dir: module_dir.into(),
        }
    }

    pub fn module_dir(&self) -> &Path {
        &self.module_dir
    }

    /// Load the module library for `name` from `<module-dir>/<name>/`
    pub fn load(&self, name: &str) -> Result<LoadedLibrary, ModuleError> {
        if !is_identifier(name) {
            return Err(ModuleError::NotFound(name.to_string()));
        }

        let path = self.module_dir.join(name);
        if !path.is_dir() {
            return Err(ModuleError::NotFound(name.to_string()));
        }

        // Load manifest
        let manifest_path = path.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            tracing::warn!("Missing {} in {}", MANIFEST_FILE, path.display());
            return Err(ModuleError::Invalid(name.to_string()));
        }

        let manifest = ModuleManifest::from_file(name, &manifest_path)?;

        // Resolve library path
        let library_path = match &manifest.library {
            Some(lib) => path.join(lib),
            None => path.join(libloading::library_filename(format!("rasbot_{}", name))),
        };

        if !library_path.exists() {
            tracing::warn!("Library not found: {}", library_path.display());
            return Err(ModuleError::Invalid(name.to_string()));
        }

        // Load the library
        let library = unsafe {
            Library::new(&library_path)
                .map_err(|e| ModuleError::failed(name, format!("Failed to load library: {}", e)))?
        };

        // Get the init function
        let factory = {
            let init_fn: Symbol<ModuleInitFn> = unsafe {
                library.get(MODULE_INIT_SYMBOL).map_err(|e| {
                    tracing::warn!("{} has no entry point: {}", library_path.display(), e);
                    ModuleError::Invalid(name.to_string())
                })?
            };

            let factory_ptr = unsafe { init_fn() };
            if factory_ptr.is_null() {
                return Err(ModuleError::failed(name, "module init returned null"));
            }
            unsafe { *Box::from_raw(factory_ptr) }
        };

        tracing::info!("Loaded module library: {} v{}", manifest.name, manifest.version);

        LIBRARIES
            .lock()
            .map_err(|_| ModuleError::failed(name, "library list lock poisoned"))?
            .push(library);

        Ok(LoadedLibrary { factory, manifest })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ModuleLoader::new(dir.path());

        assert!(matches!(loader.load("ghost"), Err(ModuleError::NotFound(n)) if n == "ghost"));
    }

    #[test]
    fn test_only_plain_names_are_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let sibling = dir.path().join("sibling");
        std::fs::create_dir(&sibling).unwrap();
        std::fs::write(sibling.join(MANIFEST_FILE), "name: sibling\nversion: 0.1.0\n").unwrap();
        let loader = ModuleLoader::new(dir.path().join("modules"));

        assert!(matches!(loader.load("../sibling"), Err(ModuleError::NotFound(_))));
    }

    #[test]
    fn test_directory_without_manifest_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("empty")).unwrap();
        let loader = ModuleLoader::new(dir.path());

        assert!(matches!(loader.load("empty"), Err(ModuleError::Invalid(_))));
    }

    #[test]
    fn test_manifest_without_library_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let module_dir = dir.path().join("weather");
        std::fs::create_dir(&module_dir).unwrap();
        std::fs::write(module_dir.join(MANIFEST_FILE), "name: weather\nversion: 0.1.0\n").unwrap();
        let loader = ModuleLoader::new(dir.path());

        assert!(matches!(loader.load("weather"), Err(ModuleError::Invalid(_))));
    }

    #[test]
    fn test_unloadable_library_is_a_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let module_dir = dir.path().join("broken");
        std::fs::create_dir(&module_dir).unwrap();
        std::fs::write(
            module_dir.join(MANIFEST_FILE),
            "name: broken\nversion: 0.1.0\nlibrary: broken.so\n",
        )
        .unwrap();
        std::fs::write(module_dir.join("broken.so"), b"not a library").unwrap();
        let loader = ModuleLoader::new(dir.path());

        assert!(matches!(loader.load("broken"), Err(ModuleError::Failed { .. })));
    }
}
