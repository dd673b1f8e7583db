//! Module registry - Maps module names to their constructors

use std::collections::HashMap;
use std::sync::Arc;

use super::trait_def::ModuleFactory;

/// Static registry of module factories, selected at runtime by name
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    factories: HashMap<String, Arc<dyn ModuleFactory>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in modules
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        super::builtin::register_builtins(&mut registry);
        registry
    }

    /// Register a factory under `name`, replacing any previous one
    pub fn register<F: ModuleFactory + 'static>(&mut self, name: impl Into<String>, factory: F) {
        let name = name.into();
        tracing::debug!("Registering module factory: {}", name);
        self.factories.insert(name, Arc::new(factory));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ModuleFactory>> {
        self.factories.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
