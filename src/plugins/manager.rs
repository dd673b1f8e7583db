//! Modules handler - handles module lifecycle and execution

use futures::FutureExt;
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, RwLock, Weak};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::application::errors::ModuleError;
use crate::application::messaging::template::is_identifier;
use crate::domain::entities::Message;
use crate::domain::traits::{AuthProvider, ChatSender, ConfigStore, SessionControl};
use crate::infrastructure::plugins::ModuleLoader;
use super::registry::ModuleRegistry;
use super::trait_def::{Module, ModuleContext, ModuleState};

/// A module that has been constructed and started
struct LoadedModule {
    name: String,
    instance: Arc<dyn Module>,
    state: Arc<RwLock<ModuleState>>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl LoadedModule {
    fn state(&self) -> ModuleState {
        read_state(&self.state)
    }

    /// Tear the module down and stop its background unit
    fn teardown(self) {
        set_state(&self.state, ModuleState::Unloaded);

        if catch_unwind(AssertUnwindSafe(|| self.instance.teardown())).is_err() {
            error!(module = %self.name, "teardown panicked");
        }

        let _ = self.shutdown.send(true);
        self.task.abort();
        debug!(module = %self.name, "module unloaded");
    }
}

fn read_state(state: &RwLock<ModuleState>) -> ModuleState {
    state.read().map(|s| *s).unwrap_or(ModuleState::Faulted)
}

fn set_state(state: &RwLock<ModuleState>, new: ModuleState) {
    if let Ok(mut s) = state.write() {
        *s = new;
    }
}

/// Loads, runs and tears down the modules of one session
pub struct ModulesHandler {
    session_id: String,
    registry: ModuleRegistry,
    loader: Option<ModuleLoader>,
    store: Arc<dyn ConfigStore>,
    chat: Arc<dyn ChatSender>,
    auth: Option<Arc<dyn AuthProvider>>,
    session: Option<Weak<dyn SessionControl>>,
    runtime: Handle,
    // Registration order is dispatch order
    modules: RwLock<Vec<LoadedModule>>,
    loading: Mutex<HashSet<String>>,
}

impl ModulesHandler {
    pub fn new(
        session_id: impl Into<String>,
        registry: ModuleRegistry,
        store: Arc<dyn ConfigStore>,
        chat: Arc<dyn ChatSender>,
        runtime: Handle,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            registry,
            loader: None,
            store,
            chat,
            auth: None,
            session: None,
            runtime,
            modules: RwLock::new(Vec::new()),
            loading: Mutex::new(HashSet::new()),
        }
    }

    /// Also resolve modules from shared libraries in `loader`'s directory
    pub fn with_loader(mut self, loader: ModuleLoader) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn with_auth(mut self, auth: Option<Arc<dyn AuthProvider>>) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_session(mut self, session: Weak<dyn SessionControl>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Load `name` and start its background unit. Loading a loaded module is a no-op.
    ///
    /// Only identifier names resolve; anything else is not found.
    pub fn add(&self, name: &str) -> Result<(), ModuleError> {
        if !is_identifier(name) {
            warn!(session = %self.session_id, "refusing module name {:?}", name);
            return Err(ModuleError::NotFound(name.to_string()));
        }

        if self.is_loaded(name) {
            debug!(session = %self.session_id, "module {} already loaded", name);
            return Ok(());
        }

        debug!(session = %self.session_id, "importing module {}", name);
        self.mark_loading(name, true);
        let created = self.instantiate(name);
        self.mark_loading(name, false);
        let instance = created?;

        let mut modules = self
            .modules
            .write()
            .map_err(|_| ModuleError::failed(name, "module registry lock poisoned"))?;

        // Lost a race with a concurrent add of the same name
        if modules.iter().any(|m| m.name == name) {
            drop(modules);
            debug!(session = %self.session_id, "module {} loaded concurrently, discarding duplicate", name);
            instance.teardown();
            return Ok(());
        }

        modules.push(self.start(name, instance));
        info!(session = %self.session_id, "Loaded module: {}", name);
        Ok(())
    }

    /// Tear down and remove `name`. Removing an unknown module is a no-op.
    pub fn delete(&self, name: &str) {
        let removed = match self.modules.write() {
            Ok(mut modules) => {
                let index = modules.iter().position(|m| m.name == name);
                index.map(|i| modules.remove(i))
            }
            Err(_) => {
                error!(session = %self.session_id, "module registry lock poisoned");
                None
            }
        };

        if let Some(module) = removed {
            debug!(session = %self.session_id, "unimporting module {}", name);
            module.teardown();
        }
    }

    /// Run `name`'s main hook, first taking its declared arity of arguments
    /// from `message`.
    pub fn run(&self, name: &str, message: &mut Message) -> Result<String, ModuleError> {
        let (instance, state) = self
            .lookup(name)
            .ok_or_else(|| ModuleError::NotLoaded(name.to_string()))?;

        if read_state(&state) == ModuleState::Faulted {
            return Err(ModuleError::Faulted(name.to_string()));
        }

        let arity = instance.arity();
        let args = message.consume(arity.as_count()).unwrap_or_default();
        debug!(module = %name, "consumed {} argument(s) for arity {:?}", args.len(), arity);

        let message: &Message = message;
        match catch_unwind(AssertUnwindSafe(|| instance.main(message, args))) {
            Ok(result) => result,
            Err(_) => {
                error!(module = %name, "main panicked, marking module faulted");
                set_state(&state, ModuleState::Faulted);
                Err(ModuleError::Faulted(name.to_string()))
            }
        }
    }

    /// Run every loaded module's every-message hook in registration order.
    ///
    /// Each call is isolated: an error or panic in one module is logged and
    /// the remaining modules still run.
    pub fn dispatch_every_message(&self, message: &Message) {
        let snapshot: Vec<(String, Arc<dyn Module>, Arc<RwLock<ModuleState>>)> = match self.modules.read() {
            Ok(modules) => modules
                .iter()
                .map(|m| (m.name.clone(), m.instance.clone(), m.state.clone()))
                .collect(),
            Err(_) => {
                error!(session = %self.session_id, "module registry lock poisoned");
                return;
            }
        };

        for (name, instance, state) in snapshot {
            if read_state(&state) != ModuleState::Running {
                continue;
            }

            match catch_unwind(AssertUnwindSafe(|| instance.on_every_message(message))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(module = %name, "every-message hook failed: {}", e),
                Err(_) => {
                    error!(module = %name, "every-message hook panicked, marking module faulted");
                    set_state(&state, ModuleState::Faulted);
                }
            }
        }
    }

    /// Help text of a loaded module
    pub fn help(&self, name: &str) -> Option<String> {
        self.lookup(name).map(|(instance, _)| instance.help())
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.modules
            .read()
            .map(|m| m.iter().any(|m| m.name == name))
            .unwrap_or(false)
    }

    /// State of `name`, or `None` if it is neither loading nor loaded
    pub fn state(&self, name: &str) -> Option<ModuleState> {
        if let Ok(modules) = self.modules.read() {
            if let Some(module) = modules.iter().find(|m| m.name == name) {
                return Some(module.state());
            }
        }

        let loading = self.loading.lock().map(|l| l.contains(name)).unwrap_or(false);
        loading.then_some(ModuleState::Loading)
    }

    /// Loaded module names in registration order
    pub fn names(&self) -> Vec<String> {
        self.modules
            .read()
            .map(|m| m.iter().map(|m| m.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.modules.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of background units that have not finished
    pub fn running_units(&self) -> usize {
        self.modules
            .read()
            .map(|m| m.iter().filter(|m| !m.task.is_finished()).count())
            .unwrap_or(0)
    }

    /// Force teardown of every loaded module
    pub fn shutdown(&self) {
        let drained: Vec<LoadedModule> = match self.modules.write() {
            Ok(mut modules) => modules.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        };

        if !drained.is_empty() {
            info!(session = %self.session_id, "Tearing down {} module(s)", drained.len());
        }

        for module in drained.into_iter().rev() {
            module.teardown();
        }
    }

    fn lookup(&self, name: &str) -> Option<(Arc<dyn Module>, Arc<RwLock<ModuleState>>)> {
        self.modules
            .read()
            .ok()?
            .iter()
            .find(|m| m.name == name)
            .map(|m| (m.instance.clone(), m.state.clone()))
    }

    fn mark_loading(&self, name: &str, loading: bool) {
        if let Ok(mut set) = self.loading.lock() {
            if loading {
                set.insert(name.to_string());
            } else {
                set.remove(name);
            }
        }
    }

    fn context(&self, name: &str) -> ModuleContext {
        ModuleContext::new(name, &self.session_id, self.store.clone(), self.chat.clone())
            .with_auth(self.auth.clone())
            .with_session(self.session.clone())
    }

    /// Resolve and construct `name`.
    ///
    /// Not found and missing entry point surface as-is; every other failure
    /// is logged and reported as not found.
    fn instantiate(&self, name: &str) -> Result<Arc<dyn Module>, ModuleError> {
        let ctx = self.context(name);

        let created = catch_unwind(AssertUnwindSafe(|| {
            if let Some(factory) = self.registry.get(name) {
                return factory.create(ctx);
            }

            match &self.loader {
                Some(loader) => {
                    let loaded = loader.load(name)?;
                    debug!(session = %self.session_id, "resolved {} from {}", name, loader.module_dir().display());
                    loaded.factory().create(ctx)
                }
                None => Err(ModuleError::NotFound(name.to_string())),
            }
        }));

        match created {
            Ok(Ok(module)) => Ok(module),
            Ok(Err(e @ (ModuleError::NotFound(_) | ModuleError::Invalid(_)))) => Err(e),
            Ok(Err(e)) => {
                error!(session = %self.session_id, "failed to import module {}: {}", name, e);
                Err(ModuleError::NotFound(name.to_string()))
            }
            Err(_) => {
                error!(session = %self.session_id, "failed to import module {}: constructor panicked", name);
                Err(ModuleError::NotFound(name.to_string()))
            }
        }
    }

    fn start(&self, name: &str, instance: Arc<dyn Module>) -> LoadedModule {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let state = Arc::new(RwLock::new(ModuleState::Running));

        let unit = instance.clone();
        let unit_state = state.clone();
        let unit_name = name.to_string();
        let task = self.runtime.spawn(async move {
            match AssertUnwindSafe(unit.run(shutdown_rx)).catch_unwind().await {
                Ok(()) => debug!(module = %unit_name, "background unit finished"),
                Err(_) => {
                    error!(module = %unit_name, "background unit panicked, marking module faulted");
                    set_state(&unit_state, ModuleState::Faulted);
                }
            }
        });

        LoadedModule {
            name: name.to_string(),
            instance,
            state,
            shutdown,
            task,
        }
    }
}

impl Drop for ModulesHandler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::errors::BotError;
    use crate::domain::entities::Author;
    use crate::infrastructure::storage::MemoryStore;
    use crate::plugins::trait_def::Arity;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullChat;

    impl ChatSender for NullChat {
        fn send_message(&self, _text: &str) -> Result<(), BotError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct Tracker {
        constructed: AtomicUsize,
        teardowns: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    struct Echo {
        name: String,
        arity: Arity,
        tracker: Arc<Tracker>,
    }

    #[async_trait]
    impl Module for Echo {
        fn name(&self) -> &str {
            &self.name
        }

        fn arity(&self) -> Arity {
            self.arity
        }

        fn main(&self, _message: &Message, args: Vec<String>) -> Result<String, ModuleError> {
            Ok(format!("[{}]", args.join(",")))
        }

        fn on_every_message(&self, _message: &Message) -> Result<(), ModuleError> {
            self.tracker.seen.lock().unwrap().push(self.name.clone());
            Ok(())
        }

        fn teardown(&self) {
            self.tracker.teardowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Grumpy;

    #[async_trait]
    impl Module for Grumpy {
        fn name(&self) -> &str {
            "grumpy"
        }

        fn main(&self, _message: &Message, _args: Vec<String>) -> Result<String, ModuleError> {
            panic!("grumpy always panics");
        }

        fn on_every_message(&self, _message: &Message) -> Result<(), ModuleError> {
            Err(ModuleError::failed("grumpy", "refusing"))
        }
    }

    fn handler(tracker: &Arc<Tracker>) -> ModulesHandler {
        let mut registry = ModuleRegistry::new();
        for (name, arity) in [("one", Arity::Exactly(1)), ("two", Arity::Exactly(2)), ("rest", Arity::All), ("none", Arity::None)] {
            let tracker = tracker.clone();
            registry.register(name, move |ctx: ModuleContext| -> Result<Arc<dyn Module>, ModuleError> {
                tracker.constructed.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(Echo {
                    name: ctx.name().to_string(),
                    arity,
                    tracker: tracker.clone(),
                }))
            });
        }
        registry.register("grumpy", |_ctx: ModuleContext| -> Result<Arc<dyn Module>, ModuleError> {
            Ok(Arc::new(Grumpy))
        });
        registry.register("broken", |ctx: ModuleContext| -> Result<Arc<dyn Module>, ModuleError> {
            Err(ModuleError::failed(ctx.name(), "cannot reach remote service"))
        });

        ModulesHandler::new(
            "1",
            registry,
            Arc::new(MemoryStore::new()),
            Arc::new(NullChat),
            Handle::current(),
        )
    }

    fn message(args: &[&str]) -> Message {
        Message::new(Author::new("bob", "7"), "r!x")
            .with_command("x", args.iter().map(|s| s.to_string()).collect())
    }

    #[tokio::test]
    async fn test_add_twice_loads_once() {
        let tracker = Arc::new(Tracker::default());
        let modules = handler(&tracker);

        modules.add("one").unwrap();
        modules.add("one").unwrap();

        assert_eq!(modules.len(), 1);
        assert_eq!(modules.running_units(), 1);
        assert_eq!(tracker.constructed.load(Ordering::SeqCst), 1);
        assert_eq!(modules.state("one"), Some(ModuleState::Running));
    }

    #[tokio::test]
    async fn test_unknown_module_not_found() {
        let tracker = Arc::new(Tracker::default());
        let modules = handler(&tracker);

        assert!(matches!(modules.add("nope"), Err(ModuleError::NotFound(_))));
        assert!(modules.is_empty());
    }

    #[tokio::test]
    async fn test_names_outside_the_module_dir_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let module_dir = dir.path().join("modules");
        let outside = dir.path().join("outside");
        std::fs::create_dir(&module_dir).unwrap();
        std::fs::create_dir(&outside).unwrap();
        std::fs::write(outside.join("module.yaml"), "name: outside\nversion: 0.1.0\n").unwrap();

        let tracker = Arc::new(Tracker::default());
        let modules = handler(&tracker).with_loader(ModuleLoader::new(&module_dir));

        for name in ["../outside", "outside/..", "/etc", "One", ""] {
            assert!(
                matches!(modules.add(name), Err(ModuleError::NotFound(ref n)) if n == name),
                "{:?} should not resolve",
                name
            );
        }
        assert!(modules.is_empty());
        assert_eq!(modules.state("../outside"), None);
    }

    #[tokio::test]
    async fn test_constructor_failure_reported_as_not_found() {
        let tracker = Arc::new(Tracker::default());
        let modules = handler(&tracker);

        assert!(matches!(modules.add("broken"), Err(ModuleError::NotFound(n)) if n == "broken"));
        assert_eq!(modules.state("broken"), None);
    }

    #[tokio::test]
    async fn test_arity_partitions_shared_arguments() {
        let tracker = Arc::new(Tracker::default());
        let modules = handler(&tracker);
        for name in ["one", "two", "rest", "none"] {
            modules.add(name).unwrap();
        }

        let mut msg = message(&["a", "b", "c", "d", "e"]);
        assert_eq!(modules.run("none", &mut msg).unwrap(), "[]");
        assert_eq!(modules.run("one", &mut msg).unwrap(), "[a]");
        assert_eq!(modules.run("two", &mut msg).unwrap(), "[b,c]");
        assert_eq!(modules.run("rest", &mut msg).unwrap(), "[d,e]");
        assert_eq!(modules.run("one", &mut msg).unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_run_unloaded_module_errors() {
        let tracker = Arc::new(Tracker::default());
        let modules = handler(&tracker);

        let mut msg = message(&[]);
        assert!(matches!(modules.run("one", &mut msg), Err(ModuleError::NotLoaded(_))));
    }

    #[tokio::test]
    async fn test_delete_tears_down_once() {
        let tracker = Arc::new(Tracker::default());
        let modules = handler(&tracker);
        modules.add("one").unwrap();

        modules.delete("one");
        modules.delete("one");
        modules.delete("never-loaded");

        assert!(!modules.is_loaded("one"));
        assert_eq!(tracker.teardowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispatch_isolates_failing_modules() {
        let tracker = Arc::new(Tracker::default());
        let modules = handler(&tracker);
        modules.add("one").unwrap();
        modules.add("grumpy").unwrap();
        modules.add("two").unwrap();

        modules.dispatch_every_message(&message(&[]));

        assert_eq!(*tracker.seen.lock().unwrap(), vec!["one", "two"]);
        assert_eq!(modules.state("grumpy"), Some(ModuleState::Running));
    }

    #[tokio::test]
    async fn test_panicking_main_faults_module() {
        let tracker = Arc::new(Tracker::default());
        let modules = handler(&tracker);
        modules.add("grumpy").unwrap();

        let mut msg = message(&[]);
        assert!(matches!(modules.run("grumpy", &mut msg), Err(ModuleError::Faulted(_))));
        assert_eq!(modules.state("grumpy"), Some(ModuleState::Faulted));
        assert!(matches!(modules.run("grumpy", &mut msg), Err(ModuleError::Faulted(_))));
    }

    #[tokio::test]
    async fn test_shutdown_tears_down_everything() {
        let tracker = Arc::new(Tracker::default());
        let modules = handler(&tracker);
        modules.add("one").unwrap();
        modules.add("two").unwrap();

        modules.shutdown();

        assert!(modules.is_empty());
        assert_eq!(tracker.teardowns.load(Ordering::SeqCst), 2);
    }
}
