//! Built-in modules, available to every session without a shared library

pub mod admin;
pub mod caller;
pub mod cmd;
pub mod counters;
pub mod help;
pub mod prefix;
pub mod sample;
pub mod target;

use super::registry::ModuleRegistry;

/// Register every built-in module factory
pub fn register_builtins(registry: &mut ModuleRegistry) {
    registry.register("admin", admin::create);
    registry.register("caller", caller::create);
    registry.register("cmd", cmd::create);
    registry.register("help", help::create);
    registry.register("msgcount", counters::create_msgcount);
    registry.register("prefix", prefix::create);
    registry.register("sample", sample::create);
    registry.register("seccount", counters::create_seccount);
    registry.register("target", target::create);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_builtins_registered() {
        let registry = ModuleRegistry::with_builtins();
        assert_eq!(
            registry.names(),
            vec!["admin", "caller", "cmd", "help", "msgcount", "prefix", "sample", "seccount", "target"]
        );
    }
}
