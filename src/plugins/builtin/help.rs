//! `help` - lists visible commands, or shows a loaded module's help

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::application::errors::ModuleError;
use crate::domain::entities::{Message, Privilege};
use crate::plugins::{Arity, Module, ModuleContext};

pub struct Help {
    ctx: ModuleContext,
}

pub fn create(ctx: ModuleContext) -> Result<Arc<dyn Module>, ModuleError> {
    Ok(Arc::new(Help { ctx }))
}

#[async_trait]
impl Module for Help {
    fn name(&self) -> &str {
        self.ctx.name()
    }

    fn help(&self) -> String {
        "Prints all available commands, or, if provided a module, prints the help message for that module. Usage: help <module?>"
            .to_string()
    }

    fn arity(&self) -> Arity {
        Arity::Exactly(1)
    }

    fn main(&self, _message: &Message, args: Vec<String>) -> Result<String, ModuleError> {
        let session = self.ctx.session()?;

        if let Some(module) = args.first() {
            let module = module.to_lowercase();
            return Ok(session
                .modules()
                .help(&module)
                .unwrap_or_else(|| format!("Module {} not found.", module)));
        }

        let mut open = Vec::new();
        let mut restricted: BTreeMap<Privilege, Vec<String>> = BTreeMap::new();
        for command in session.commands().list(false) {
            if command.privilege == Privilege::User {
                open.push(command.name);
            } else {
                restricted.entry(command.privilege).or_default().push(command.name);
            }
        }

        let mut reply = format!("Available commands are: {}", open.join(", "));
        if !restricted.is_empty() {
            let groups: Vec<String> = restricted
                .iter()
                .map(|(privilege, names)| format!("{}: {}", privilege, names.join(", ")))
                .collect();
            reply.push_str(&format!(" ({})", groups.join("; ")));
        }
        Ok(reply)
    }
}
