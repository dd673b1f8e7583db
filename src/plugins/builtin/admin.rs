//! `admin` - host-only module management from chat

use async_trait::async_trait;
use std::sync::Arc;

use crate::application::errors::ModuleError;
use crate::application::messaging::template::NO_MESSAGE_SIGNAL;
use crate::domain::entities::{Message, Privilege};
use crate::plugins::{Arity, Module, ModuleContext};

pub struct Admin {
    ctx: ModuleContext,
}

pub fn create(ctx: ModuleContext) -> Result<Arc<dyn Module>, ModuleError> {
    Ok(Arc::new(Admin { ctx }))
}

#[async_trait]
impl Module for Admin {
    fn name(&self) -> &str {
        self.ctx.name()
    }

    fn help(&self) -> String {
        "Loads, unloads or lists modules. Channel owner only. Usage: admin <load/unload/list> <module?>".to_string()
    }

    fn arity(&self) -> Arity {
        Arity::All
    }

    fn main(&self, message: &Message, args: Vec<String>) -> Result<String, ModuleError> {
        // Anyone else gets no reply at all
        if message.author.privilege() < Privilege::Host {
            return Ok(NO_MESSAGE_SIGNAL.to_string());
        }

        let args: Vec<String> = args.iter().map(|a| a.to_lowercase()).collect();
        let Some(action) = args.first() else {
            return Ok(NO_MESSAGE_SIGNAL.to_string());
        };

        let session = self.ctx.session()?;
        let modules = session.modules();

        match (action.as_str(), args.get(1)) {
            ("list" | "ls", _) => Ok(format!("loaded modules: {}", modules.names().join(", "))),
            ("import" | "load", Some(module)) => {
                modules.add(module)?;
                Ok(format!("imported {}", module))
            }
            ("unimport" | "unload", Some(module)) => {
                modules.delete(module);
                Ok(format!("unimported {}", module))
            }
            ("state", Some(module)) => Ok(match modules.state(module) {
                Some(state) => format!("{} is {}", module, state),
                None => format!("{} is not loaded", module),
            }),
            ("import" | "load" | "unimport" | "unload" | "state", None) => {
                Ok("Usage: admin <load/unload/state> <module>".to_string())
            }
            _ => Ok(NO_MESSAGE_SIGNAL.to_string()),
        }
    }
}
