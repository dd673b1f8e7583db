//! `prefix` - changes the session's command prefix

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use crate::application::errors::ModuleError;
use crate::domain::entities::Message;
use crate::plugins::config::ModuleConfig;
use crate::plugins::{Arity, Module, ModuleContext};

pub struct Prefix {
    ctx: ModuleContext,
    config: ModuleConfig,
}

pub fn create(ctx: ModuleContext) -> Result<Arc<dyn Module>, ModuleError> {
    let config = ctx.load_config(json!({ "default": "r!" }))?;
    Ok(Arc::new(Prefix { ctx, config }))
}

#[async_trait]
impl Module for Prefix {
    fn name(&self) -> &str {
        self.ctx.name()
    }

    fn help(&self) -> String {
        "Sets a new prefix for the bot. Usage: prefix <prefix?>".to_string()
    }

    fn arity(&self) -> Arity {
        Arity::Exactly(1)
    }

    fn main(&self, _message: &Message, args: Vec<String>) -> Result<String, ModuleError> {
        let prefix = match args.first() {
            Some(prefix) => prefix.to_lowercase(),
            None => self
                .config
                .get_as::<String>("default")
                .ok_or_else(|| ModuleError::failed(self.name(), "no default prefix configured"))?,
        };

        if prefix.starts_with('/') {
            return Ok("Prefix cannot start with reserved character /.".to_string());
        }

        self.ctx
            .session()?
            .set_prefix(&prefix)
            .map_err(|e| ModuleError::failed(self.name(), e))?;
        Ok(format!("Prefix updated to {}.", prefix))
    }
}
