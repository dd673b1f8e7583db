//! `caller` - the name of whoever sent the line

use async_trait::async_trait;
use std::sync::Arc;

use crate::application::errors::ModuleError;
use crate::domain::entities::Message;
use crate::plugins::{Module, ModuleContext};

pub struct Caller {
    name: String,
}

pub fn create(ctx: ModuleContext) -> Result<Arc<dyn Module>, ModuleError> {
    Ok(Arc::new(Caller {
        name: ctx.name().to_string(),
    }))
}

#[async_trait]
impl Module for Caller {
    fn name(&self) -> &str {
        &self.name
    }

    fn help(&self) -> String {
        "Returns the name of the caller.".to_string()
    }

    fn main(&self, message: &Message, _args: Vec<String>) -> Result<String, ModuleError> {
        Ok(message.author.name.clone())
    }
}
