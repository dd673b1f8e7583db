//! `target` - a mentioned user, falling back to the caller

use async_trait::async_trait;
use std::sync::Arc;

use crate::application::errors::ModuleError;
use crate::domain::entities::Message;
use crate::plugins::{Arity, Module, ModuleContext};

pub struct Target {
    name: String,
}

pub fn create(ctx: ModuleContext) -> Result<Arc<dyn Module>, ModuleError> {
    Ok(Arc::new(Target {
        name: ctx.name().to_string(),
    }))
}

#[async_trait]
impl Module for Target {
    fn name(&self) -> &str {
        &self.name
    }

    fn help(&self) -> String {
        "Returns a mentioned user. If no user is mentioned, returns the caller.".to_string()
    }

    fn arity(&self) -> Arity {
        Arity::Exactly(1)
    }

    fn main(&self, message: &Message, args: Vec<String>) -> Result<String, ModuleError> {
        match args.first() {
            Some(user) => Ok(user.strip_prefix('@').unwrap_or(user).to_string()),
            None => Ok(message.author.name.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Author;

    #[test]
    fn test_target_strips_at_sign() {
        let target = Target { name: "target".into() };
        let msg = Message::new(Author::new("bob", "1"), "r!hug @alice");

        assert_eq!(target.main(&msg, vec!["@alice".into()]).unwrap(), "alice");
        assert_eq!(target.main(&msg, vec!["carol".into()]).unwrap(), "carol");
        assert_eq!(target.main(&msg, vec![]).unwrap(), "bob");
    }
}
