//! `sample` - remembers what it was last told and counts chat lines
//!
//! Add it to a command with `r!cmd add sample %sample%` to try it out.

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::application::errors::ModuleError;
use crate::domain::entities::Message;
use crate::plugins::config::ModuleConfig;
use crate::plugins::{Arity, Module, ModuleContext};

pub struct Sample {
    ctx: ModuleContext,
    config: ModuleConfig,
    count: AtomicU64,
}

pub fn create(ctx: ModuleContext) -> Result<Arc<dyn Module>, ModuleError> {
    let config = ctx.load_config(json!({ "savedmessage": "" }))?;
    Ok(Arc::new(Sample {
        ctx,
        config,
        count: AtomicU64::new(0),
    }))
}

#[async_trait]
impl Module for Sample {
    fn name(&self) -> &str {
        self.ctx.name()
    }

    fn help(&self) -> String {
        "Sample module! Usage: sample <message?>".to_string()
    }

    fn arity(&self) -> Arity {
        Arity::All
    }

    fn main(&self, message: &Message, args: Vec<String>) -> Result<String, ModuleError> {
        let last_time = self.config.get_as::<String>("savedmessage").unwrap_or_default();
        self.config.set("savedmessage", args.join(" "))?;

        let author = &message.author;
        Ok(format!(
            "@{} ({}, {}), {} messages have been sent so far, and last time you also said '{}'.",
            author.name,
            author.id,
            author.privilege(),
            self.count.load(Ordering::Relaxed),
            last_time
        ))
    }

    fn on_every_message(&self, _message: &Message) -> Result<(), ModuleError> {
        self.count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::errors::BotError;
    use crate::domain::entities::Author;
    use crate::domain::traits::{ChatSender, ConfigStore};
    use crate::infrastructure::storage::MemoryStore;

    struct NullChat;

    impl ChatSender for NullChat {
        fn send_message(&self, _text: &str) -> Result<(), BotError> {
            Ok(())
        }
    }

    #[test]
    fn test_sample_saves_message_and_counts() {
        let store = Arc::new(MemoryStore::new());
        let ctx = ModuleContext::new("sample", "9", store.clone(), Arc::new(NullChat));
        let sample = create(ctx).unwrap();

        let msg = Message::new(Author::new("bob", "4"), "hello");
        sample.on_every_message(&msg).unwrap();
        sample.on_every_message(&msg).unwrap();

        let first = sample.main(&msg, vec!["remember".into(), "me".into()]).unwrap();
        assert!(first.starts_with("@bob (4, User), 2 messages"));
        assert!(first.ends_with("said ''."));

        let second = sample.main(&msg, vec![]).unwrap();
        assert!(second.ends_with("said 'remember me'."));

        let stored = store.read("9/modules/sample").unwrap().unwrap();
        assert_eq!(stored["savedmessage"], serde_json::json!(""));
    }
}
