//! Debug counters: `msgcount` counts chat lines, `seccount` counts seconds

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::application::errors::ModuleError;
use crate::domain::entities::Message;
use crate::plugins::{Module, ModuleContext};

/// Lines seen since the module was loaded
pub struct MessageCount {
    name: String,
    count: AtomicU64,
}

pub fn create_msgcount(ctx: ModuleContext) -> Result<Arc<dyn Module>, ModuleError> {
    Ok(Arc::new(MessageCount {
        name: ctx.name().to_string(),
        count: AtomicU64::new(0),
    }))
}

#[async_trait]
impl Module for MessageCount {
    fn name(&self) -> &str {
        &self.name
    }

    fn help(&self) -> String {
        "Shows the amount of messages since the module was loaded.".to_string()
    }

    fn main(&self, _message: &Message, _args: Vec<String>) -> Result<String, ModuleError> {
        Ok(self.count.load(Ordering::Relaxed).to_string())
    }

    fn on_every_message(&self, _message: &Message) -> Result<(), ModuleError> {
        self.count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Seconds since the module was loaded, ticked by its background unit
pub struct SecondCount {
    name: String,
    count: AtomicU64,
    tick: Duration,
}

pub fn create_seccount(ctx: ModuleContext) -> Result<Arc<dyn Module>, ModuleError> {
    Ok(Arc::new(SecondCount {
        name: ctx.name().to_string(),
        count: AtomicU64::new(0),
        tick: Duration::from_secs(1),
    }))
}

#[async_trait]
impl Module for SecondCount {
    fn name(&self) -> &str {
        &self.name
    }

    fn help(&self) -> String {
        "Shows the amount of seconds since the module was loaded.".to_string()
    }

    fn main(&self, _message: &Message, _args: Vec<String>) -> Result<String, ModuleError> {
        Ok(self.count.load(Ordering::Relaxed).to_string())
    }

    async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.tick);
        // The first tick completes immediately
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.count.fetch_add(1, Ordering::Relaxed);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::debug!(module = %self.name, "ticker stopped");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Author;

    fn message() -> Message {
        Message::new(Author::new("bob", "1"), "hi")
    }

    #[test]
    fn test_msgcount_counts_every_line() {
        let counter = MessageCount {
            name: "msgcount".into(),
            count: AtomicU64::new(0),
        };
        for _ in 0..3 {
            counter.on_every_message(&message()).unwrap();
        }
        assert_eq!(counter.main(&message(), vec![]).unwrap(), "3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_seccount_ticks_until_shutdown() {
        let counter = Arc::new(SecondCount {
            name: "seccount".into(),
            count: AtomicU64::new(0),
            tick: Duration::from_secs(1),
        });
        let (tx, rx) = watch::channel(false);
        let unit = tokio::spawn(counter.clone().run(rx));

        tokio::time::sleep(Duration::from_millis(3500)).await;
        tx.send(true).unwrap();
        unit.await.unwrap();

        assert_eq!(counter.main(&message(), vec![]).unwrap(), "3");
    }
}
