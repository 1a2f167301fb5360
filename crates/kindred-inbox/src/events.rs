use std::sync::Arc;

use tokio::sync::broadcast;

use kindred_types::events::{InboxEvent, NoticeLevel};

const EVENT_CAPACITY: usize = 256;

/// Fan-out of inbox events to every subscribed view.
#[derive(Clone)]
pub struct EventBus {
    tx: Arc<broadcast::Sender<InboxEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InboxEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Dropped silently when nobody is listening.
    pub fn emit(&self, event: InboxEvent) {
        let _ = self.tx.send(event);
    }

    pub fn notice(&self, level: NoticeLevel, text: impl Into<String>) {
        self.emit(InboxEvent::Notice {
            level,
            text: text.into(),
        });
    }

    pub fn success(&self, text: impl Into<String>) {
        self.notice(NoticeLevel::Success, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.notice(NoticeLevel::Error, text);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
