use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use kindred_types::models::ConversationId;

use crate::conversations::ConversationStore;
use crate::messages::MessageStore;

/// Conversation list refresh period while the inbox is mounted.
pub const CONVERSATION_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Message refresh period while a conversation is open.
pub const MESSAGE_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Owns the two repeating fetch tasks. Each timer ticks immediately on start,
/// then once per period; a failed fetch is logged and retried next tick.
pub struct PollingScheduler {
    conversations: ConversationStore,
    messages: MessageStore,
    conversation_period: Duration,
    message_period: Duration,
    conversation_task: Mutex<Option<JoinHandle<()>>>,
    message_task: Mutex<Option<(ConversationId, JoinHandle<()>)>>,
}

impl PollingScheduler {
    pub fn new(conversations: ConversationStore, messages: MessageStore) -> Self {
        Self::with_periods(
            conversations,
            messages,
            CONVERSATION_POLL_INTERVAL,
            MESSAGE_POLL_INTERVAL,
        )
    }

    pub fn with_periods(
        conversations: ConversationStore,
        messages: MessageStore,
        conversation_period: Duration,
        message_period: Duration,
    ) -> Self {
        Self {
            conversations,
            messages,
            conversation_period,
            message_period,
            conversation_task: Mutex::new(None),
            message_task: Mutex::new(None),
        }
    }

    /// Start the conversation timer. No-op if it is already running.
    pub fn start_conversations(&self) {
        let mut task = self.conversation_task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }

        let store = self.conversations.clone();
        let period = self.conversation_period;
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(err) = store.refresh().await {
                    warn!(%err, "conversation poll failed");
                }
            }
        }));
        debug!(period_ms = period.as_millis() as u64, "conversation polling started");
    }

    pub fn stop_conversations(&self) {
        if let Some(task) = self.conversation_task.lock().take() {
            task.abort();
            debug!("conversation polling stopped");
        }
    }

    /// Poll `conversation_id`'s messages, replacing any previous message
    /// timer. The previous task is aborted before the new one is spawned.
    pub fn start_messages(&self, conversation_id: ConversationId) {
        let mut task = self.message_task.lock();
        if let Some((previous, handle)) = task.take() {
            handle.abort();
            debug!(conversation_id = previous, "message polling stopped");
        }

        let store = self.messages.clone();
        let period = self.message_period;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(err) = store.load_for(conversation_id).await {
                    warn!(conversation_id, %err, "message poll failed");
                }
            }
        });
        *task = Some((conversation_id, handle));
        debug!(conversation_id, period_ms = period.as_millis() as u64, "message polling started");
    }

    pub fn stop_messages(&self) {
        if let Some((conversation_id, handle)) = self.message_task.lock().take() {
            handle.abort();
            debug!(conversation_id, "message polling stopped");
        }
    }

    pub fn stop_all(&self) {
        self.stop_messages();
        self.stop_conversations();
    }

    pub fn is_polling_conversations(&self) -> bool {
        self.conversation_task
            .lock()
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    pub fn polling_messages_for(&self) -> Option<ConversationId> {
        self.message_task.lock().as_ref().map(|(id, _)| *id)
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        self.stop_all();
    }
}
