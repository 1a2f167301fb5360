use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use kindred_api::{ApiResult, ChatApi};
use kindred_types::events::InboxEvent;
use kindred_types::models::{ConversationId, Message, MessageId};

use crate::events::EventBus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Appended locally, POST still in flight.
    Sending(Uuid),
    /// Canonical server copy.
    Sent,
    /// POST failed. Kept so the user can see what did not go out.
    Failed(Uuid),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThreadMessage {
    pub message: Message,
    pub delivery: Delivery,
}

impl ThreadMessage {
    fn sent(message: Message) -> Self {
        Self {
            message,
            delivery: Delivery::Sent,
        }
    }

    fn local_key(&self) -> Option<Uuid> {
        match self.delivery {
            Delivery::Sending(key) | Delivery::Failed(key) => Some(key),
            Delivery::Sent => None,
        }
    }
}

/// Identifies the selection a fetch was started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub conversation_id: ConversationId,
    pub generation: u64,
}

#[derive(Default)]
struct Thread {
    conversation_id: Option<ConversationId>,
    generation: u64,
    entries: Vec<ThreadMessage>,
    loading: bool,
    /// Ids confirmed by a send response that no listing has carried yet.
    awaiting_echo: HashSet<MessageId>,
}

impl Thread {
    fn ticket(&self) -> Option<LoadTicket> {
        self.conversation_id.map(|conversation_id| LoadTicket {
            conversation_id,
            generation: self.generation,
        })
    }

    fn contains_id(&self, id: MessageId) -> bool {
        self.entries.iter().any(|e| e.message.id == Some(id))
    }
}

/// Message list of the currently selected conversation.
#[derive(Clone)]
pub struct MessageStore {
    inner: Arc<MessageStoreInner>,
}

struct MessageStoreInner {
    api: Arc<dyn ChatApi>,
    events: EventBus,
    thread: RwLock<Thread>,
}

impl MessageStore {
    pub fn new(api: Arc<dyn ChatApi>, events: EventBus) -> Self {
        Self {
            inner: Arc::new(MessageStoreInner {
                api,
                events,
                thread: RwLock::new(Thread::default()),
            }),
        }
    }

    /// Switch the thread to `conversation_id` (or to nothing). Always starts
    /// a new generation so responses fetched for the previous selection are
    /// discarded.
    pub async fn select(&self, conversation_id: Option<ConversationId>) -> Option<LoadTicket> {
        let mut thread = self.inner.thread.write().await;
        thread.generation += 1;
        thread.conversation_id = conversation_id;
        thread.entries.clear();
        thread.awaiting_echo.clear();
        thread.loading = conversation_id.is_some();
        thread.ticket()
    }

    /// Fetch the full list for `conversation_id` if it is the open thread.
    /// Never changes the selection; a call for any other conversation is a
    /// no-op returning `Ok(false)`. Returns whether the result was applied.
    pub async fn load_for(&self, conversation_id: ConversationId) -> ApiResult<bool> {
        let current = self.inner.thread.read().await.ticket();
        let ticket = match current {
            Some(ticket) if ticket.conversation_id == conversation_id => ticket,
            _ => {
                debug!(conversation_id, "skipping message load, conversation not open");
                return Ok(false);
            }
        };

        match self.inner.api.list_messages(conversation_id).await {
            Ok(listing) => Ok(self.apply(ticket, listing).await),
            Err(err) => {
                let mut thread = self.inner.thread.write().await;
                if thread.generation == ticket.generation {
                    thread.loading = false;
                }
                Err(err)
            }
        }
    }

    /// Apply a listing fetched under `ticket`. Stale tickets are ignored.
    pub async fn apply(&self, ticket: LoadTicket, listing: Vec<Message>) -> bool {
        let count = {
            let mut thread = self.inner.thread.write().await;
            if thread.generation != ticket.generation {
                debug!(
                    conversation_id = ticket.conversation_id,
                    "discarding message listing for a superseded selection"
                );
                return false;
            }

            let listed: HashSet<MessageId> = listing.iter().filter_map(|m| m.id).collect();
            let previous = std::mem::take(&mut thread.entries);
            thread.awaiting_echo.retain(|id| !listed.contains(id));

            let mut entries: Vec<ThreadMessage> = listing.into_iter().map(ThreadMessage::sent).collect();
            for entry in previous {
                let keep = match (entry.delivery, entry.message.id) {
                    (Delivery::Sent, Some(id)) => thread.awaiting_echo.contains(&id),
                    (Delivery::Sent, None) => false,
                    _ => true,
                };
                if keep {
                    entries.push(entry);
                }
            }

            thread.entries = entries;
            thread.loading = false;
            thread.entries.len()
        };

        self.inner.events.emit(InboxEvent::MessagesUpdated {
            conversation_id: ticket.conversation_id,
            count,
        });
        true
    }

    /// Show a message before the server confirms it. Returns the local key,
    /// or `None` when `conversation_id` is no longer the open thread.
    pub async fn append_optimistic(&self, conversation_id: ConversationId, message: Message) -> Option<Uuid> {
        let key = Uuid::new_v4();
        let count = {
            let mut thread = self.inner.thread.write().await;
            if thread.conversation_id != Some(conversation_id) {
                return None;
            }
            thread.entries.push(ThreadMessage {
                message,
                delivery: Delivery::Sending(key),
            });
            thread.entries.len()
        };
        self.inner
            .events
            .emit(InboxEvent::MessagesUpdated { conversation_id, count });
        Some(key)
    }

    /// Replace the optimistic entry `key` with the server's copy. If a poll
    /// already brought that copy in, the optimistic entry is just dropped.
    pub async fn confirm(&self, key: Uuid, confirmed: Message) -> bool {
        let (conversation_id, count) = {
            let mut thread = self.inner.thread.write().await;
            let Some(idx) = thread.entries.iter().position(|e| e.local_key() == Some(key)) else {
                return false;
            };

            match confirmed.id {
                Some(id) if thread.contains_id(id) => {
                    thread.entries.remove(idx);
                }
                Some(id) => {
                    thread.awaiting_echo.insert(id);
                    thread.entries[idx] = ThreadMessage::sent(confirmed);
                }
                None => thread.entries[idx] = ThreadMessage::sent(confirmed),
            }

            match thread.conversation_id {
                Some(conversation_id) => (conversation_id, thread.entries.len()),
                None => return true,
            }
        };
        self.inner
            .events
            .emit(InboxEvent::MessagesUpdated { conversation_id, count });
        true
    }

    pub async fn mark_failed(&self, key: Uuid) -> bool {
        let (conversation_id, count) = {
            let mut thread = self.inner.thread.write().await;
            let Some(entry) = thread.entries.iter_mut().find(|e| e.local_key() == Some(key)) else {
                return false;
            };
            entry.delivery = Delivery::Failed(key);
            match thread.conversation_id {
                Some(conversation_id) => (conversation_id, thread.entries.len()),
                None => return true,
            }
        };
        self.inner
            .events
            .emit(InboxEvent::MessagesUpdated { conversation_id, count });
        true
    }

    pub async fn conversation_id(&self) -> Option<ConversationId> {
        self.inner.thread.read().await.conversation_id
    }

    pub async fn is_loading(&self) -> bool {
        self.inner.thread.read().await.loading
    }

    pub async fn entries(&self) -> Vec<ThreadMessage> {
        self.inner.thread.read().await.entries.clone()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.inner
            .thread
            .read()
            .await
            .entries
            .iter()
            .map(|e| e.message.clone())
            .collect()
    }
}
