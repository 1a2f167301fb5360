use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use kindred_api::{ApiResult, ChatApi};
use kindred_types::events::InboxEvent;
use kindred_types::models::{Conversation, ConversationId, Message, UserId};

use crate::events::EventBus;

/// Matches with no message history yet. Blocked ones are hidden.
pub fn new_matches(conversations: &[Conversation]) -> Vec<Conversation> {
    conversations
        .iter()
        .filter(|c| c.last_message.is_none() && !c.is_blocked)
        .cloned()
        .collect()
}

/// Conversations with at least one message, blocked or not.
pub fn active_chats(conversations: &[Conversation]) -> Vec<Conversation> {
    conversations
        .iter()
        .filter(|c| c.last_message.is_some())
        .cloned()
        .collect()
}

/// The viewer's conversation list, one entry per matched counterpart.
#[derive(Clone)]
pub struct ConversationStore {
    inner: Arc<ConversationStoreInner>,
}

struct ConversationStoreInner {
    api: Arc<dyn ChatApi>,
    events: EventBus,
    conversations: RwLock<Vec<Conversation>>,
}

impl ConversationStore {
    pub fn new(api: Arc<dyn ChatApi>, events: EventBus) -> Self {
        Self {
            inner: Arc::new(ConversationStoreInner {
                api,
                events,
                conversations: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Fetch the listing and replace the store with it. Whichever refresh
    /// completes last wins, including over local patches made meanwhile.
    pub async fn refresh(&self) -> ApiResult<usize> {
        let listing = self.inner.api.list_conversations().await?;
        Ok(self.replace(listing).await)
    }

    pub async fn replace(&self, listing: Vec<Conversation>) -> usize {
        let count = listing.len();
        *self.inner.conversations.write().await = listing;
        debug!(count, "conversation list replaced");
        self.inner
            .events
            .emit(InboxEvent::ConversationsUpdated { count });
        count
    }

    /// Reflect a just-sent message before the next poll picks it up.
    pub async fn patch_last_message(&self, conversation_id: ConversationId, message: Message) -> bool {
        let patched = self
            .update(conversation_id, |conv| conv.last_message = Some(message))
            .await;
        if !patched {
            debug!(conversation_id, "last message patch skipped, conversation not in store");
        }
        patched
    }

    pub async fn mark_read_locally(&self, conversation_id: ConversationId) -> bool {
        self.update(conversation_id, |conv| conv.unread_count = 0).await
    }

    /// Drop a conversation locally. The server keeps it; the next refresh
    /// brings it back flagged as blocked if it has history.
    pub async fn remove_conversation(&self, conversation_id: ConversationId) -> Option<Conversation> {
        let removed = {
            let mut conversations = self.inner.conversations.write().await;
            let idx = conversations.iter().position(|c| c.id == conversation_id)?;
            conversations.remove(idx)
        };
        self.inner
            .events
            .emit(InboxEvent::ConversationRemoved { conversation_id });
        Some(removed)
    }

    pub async fn snapshot(&self) -> Vec<Conversation> {
        self.inner.conversations.read().await.clone()
    }

    pub async fn get(&self, conversation_id: ConversationId) -> Option<Conversation> {
        self.inner
            .conversations
            .read()
            .await
            .iter()
            .find(|c| c.id == conversation_id)
            .cloned()
    }

    pub async fn find_by_counterpart(&self, user_id: UserId) -> Option<Conversation> {
        self.inner
            .conversations
            .read()
            .await
            .iter()
            .find(|c| c.other_user.user == user_id)
            .cloned()
    }

    pub async fn new_matches(&self) -> Vec<Conversation> {
        new_matches(&self.inner.conversations.read().await)
    }

    pub async fn active_chats(&self) -> Vec<Conversation> {
        active_chats(&self.inner.conversations.read().await)
    }

    pub async fn total_unread(&self) -> u32 {
        self.inner
            .conversations
            .read()
            .await
            .iter()
            .map(|c| c.unread_count)
            .sum()
    }

    async fn update<F>(&self, conversation_id: ConversationId, f: F) -> bool
    where
        F: FnOnce(&mut Conversation),
    {
        let (updated, count) = {
            let mut conversations = self.inner.conversations.write().await;
            let updated = match conversations.iter_mut().find(|c| c.id == conversation_id) {
                Some(conv) => {
                    f(conv);
                    true
                }
                None => false,
            };
            (updated, conversations.len())
        };
        if updated {
            self.inner
                .events
                .emit(InboxEvent::ConversationsUpdated { count });
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeApi, Op, conversation, message};

    fn store(api: Arc<FakeApi>) -> ConversationStore {
        ConversationStore::new(api, EventBus::new())
    }

    fn ids(conversations: &[Conversation]) -> Vec<ConversationId> {
        conversations.iter().map(|c| c.id).collect()
    }

    #[test]
    fn new_matches_and_active_chats_partition_by_history() {
        let list = vec![
            conversation(1, None, 0, false),
            conversation(2, Some("hi"), 3, false),
            conversation(3, None, 0, true),
            conversation(4, Some("bye"), 0, true),
        ];

        assert_eq!(ids(&new_matches(&list)), vec![1]);
        assert_eq!(ids(&active_chats(&list)), vec![2, 4]);

        // Blocked with no history shows up nowhere.
        assert!(!new_matches(&list).iter().any(|c| c.id == 3));
        assert!(!active_chats(&list).iter().any(|c| c.id == 3));
    }

    #[tokio::test]
    async fn refresh_replaces_wholesale() {
        let api = FakeApi::with_conversations(vec![
            conversation(1, None, 0, false),
            conversation(2, Some("hi"), 3, false),
        ]);
        let store = store(api.clone());

        assert_eq!(store.refresh().await.unwrap(), 2);
        assert_eq!(store.total_unread().await, 3);

        *api.conversations.lock() = vec![conversation(5, Some("new"), 1, false)];
        store.refresh().await.unwrap();
        assert_eq!(ids(&store.snapshot().await), vec![5]);
    }

    #[tokio::test]
    async fn refresh_failure_keeps_previous_list() {
        let api = FakeApi::with_conversations(vec![conversation(1, None, 0, false)]);
        let store = store(api.clone());
        store.refresh().await.unwrap();

        api.fail(Op::ListConversations);
        assert!(store.refresh().await.is_err());
        assert_eq!(ids(&store.snapshot().await), vec![1]);
    }

    #[tokio::test]
    async fn local_mutations() {
        let api = FakeApi::with_conversations(vec![
            conversation(1, None, 0, false),
            conversation(2, Some("hi"), 3, false),
        ]);
        let store = store(api);
        store.refresh().await.unwrap();

        assert!(store.mark_read_locally(2).await);
        assert_eq!(store.get(2).await.unwrap().unread_count, 0);

        assert!(store.patch_last_message(1, message(7, 17, "first!")).await);
        assert_eq!(ids(&store.active_chats().await), vec![1, 2]);
        assert!(store.new_matches().await.is_empty());

        assert_eq!(store.find_by_counterpart(102).await.map(|c| c.id), Some(2));
        assert_eq!(store.remove_conversation(2).await.map(|c| c.id), Some(2));
        assert!(store.remove_conversation(2).await.is_none());
        assert!(!store.mark_read_locally(99).await);
    }

    #[tokio::test]
    async fn slower_refresh_overwrites_local_patch() {
        let api = FakeApi::with_conversations(vec![conversation(2, Some("hi"), 0, false)]);
        let store = store(api.clone());
        store.refresh().await.unwrap();

        let gate = api.gate_conversations();
        let pending = tokio::spawn({
            let store = store.clone();
            async move { store.refresh().await }
        });
        gate.entered().await;

        store.patch_last_message(2, message(50, 7, "hello")).await;
        assert_eq!(store.get(2).await.unwrap().preview(), "hello");

        gate.release();
        pending.await.unwrap().unwrap();
        // Last completed write wins: the pre-send listing is back.
        assert_eq!(store.get(2).await.unwrap().preview(), "hi");
    }

    #[tokio::test]
    async fn emits_updates() {
        let api = FakeApi::with_conversations(vec![conversation(1, None, 0, false)]);
        let events = EventBus::new();
        let mut rx = events.subscribe();
        let store = ConversationStore::new(api, events);

        store.refresh().await.unwrap();
        store.remove_conversation(1).await;

        assert_eq!(rx.recv().await.unwrap(), InboxEvent::ConversationsUpdated { count: 1 });
        assert_eq!(
            rx.recv().await.unwrap(),
            InboxEvent::ConversationRemoved { conversation_id: 1 }
        );
    }
}
