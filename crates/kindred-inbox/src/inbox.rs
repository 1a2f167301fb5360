use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use kindred_api::{ApiError, ApiResult, ChatApi};
use kindred_types::events::InboxEvent;
use kindred_types::models::{ConversationId, Message, SenderProfile, UserId, Viewer};

use crate::conversations::ConversationStore;
use crate::events::EventBus;
use crate::messages::MessageStore;
use crate::moderation::{BlockOutcome, ModerationController};
use crate::scheduler::{CONVERSATION_POLL_INTERVAL, MESSAGE_POLL_INTERVAL, PollingScheduler};

pub const SEND_FAILED: &str = "Failed to send message. Please try again.";
pub const MUTUAL_MATCH_REQUIRED: &str =
    "You can only message users who have also liked you (mutual match).";

#[derive(Debug, Clone, Copy)]
pub struct InboxConfig {
    pub conversation_poll: Duration,
    pub message_poll: Duration,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            conversation_poll: CONVERSATION_POLL_INTERVAL,
            message_poll: MESSAGE_POLL_INTERVAL,
        }
    }
}

/// What the compose box should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeState {
    pub draft: String,
    pub sending: bool,
    /// False with no open chat, while sending, or when blocked.
    pub enabled: bool,
    /// Show the persistent "blocked" banner.
    pub blocked: bool,
}

#[derive(Debug, Default)]
struct ViewState {
    selected: Option<ConversationId>,
    show_chat: bool,
    draft: String,
    sending: bool,
}

/// One mounted messaging view: the conversation list, the open thread, the
/// compose box and moderation, driven by two polling timers.
pub struct Inbox {
    api: Arc<dyn ChatApi>,
    viewer: Viewer,
    events: EventBus,
    conversations: ConversationStore,
    messages: MessageStore,
    scheduler: PollingScheduler,
    moderation: ModerationController,
    view: Mutex<ViewState>,
}

impl Inbox {
    pub fn new(api: Arc<dyn ChatApi>, viewer: Viewer, config: InboxConfig) -> Self {
        let events = EventBus::new();
        let conversations = ConversationStore::new(api.clone(), events.clone());
        let messages = MessageStore::new(api.clone(), events.clone());
        let scheduler = PollingScheduler::with_periods(
            conversations.clone(),
            messages.clone(),
            config.conversation_poll,
            config.message_poll,
        );
        let moderation = ModerationController::new(api.clone(), conversations.clone(), events.clone());

        Self {
            api,
            viewer,
            events,
            conversations,
            messages,
            scheduler,
            moderation,
            view: Mutex::new(ViewState::default()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InboxEvent> {
        self.events.subscribe()
    }

    /// Start the conversation timer. Its first fetch happens right away.
    pub fn mount(&self) {
        info!(profile_id = self.viewer.profile_id, "inbox mounted");
        self.scheduler.start_conversations();
    }

    /// Stop both timers and reset the selection state.
    pub async fn unmount(&self) {
        self.scheduler.stop_all();
        self.messages.select(None).await;
        *self.view.lock().await = ViewState::default();
        info!("inbox unmounted");
    }

    /// Open `conversation_id`: restart the message timer on it and, when it
    /// has unread messages, mark it read. Reselecting the open conversation
    /// keeps its thread, pending sends included.
    pub async fn select(&self, conversation_id: ConversationId) -> ApiResult<()> {
        let conversation = self
            .conversations
            .get(conversation_id)
            .await
            .ok_or_else(|| ApiError::validation(format!("unknown conversation {conversation_id}")))?;

        let already_open = {
            let mut view = self.view.lock().await;
            let already_open = view.selected == Some(conversation_id);
            if !already_open {
                view.draft.clear();
            }
            view.selected = Some(conversation_id);
            view.show_chat = true;
            already_open
        };

        if already_open {
            if self.scheduler.polling_messages_for() != Some(conversation_id) {
                self.scheduler.start_messages(conversation_id);
            }
        } else {
            // The old timer goes first so none of its ticks see the new thread.
            self.scheduler.stop_messages();
            self.messages.select(Some(conversation_id)).await;
            self.scheduler.start_messages(conversation_id);
            self.events.emit(InboxEvent::SelectionChanged {
                conversation_id: Some(conversation_id),
            });
            debug!(conversation_id, "conversation selected");
        }

        if conversation.unread_count > 0 {
            self.mark_read(conversation_id).await;
        }
        Ok(())
    }

    async fn mark_read(&self, conversation_id: ConversationId) {
        self.conversations.mark_read_locally(conversation_id).await;
        match self.api.mark_read(conversation_id).await {
            // A refresh may have landed in between with the old count.
            Ok(()) => {
                self.conversations.mark_read_locally(conversation_id).await;
            }
            Err(err) => warn!(conversation_id, %err, "mark read failed"),
        }
    }

    /// Close the chat pane and go back to the list.
    pub async fn back(&self) {
        {
            let mut view = self.view.lock().await;
            view.selected = None;
            view.show_chat = false;
            view.draft.clear();
        }
        self.scheduler.stop_messages();
        self.messages.select(None).await;
        self.events.emit(InboxEvent::SelectionChanged {
            conversation_id: None,
        });
    }

    /// Navigate from a profile into the chat with `user_id`. Only mutual
    /// matches have a conversation; anyone else gets an error notice and
    /// `Ok(None)`.
    pub async fn open_with_counterpart(&self, user_id: UserId) -> ApiResult<Option<ConversationId>> {
        let is_match = match self.api.check_mutual(user_id).await {
            Ok(is_match) => is_match,
            Err(err) => {
                warn!(user_id, %err, "mutual match check failed");
                self.events.error(err.user_message());
                return Err(err);
            }
        };
        if !is_match {
            self.events.error(MUTUAL_MATCH_REQUIRED);
            return Ok(None);
        }

        let conversation = match self.conversations.find_by_counterpart(user_id).await {
            Some(conversation) => Some(conversation),
            None => {
                self.conversations.refresh().await?;
                self.conversations.find_by_counterpart(user_id).await
            }
        };

        match conversation {
            Some(conversation) => {
                self.select(conversation.id).await?;
                Ok(Some(conversation.id))
            }
            None => {
                debug!(user_id, "mutual match without a conversation yet");
                self.events.error("No conversation with this user yet.");
                Ok(None)
            }
        }
    }

    pub async fn set_draft(&self, text: impl Into<String>) {
        self.view.lock().await.draft = text.into();
    }

    pub async fn compose(&self) -> ComposeState {
        let (selected, draft, sending) = {
            let view = self.view.lock().await;
            (view.selected, view.draft.clone(), view.sending)
        };
        let blocked = match selected {
            Some(id) => self.is_conversation_blocked(id).await,
            None => false,
        };
        ComposeState {
            draft,
            sending,
            enabled: selected.is_some() && !sending && !blocked,
            blocked,
        }
    }

    /// Send the draft to the open conversation. The draft is cleared and the
    /// message shown before the request resolves.
    pub async fn send(&self) -> ApiResult<Message> {
        let (conversation_id, content) = {
            let mut view = self.view.lock().await;
            let Some(conversation_id) = view.selected else {
                return Err(ApiError::validation("no conversation is open"));
            };
            if view.sending {
                return Err(ApiError::validation("a message is already being sent"));
            }
            let content = view.draft.trim().to_string();
            if content.is_empty() {
                return Err(ApiError::validation("message cannot be empty"));
            }
            if self.is_conversation_blocked(conversation_id).await {
                return Err(ApiError::validation("you have blocked this user"));
            }
            view.draft.clear();
            view.sending = true;
            (conversation_id, content)
        };

        let optimistic = Message {
            id: None,
            sender_profile: SenderProfile {
                id: self.viewer.profile_id,
            },
            content: content.clone(),
            sent_at: Utc::now(),
        };
        let key = self
            .messages
            .append_optimistic(conversation_id, optimistic)
            .await;

        let result = self
            .api
            .send_message(conversation_id, self.viewer.user_id, &content)
            .await;
        self.view.lock().await.sending = false;

        match result {
            Ok(message) => {
                if let Some(key) = key {
                    self.messages.confirm(key, message.clone()).await;
                }
                self.conversations
                    .patch_last_message(conversation_id, message.clone())
                    .await;
                debug!(conversation_id, message_id = ?message.id, "message sent");
                Ok(message)
            }
            Err(err) => {
                if let Some(key) = key {
                    self.messages.mark_failed(key).await;
                }
                warn!(conversation_id, %err, "send failed");
                self.events.error(SEND_FAILED);
                Err(err)
            }
        }
    }

    pub async fn send_text(&self, text: impl Into<String>) -> ApiResult<Message> {
        self.set_draft(text).await;
        self.send().await
    }

    /// Block `user_id`. If their chat is open, the view goes back to the list.
    pub async fn block(&self, user_id: UserId) -> ApiResult<BlockOutcome> {
        let selected = self.view.lock().await.selected;
        let open_counterpart = match selected {
            Some(id) => self.conversations.get(id).await.map(|c| c.counterpart()),
            None => None,
        };

        let outcome = self.moderation.block(user_id).await?;
        if let BlockOutcome::Blocked { removed } = outcome {
            let closes_open_chat =
                open_counterpart == Some(user_id) || (removed.is_some() && removed == selected);
            if closes_open_chat {
                self.back().await;
            }
        }
        Ok(outcome)
    }

    pub async fn unlike(&self, user_id: UserId) -> ApiResult<()> {
        self.moderation.unlike(user_id).await
    }

    /// Right-aligned ("mine") when the sender is the viewer's profile.
    pub fn is_own(&self, message: &Message) -> bool {
        message.is_from(self.viewer.profile_id)
    }

    pub async fn selected(&self) -> Option<ConversationId> {
        self.view.lock().await.selected
    }

    pub async fn show_chat(&self) -> bool {
        self.view.lock().await.show_chat
    }

    pub fn viewer(&self) -> Viewer {
        self.viewer
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    pub fn messages(&self) -> &MessageStore {
        &self.messages
    }

    pub fn moderation(&self) -> &ModerationController {
        &self.moderation
    }

    pub fn scheduler(&self) -> &PollingScheduler {
        &self.scheduler
    }

    async fn is_conversation_blocked(&self, conversation_id: ConversationId) -> bool {
        match self.conversations.get(conversation_id).await {
            Some(conversation) => {
                conversation.is_blocked || self.moderation.is_blocked(conversation.counterpart())
            }
            None => false,
        }
    }
}
