//! In-memory `ChatApi` used by the unit tests. Gates let a test hold a
//! request in flight and release it at a chosen point.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{Notify, Semaphore};

use kindred_api::{ApiError, ApiResult, ChatApi};
use kindred_types::api::ReportRequest;
use kindred_types::models::{
    Conversation, ConversationId, Message, OtherUser, SenderProfile, UserId,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListConversations,
    ListMessages(ConversationId),
    Send(ConversationId, UserId, String),
    MarkRead(ConversationId),
    Unlike(UserId),
    Block(UserId),
    Report(UserId, ReportRequest),
    CheckMutual(UserId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    ListConversations,
    ListMessages,
    Send,
    MarkRead,
    Unlike,
    Block,
    Report,
}

pub struct Gate {
    entered: Notify,
    release: Semaphore,
}

impl Gate {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            entered: Notify::new(),
            release: Semaphore::new(0),
        })
    }

    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.add_permits(1);
    }

    async fn pass(&self) {
        self.entered.notify_one();
        self.release.acquire().await.unwrap().forget();
    }
}

#[derive(Default)]
pub struct FakeApi {
    pub conversations: Mutex<Vec<Conversation>>,
    pub threads: Mutex<HashMap<ConversationId, Vec<Message>>>,
    pub mutual: Mutex<HashSet<UserId>>,
    calls: Mutex<Vec<Call>>,
    failing: Mutex<HashSet<Op>>,
    conversation_gate: Mutex<Option<Arc<Gate>>>,
    message_gates: Mutex<HashMap<ConversationId, Arc<Gate>>>,
    send_gate: Mutex<Option<Arc<Gate>>>,
    next_id: AtomicI64,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        let api = Self::default();
        api.next_id.store(1000, Ordering::SeqCst);
        Arc::new(api)
    }

    pub fn with_conversations(conversations: Vec<Conversation>) -> Arc<Self> {
        let api = Self::new();
        *api.conversations.lock() = conversations;
        api
    }

    pub fn set_thread(&self, conversation_id: ConversationId, messages: Vec<Message>) {
        self.threads.lock().insert(conversation_id, messages);
    }

    pub fn fail(&self, op: Op) {
        self.failing.lock().insert(op);
    }

    pub fn recover(&self, op: Op) {
        self.failing.lock().remove(&op);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    pub fn gate_conversations(&self) -> Arc<Gate> {
        let gate = Gate::new();
        *self.conversation_gate.lock() = Some(gate.clone());
        gate
    }

    pub fn gate_messages(&self, conversation_id: ConversationId) -> Arc<Gate> {
        let gate = Gate::new();
        self.message_gates.lock().insert(conversation_id, gate.clone());
        gate
    }

    pub fn gate_send(&self) -> Arc<Gate> {
        let gate = Gate::new();
        *self.send_gate.lock() = Some(gate.clone());
        gate
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn check(&self, op: Op) -> ApiResult<()> {
        if self.failing.lock().contains(&op) {
            Err(ApiError::Server {
                status: 500,
                message: Some(format!("{op:?} failed")),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ChatApi for FakeApi {
    async fn list_conversations(&self) -> ApiResult<Vec<Conversation>> {
        self.record(Call::ListConversations);
        // Snapshot before waiting so a gated listing carries the old state.
        let listing = self.conversations.lock().clone();
        let gate = self.conversation_gate.lock().take();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        self.check(Op::ListConversations)?;
        Ok(listing)
    }

    async fn list_messages(&self, conversation_id: ConversationId) -> ApiResult<Vec<Message>> {
        self.record(Call::ListMessages(conversation_id));
        let listing = self
            .threads
            .lock()
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default();
        let gate = self.message_gates.lock().remove(&conversation_id);
        if let Some(gate) = gate {
            gate.pass().await;
        }
        self.check(Op::ListMessages)?;
        Ok(listing)
    }

    async fn send_message(
        &self,
        conversation_id: ConversationId,
        sender: UserId,
        content: &str,
    ) -> ApiResult<Message> {
        self.record(Call::Send(conversation_id, sender, content.to_string()));
        let gate = self.send_gate.lock().take();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        self.check(Op::Send)?;
        let stored = Message {
            id: Some(self.next_id.fetch_add(1, Ordering::SeqCst)),
            sender_profile: SenderProfile { id: sender },
            content: content.to_string(),
            sent_at: Utc::now(),
        };
        self.threads
            .lock()
            .entry(conversation_id)
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn mark_read(&self, conversation_id: ConversationId) -> ApiResult<()> {
        self.record(Call::MarkRead(conversation_id));
        self.check(Op::MarkRead)?;
        for conv in self.conversations.lock().iter_mut() {
            if conv.id == conversation_id {
                conv.unread_count = 0;
            }
        }
        Ok(())
    }

    async fn unlike(&self, user_id: UserId) -> ApiResult<()> {
        self.record(Call::Unlike(user_id));
        self.check(Op::Unlike)
    }

    async fn block(&self, user_id: UserId) -> ApiResult<()> {
        self.record(Call::Block(user_id));
        self.check(Op::Block)?;
        for conv in self.conversations.lock().iter_mut() {
            if conv.other_user.user == user_id {
                conv.is_blocked = true;
            }
        }
        Ok(())
    }

    async fn report(&self, user_id: UserId, report: &ReportRequest) -> ApiResult<()> {
        self.record(Call::Report(user_id, report.clone()));
        self.check(Op::Report)
    }

    async fn check_mutual(&self, user_id: UserId) -> ApiResult<bool> {
        self.record(Call::CheckMutual(user_id));
        Ok(self.mutual.lock().contains(&user_id))
    }
}

pub fn message(id: i64, sender: i64, content: &str) -> Message {
    Message {
        id: Some(id),
        sender_profile: SenderProfile { id: sender },
        content: content.to_string(),
        sent_at: Utc::now(),
    }
}

/// Conversation `id` with counterpart profile `id + 10` and user `id + 100`.
pub fn conversation(id: ConversationId, last: Option<&str>, unread: u32, blocked: bool) -> Conversation {
    Conversation {
        id,
        other_user: OtherUser {
            id: id + 10,
            first_name: format!("User{id}"),
            last_name: "Test".into(),
            user: id + 100,
        },
        photo: None,
        last_message: last.map(|c| message(id * 100, id + 10, c)),
        unread_count: unread,
        is_blocked: blocked,
    }
}
