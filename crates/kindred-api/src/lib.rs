pub mod client;
pub mod error;

use async_trait::async_trait;

use kindred_types::api::ReportRequest;
use kindred_types::models::{Conversation, ConversationId, Message, UserId};

pub use client::{ApiClient, ClientConfig};
pub use error::{ApiError, ApiResult};

/// The chat sub-API consumed by the inbox. `ApiClient` is the HTTP
/// implementation; tests substitute in-memory fakes.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// `GET /matchmaking/chat-rooms/`
    async fn list_conversations(&self) -> ApiResult<Vec<Conversation>>;

    /// `GET /matchmaking/chat-rooms/{id}/messages/`, oldest first.
    async fn list_messages(&self, conversation_id: ConversationId) -> ApiResult<Vec<Message>>;

    /// `POST /matchmaking/chat-rooms/{id}/messages/`. The server assigns `id`
    /// and `sent_at`.
    async fn send_message(
        &self,
        conversation_id: ConversationId,
        sender: UserId,
        content: &str,
    ) -> ApiResult<Message>;

    /// `POST /matchmaking/message/mark-read/`
    async fn mark_read(&self, conversation_id: ConversationId) -> ApiResult<()>;

    /// `POST /matchmaking/unlike/{user}/`
    async fn unlike(&self, user_id: UserId) -> ApiResult<()>;

    /// `POST /matchmaking/block/{user}/`
    async fn block(&self, user_id: UserId) -> ApiResult<()>;

    /// `POST /matchmaking/report/{user}/` as multipart form data.
    async fn report(&self, user_id: UserId, report: &ReportRequest) -> ApiResult<()>;

    /// `GET /matchmaking/check-mutual/{user}`
    async fn check_mutual(&self, user_id: UserId) -> ApiResult<bool>;
}
