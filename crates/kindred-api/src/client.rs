use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use kindred_types::api::{
    ErrorBody, MAX_PROOF_PHOTOS, MarkReadRequest, MutualMatchResponse, ReportRequest,
    SendMessageRequest,
};
use kindred_types::models::{Conversation, ConversationId, Message, UserId};

use crate::ChatApi;
use crate::error::{ApiError, ApiResult};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest raw error body echoed back when the server sends no JSON detail.
const MAX_RAW_ERROR_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Authenticated HTTP client for the matchmaking chat endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.filter(|t| !t.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn execute(&self, req: RequestBuilder) -> ApiResult<Response> {
        let resp = self.authorize(req).send().await.map_err(ApiError::from)?;
        check_status(resp).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let resp = self.execute(self.http.get(self.url(path))).await?;
        read_json(resp).await
    }

    async fn post_empty(&self, path: &str) -> ApiResult<()> {
        self.execute(self.http.post(self.url(path))).await?;
        Ok(())
    }
}

/// Turns a non-2xx response into `ApiError::Server`, pulling the message out
/// of the body when there is one.
async fn check_status(resp: Response) -> ApiResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let url = resp.url().path().to_string();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(ErrorBody::into_message)
        .or_else(|| {
            let raw: String = body.trim().chars().take(MAX_RAW_ERROR_CHARS).collect();
            (!raw.is_empty()).then_some(raw)
        });

    warn!(status = status.as_u16(), path = %url, "chat API request rejected");
    Err(ApiError::Server {
        status: status.as_u16(),
        message,
    })
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> ApiResult<T> {
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| ApiError::Network(format!("failed to read response body: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

fn report_form(report: &ReportRequest) -> ApiResult<Form> {
    if report.proof_photos.len() > MAX_PROOF_PHOTOS {
        return Err(ApiError::validation(format!(
            "at most {MAX_PROOF_PHOTOS} proof photos can be attached"
        )));
    }

    let mut form = Form::new()
        .text("report_type", report.report_type.as_str())
        .text("description", report.description.clone());

    for (idx, photo) in report.proof_photos.iter().enumerate() {
        let mime = mime_guess::from_path(&photo.file_name).first_or_octet_stream();
        let part = Part::bytes(photo.bytes.clone())
            .file_name(photo.file_name.clone())
            .mime_str(mime.essence_str())
            .map_err(|e| ApiError::validation(format!("invalid proof photo '{}': {e}", photo.file_name)))?;
        form = form.part(format!("proof_photo_{}", idx + 1), part);
    }

    Ok(form)
}

#[async_trait]
impl ChatApi for ApiClient {
    async fn list_conversations(&self) -> ApiResult<Vec<Conversation>> {
        self.get_json("/matchmaking/chat-rooms/").await
    }

    async fn list_messages(&self, conversation_id: ConversationId) -> ApiResult<Vec<Message>> {
        self.get_json(&format!("/matchmaking/chat-rooms/{conversation_id}/messages/"))
            .await
    }

    async fn send_message(
        &self,
        conversation_id: ConversationId,
        sender: UserId,
        content: &str,
    ) -> ApiResult<Message> {
        let req = self
            .http
            .post(self.url(&format!("/matchmaking/chat-rooms/{conversation_id}/messages/")))
            .json(&SendMessageRequest { sender, content });
        let resp = self.execute(req).await?;
        let message: Message = read_json(resp).await?;
        debug!(conversation_id, message_id = ?message.id, "message sent");
        Ok(message)
    }

    async fn mark_read(&self, conversation_id: ConversationId) -> ApiResult<()> {
        let req = self
            .http
            .post(self.url("/matchmaking/message/mark-read/"))
            .json(&MarkReadRequest { chat_id: conversation_id });
        self.execute(req).await?;
        Ok(())
    }

    async fn unlike(&self, user_id: UserId) -> ApiResult<()> {
        self.post_empty(&format!("/matchmaking/unlike/{user_id}/")).await
    }

    async fn block(&self, user_id: UserId) -> ApiResult<()> {
        self.post_empty(&format!("/matchmaking/block/{user_id}/")).await
    }

    async fn report(&self, user_id: UserId, report: &ReportRequest) -> ApiResult<()> {
        let form = report_form(report)?;
        let req = self
            .http
            .post(self.url(&format!("/matchmaking/report/{user_id}/")))
            .multipart(form);
        self.execute(req).await?;
        debug!(user_id, report_type = %report.report_type, proofs = report.proof_photos.len(), "report submitted");
        Ok(())
    }

    async fn check_mutual(&self, user_id: UserId) -> ApiResult<bool> {
        let resp: MutualMatchResponse = self
            .get_json(&format!("/matchmaking/check-mutual/{user_id}"))
            .await?;
        Ok(resp.is_match)
    }
}
