use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Failure taxonomy for every chat API call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never reached the server, timed out, or the body could
    /// not be read.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("server error ({status}): {}", message.as_deref().unwrap_or("no details"))]
    Server { status: u16, message: Option<String> },

    /// Rejected client-side; nothing was sent.
    #[error("invalid request: {0}")]
    Validation(String),

    /// 2xx response whose body does not have the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short text suitable for a toast.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => "Network error, check your connection and retry.".into(),
            Self::Server { message: Some(m), .. } => m.clone(),
            Self::Server { status, message: None } => format!("Request failed ({status})"),
            Self::Validation(m) => m.clone(),
            Self::Decode(_) => "Unexpected response from the server.".into(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Network(format!("request timed out: {err}"));
        }
        if err.is_decode() {
            return Self::Decode(err.to_string());
        }
        if let Some(status) = err.status() {
            return Self::Server {
                status: status.as_u16(),
                message: None,
            };
        }
        if err.is_builder() {
            return Self::Validation(err.to_string());
        }
        Self::Network(err.to_string())
    }
}
