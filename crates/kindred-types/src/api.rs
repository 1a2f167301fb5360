use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{ConversationId, UserId};

/// Upper bound on proof images attached to a single report.
pub const MAX_PROOF_PHOTOS: usize = 5;

// -- Messages --

#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub sender: UserId,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub struct MarkReadRequest {
    pub chat_id: ConversationId,
}

// -- Matching --

#[derive(Debug, Deserialize)]
pub struct MutualMatchResponse {
    #[serde(default)]
    pub is_match: bool,
}

// -- Reports --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    #[default]
    Inappropriate,
    Fake,
    Harassment,
    Spam,
    Other,
}

impl ReportType {
    pub const ALL: [ReportType; 5] = [
        ReportType::Inappropriate,
        ReportType::Fake,
        ReportType::Harassment,
        ReportType::Spam,
        ReportType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inappropriate => "inappropriate",
            Self::Fake => "fake",
            Self::Harassment => "harassment",
            Self::Spam => "spam",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownReportType(pub String);

impl fmt::Display for UnknownReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown report type '{}' (expected inappropriate, fake, harassment, spam or other)",
            self.0
        )
    }
}

impl std::error::Error for UnknownReportType {}

impl FromStr for ReportType {
    type Err = UnknownReportType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| UnknownReportType(s.to_string()))
    }
}

/// An image attached to a report as evidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofPhoto {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Multipart payload for `POST /matchmaking/report/{user}/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub report_type: ReportType,
    pub description: String,
    pub proof_photos: Vec<ProofPhoto>,
}

// -- Errors --

/// Error payloads the backend returns. Django REST framework uses `detail`;
/// a few custom views use `message` or `error`.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    pub detail: Option<String>,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        [self.detail, self.message, self.error]
            .into_iter()
            .flatten()
            .map(|m| m.trim().to_string())
            .find(|m| !m.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_type_parses_wire_names() {
        for t in ReportType::ALL {
            assert_eq!(t.as_str().parse::<ReportType>().unwrap(), t);
        }
        assert_eq!(" Spam ".parse::<ReportType>().unwrap(), ReportType::Spam);
        assert!("abuse".parse::<ReportType>().is_err());
        assert_eq!(
            serde_json::to_string(&ReportType::Harassment).unwrap(),
            "\"harassment\""
        );
    }

    #[test]
    fn error_body_prefers_detail() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"detail": "Not found.", "message": "x"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Not found."));

        let body: ErrorBody = serde_json::from_str(r#"{"detail": " ", "error": "blocked"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("blocked"));

        let body: ErrorBody = serde_json::from_str(r#"{"content": ["required"]}"#).unwrap();
        assert_eq!(body.into_message(), None);
    }

    #[test]
    fn send_request_shape() {
        let req = SendMessageRequest { sender: 7, content: "hello" };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            serde_json::json!({ "sender": 7, "content": "hello" })
        );
        assert_eq!(
            serde_json::to_value(MarkReadRequest { chat_id: 2 }).unwrap(),
            serde_json::json!({ "chat_id": 2 })
        );
    }
}
