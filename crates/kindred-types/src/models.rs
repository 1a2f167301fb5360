use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

pub type ConversationId = i64;
pub type MessageId = i64;
/// Profile id, as carried by `other_user.id` and `sender_profile.id`.
pub type ProfileId = i64;
/// Application user id, the target of like/block/report actions.
pub type UserId = i64;

pub const DEFAULT_AVATAR: &str = "/default-avatar.png";
pub const EMPTY_PREVIEW: &str = "Nothing here yet";

/// The authenticated viewer. Resolved once from the session and passed down
/// to anything that needs to know "is this mine".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub profile_id: ProfileId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherUser {
    pub id: ProfileId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub user: UserId,
}

/// A chat channel with exactly one matched counterpart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub other_user: OtherUser,
    #[serde(default)]
    pub photo: Option<String>,
    /// `None` until the first message is exchanged ("new match").
    #[serde(default)]
    pub last_message: Option<Message>,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub is_blocked: bool,
}

impl Conversation {
    pub fn is_new_match(&self) -> bool {
        self.last_message.is_none()
    }

    pub fn counterpart(&self) -> UserId {
        self.other_user.user
    }

    pub fn photo_or_default(&self) -> &str {
        self.photo
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_AVATAR)
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.other_user.first_name, self.other_user.last_name)
            .trim()
            .to_string()
    }

    pub fn preview(&self) -> &str {
        self.last_message
            .as_ref()
            .map(|m| m.content.as_str())
            .filter(|c| !c.is_empty())
            .unwrap_or(EMPTY_PREVIEW)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SenderProfile {
    pub id: ProfileId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Assigned by the server. Absent on optimistic local entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    pub sender_profile: SenderProfile,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    pub fn is_from(&self, profile_id: ProfileId) -> bool {
        self.sender_profile.id == profile_id
    }

    /// Hour:minute in the local timezone.
    pub fn time_label(&self) -> String {
        self.sent_at.with_timezone(&Local).format("%H:%M").to_string()
    }
}
