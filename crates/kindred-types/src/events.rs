use serde::{Deserialize, Serialize};

use crate::models::ConversationId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
    Info,
}

/// Events published by the inbox for whatever renders it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InboxEvent {
    /// The conversation list was replaced or patched
    ConversationsUpdated { count: usize },

    /// The open thread changed (listing applied, optimistic append, confirm)
    MessagesUpdated {
        conversation_id: ConversationId,
        count: usize,
    },

    /// A conversation was opened, or the view went back to the list
    SelectionChanged {
        conversation_id: Option<ConversationId>,
    },

    /// A conversation was dropped locally after a block
    ConversationRemoved { conversation_id: ConversationId },

    /// The report dialog opened or closed
    ReportDialogChanged { open: bool },

    /// Transient user-facing notice (toast)
    Notice { level: NoticeLevel, text: String },
}

impl InboxEvent {
    /// Returns the conversation this event is scoped to, if any.
    pub fn conversation_id(&self) -> Option<ConversationId> {
        match self {
            Self::MessagesUpdated { conversation_id, .. } => Some(*conversation_id),
            Self::SelectionChanged { conversation_id } => *conversation_id,
            Self::ConversationRemoved { conversation_id } => Some(*conversation_id),
            _ => None,
        }
    }
}
