use chrono::{DateTime, Utc};

use super::ids::{AuthorId, ConversationId, MessageId};

/// Default conversation title used when a caller supplies an empty one.
pub const DEFAULT_CONVERSATION_TITLE: &str = "New Conversation";

/// One durable message row as the store reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub author_id: AuthorId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_automated: bool,
}

/// Insert input for a human-authored message; the store assigns id and
/// timestamp, and the automated flag is always false for client inserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub conversation_id: ConversationId,
    pub author_id: AuthorId,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationRecord {
    pub id: ConversationId,
    pub title: String,
    pub owner_id: AuthorId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConversation {
    pub title: String,
    pub owner_id: AuthorId,
}

impl NewConversation {
    /// Normalizes an empty or whitespace title to the default.
    pub fn new(title: impl Into<String>, owner_id: AuthorId) -> Self {
        let mut title = title.into();
        if title.trim().is_empty() {
            title = DEFAULT_CONVERSATION_TITLE.to_string();
        }
        Self { title, owner_id }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConversationPatch {
    pub title: Option<String>,
}
