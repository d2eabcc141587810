//! GraphQL operation documents and wire types for the chat backend.
//!
//! The documents target the backend schema directly, so the wire field
//! names (`chat_id`, `user_id`, `is_bot`) differ from the domain types on
//! purpose; the row structs own that translation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use parlor_storage::{ConversationRecord, MessageRecord};

pub const INSERT_MESSAGE: &str = r#"
mutation InsertMessage($chat_id: uuid!, $content: String!, $user_id: uuid!) {
  insert_messages_one(
    object: { chat_id: $chat_id, user_id: $user_id, content: $content, is_bot: false }
  ) {
    id
    chat_id
    user_id
    content
    created_at
    is_bot
  }
}"#;

pub const TOUCH_CONVERSATION: &str = r#"
mutation TouchConversation($chat_id: uuid!) {
  update_chats_by_pk(pk_columns: { id: $chat_id }, _set: { updated_at: "now()" }) {
    id
    updated_at
  }
}"#;

pub const CREATE_CONVERSATION: &str = r#"
mutation CreateConversation($title: String!, $user_id: uuid!) {
  insert_chats_one(object: { title: $title, user_id: $user_id }) {
    id
    title
    user_id
    created_at
    updated_at
  }
}"#;

pub const LIST_CONVERSATIONS: &str = r#"
query ListConversations($user_id: uuid!) {
  chats(where: { user_id: { _eq: $user_id } }, order_by: { updated_at: desc }) {
    id
    title
    user_id
    created_at
    updated_at
  }
}"#;

pub const RENAME_CONVERSATION: &str = r#"
mutation RenameConversation($chat_id: uuid!, $title: String!) {
  update_chats_by_pk(pk_columns: { id: $chat_id }, _set: { title: $title }) {
    id
    title
    user_id
    created_at
    updated_at
  }
}"#;

pub const TRIGGER_RESPONSE: &str = r#"
mutation TriggerResponse($chat_id: uuid!, $message: String!, $message_id: uuid!, $user_id: uuid!) {
  sendMessage(chat_id: $chat_id, message: $message, message_id: $message_id, user_id: $user_id) {
    message
  }
}"#;

pub const SUBSCRIBE_MESSAGES: &str = r#"
subscription SubscribeToMessages($chat_id: uuid!) {
  messages(where: { chat_id: { _eq: $chat_id } }, order_by: { created_at: asc }) {
    id
    chat_id
    user_id
    content
    created_at
    is_bot
  }
}"#;

/// Outgoing GraphQL request body.
#[derive(Debug, Clone, Serialize)]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
    pub variables: Value,
}

/// Incoming `{data, errors}` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GraphQlError {
    pub message: String,
}

impl<T> GraphQlResponse<T> {
    /// Joined error messages, or `None` when the response carried none.
    pub fn error_details(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        Some(
            self.errors
                .iter()
                .map(|error| error.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Joins subscription-frame error payloads the same way.
pub(crate) fn join_error_messages(errors: &[GraphQlError]) -> String {
    errors
        .iter()
        .map(|error| error.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Row shape of the backend's `messages` table.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MessageRow {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_bot: bool,
}

impl From<MessageRow> for MessageRecord {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id.into(),
            conversation_id: row.chat_id.into(),
            author_id: row.user_id.into(),
            content: row.content,
            created_at: row.created_at,
            is_automated: row.is_bot,
        }
    }
}

/// Row shape of the backend's `chats` table.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ChatRow {
    pub id: Uuid,
    pub title: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ChatRow> for ConversationRecord {
    fn from(row: ChatRow) -> Self {
        Self {
            id: row.id.into(),
            title: row.title,
            owner_id: row.user_id.into(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InsertMessageData {
    pub insert_messages_one: Option<MessageRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TouchConversationData {
    pub update_chats_by_pk: Option<TouchedChatRow>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TouchedChatRow {
    pub id: Uuid,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateConversationData {
    pub insert_chats_one: Option<ChatRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListConversationsData {
    pub chats: Vec<ChatRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenameConversationData {
    pub update_chats_by_pk: Option<ChatRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TriggerResponseData {
    #[serde(rename = "sendMessage")]
    pub send_message: Option<TriggerReply>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TriggerReply {
    #[serde(default)]
    pub message: Option<String>,
}

/// Payload of one subscription `next` frame.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SubscriptionData {
    pub messages: Vec<MessageRow>,
}
