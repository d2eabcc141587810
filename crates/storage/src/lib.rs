//! Boundary to the remote data store.
//!
//! This crate owns the contract only: typed identifiers, record types,
//! the store traits, and the push-based message feed. The durable engine
//! behind these operations is remote and out of scope; adapters fulfill
//! the traits elsewhere.

use std::future::Future;
use std::pin::Pin;

pub mod error;
pub mod feed;
pub mod ids;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use feed::{FeedEvent, MessageFeed, make_message_feed};
pub use ids::{AuthorId, ConversationId, MessageId};
pub use types::{
    ConversationPatch, ConversationRecord, DEFAULT_CONVERSATION_TITLE, MessageRecord,
    NewConversation, NewMessage,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait MessageStore: Send + Sync {
    /// Durably inserts one human-authored message; the store assigns the
    /// identifier and timestamp.
    fn insert_message(&self, input: NewMessage) -> BoxFuture<'_, StoreResult<MessageRecord>>;

    /// Opens the standing per-conversation subscription. Every push is a
    /// full ordered snapshot; the sequence ends only on unsubscribe or
    /// transport failure.
    fn subscribe_messages(
        &self,
        conversation_id: ConversationId,
    ) -> BoxFuture<'_, StoreResult<MessageFeed>>;
}

pub trait ConversationStore: Send + Sync {
    fn create_conversation(
        &self,
        input: NewConversation,
    ) -> BoxFuture<'_, StoreResult<ConversationRecord>>;

    /// Conversations owned by the author, most recently updated first.
    fn list_conversations(
        &self,
        owner_id: AuthorId,
    ) -> BoxFuture<'_, StoreResult<Vec<ConversationRecord>>>;

    /// Refreshes the conversation's `updated_at`. Best-effort from the
    /// caller's perspective; used only for list ordering.
    fn touch_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> BoxFuture<'_, StoreResult<()>>;

    fn rename_conversation(
        &self,
        conversation_id: ConversationId,
        patch: ConversationPatch,
    ) -> BoxFuture<'_, StoreResult<ConversationRecord>>;
}

pub trait ChatStore: MessageStore + ConversationStore {}

impl<T> ChatStore for T where T: MessageStore + ConversationStore {}
