use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use parlor_storage::AuthorId;

/// Reserved prefix that keeps provisional identifiers disjoint from
/// store-assigned ones wherever ids are rendered or logged.
pub const PROVISIONAL_ID_PREFIX: &str = "temp-";

/// Locally minted identifier for a message awaiting store confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProvisionalId(Uuid);

impl ProvisionalId {
    pub fn mint() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ProvisionalId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{PROVISIONAL_ID_PREFIX}{}", self.0)
    }
}

/// A message the user just submitted, rendered before any network round
/// trip. Never persisted; superseded by the authoritative copy or
/// discarded on insert failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionalMessage {
    pub id: ProvisionalId,
    pub author_id: AuthorId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ProvisionalMessage {
    /// Mints a provisional message stamped with the client clock. The
    /// timestamp is display-only; authoritative order comes from the store.
    pub fn new(author_id: AuthorId, content: impl Into<String>) -> Self {
        Self {
            id: ProvisionalId::mint(),
            author_id,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Insertion-ordered provisional messages for the open conversation.
///
/// Cleared in full on every feed snapshot; individual entries are
/// discarded when their insert step fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlaySet {
    entries: Vec<ProvisionalMessage>,
}

impl OverlaySet {
    pub fn push(&mut self, message: ProvisionalMessage) {
        self.entries.push(message);
    }

    /// Removes one entry by id; returns false when it was already gone
    /// (for example cleared by an intervening feed push).
    pub fn discard(&mut self, id: ProvisionalId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[ProvisionalMessage] {
        &self.entries
    }
}
