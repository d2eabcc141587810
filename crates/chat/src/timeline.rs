use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};

use parlor_storage::{AuthorId, MessageId, MessageRecord};

use crate::overlay::{OverlaySet, ProvisionalId, ProvisionalMessage};

/// Identifier of one rendered timeline row.
///
/// Stored and provisional identifiers are distinct variants, so an
/// authoritative row can never collide with an optimistic one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimelineId {
    Stored(MessageId),
    Provisional(ProvisionalId),
}

impl TimelineId {
    pub fn is_provisional(&self) -> bool {
        matches!(self, Self::Provisional(_))
    }
}

impl fmt::Display for TimelineId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stored(id) => write!(formatter, "{id}"),
            Self::Provisional(id) => write!(formatter, "{id}"),
        }
    }
}

/// One row of the merged render sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineMessage {
    pub id: TimelineId,
    pub author_id: AuthorId,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    pub automated: bool,
}

impl From<&MessageRecord> for TimelineMessage {
    fn from(record: &MessageRecord) -> Self {
        Self {
            id: TimelineId::Stored(record.id),
            author_id: record.author_id,
            content: record.content.clone(),
            sent_at: record.created_at,
            automated: record.is_automated,
        }
    }
}

impl From<&ProvisionalMessage> for TimelineMessage {
    fn from(message: &ProvisionalMessage) -> Self {
        Self {
            id: TimelineId::Provisional(message.id),
            author_id: message.author_id,
            content: message.content.clone(),
            sent_at: message.created_at,
            automated: false,
        }
    }
}

/// Merges the authoritative sequence with the optimistic overlay.
///
/// Store order wins for confirmed rows (deduplicated by id, first
/// occurrence kept); overlay entries follow in insertion order. A
/// just-confirmed message may appear twice for one push cycle; the
/// feed-clears-overlay rule heals that on the next snapshot.
pub fn merge_timeline(
    authoritative: &[MessageRecord],
    overlay: &OverlaySet,
) -> Vec<TimelineMessage> {
    let mut seen = HashSet::with_capacity(authoritative.len());
    let mut rendered = Vec::with_capacity(authoritative.len() + overlay.len());

    for record in authoritative {
        if seen.insert(record.id) {
            rendered.push(TimelineMessage::from(record));
        }
    }

    for entry in overlay.entries() {
        rendered.push(TimelineMessage::from(entry));
    }

    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use parlor_storage::ConversationId;

    fn record(content: &str, automated: bool) -> MessageRecord {
        MessageRecord {
            id: MessageId::mint(),
            conversation_id: ConversationId::mint(),
            author_id: AuthorId::mint(),
            content: content.to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            is_automated: automated,
        }
    }

    #[test]
    fn authoritative_rows_precede_overlay_entries() {
        let stored = vec![record("hello", false), record("hi there!", true)];
        let mut overlay = OverlaySet::default();
        overlay.push(ProvisionalMessage::new(AuthorId::mint(), "pending"));

        let merged = merge_timeline(&stored, &overlay);
        assert_eq!(merged.len(), 3);
        assert!(!merged[0].id.is_provisional());
        assert!(!merged[1].id.is_provisional());
        assert!(merged[2].id.is_provisional());
        assert_eq!(merged[2].content, "pending");
    }

    #[test]
    fn duplicate_stored_ids_keep_the_first_occurrence() {
        let first = record("original", false);
        let mut duplicate = record("rewritten", false);
        duplicate.id = first.id;

        let merged = merge_timeline(&[first, duplicate], &OverlaySet::default());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].content, "original");
    }

    #[test]
    fn empty_inputs_merge_to_an_empty_sequence() {
        assert!(merge_timeline(&[], &OverlaySet::default()).is_empty());
    }

    #[test]
    fn provisional_rows_are_never_automated() {
        let mut overlay = OverlaySet::default();
        overlay.push(ProvisionalMessage::new(AuthorId::mint(), "mine"));
        let merged = merge_timeline(&[], &overlay);
        assert!(!merged[0].automated);
    }
}
