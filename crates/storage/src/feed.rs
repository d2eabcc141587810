use tokio::sync::{mpsc, oneshot};

use crate::ids::ConversationId;
use crate::types::MessageRecord;

/// One push from the live timeline subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// Full authoritative snapshot of the conversation's messages, in
    /// store order.
    Snapshot(Vec<MessageRecord>),
    /// Transport or protocol failure. The feed is dead after this event;
    /// recovery is a new subscription, never a silent reconnect.
    Lost { details: String },
}

/// Standing subscription to one conversation's message timeline.
///
/// Dropping the feed fires the unsubscribe handle, so a conversation
/// switch can never leak a live subscription.
pub struct MessageFeed {
    conversation_id: ConversationId,
    events: mpsc::UnboundedReceiver<FeedEvent>,
    unsubscribe_tx: Option<oneshot::Sender<()>>,
}

impl MessageFeed {
    pub(crate) fn new(
        conversation_id: ConversationId,
        events: mpsc::UnboundedReceiver<FeedEvent>,
        unsubscribe_tx: oneshot::Sender<()>,
    ) -> Self {
        Self {
            conversation_id,
            events,
            unsubscribe_tx: Some(unsubscribe_tx),
        }
    }

    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    pub async fn recv(&mut self) -> Option<FeedEvent> {
        self.events.recv().await
    }

    pub fn try_recv(&mut self) -> Option<FeedEvent> {
        self.events.try_recv().ok()
    }

    /// Signals the transport to stop pushing. Returns false when the
    /// transport is already gone or unsubscribe was already requested.
    pub fn unsubscribe(&mut self) -> bool {
        self.unsubscribe_tx
            .take()
            .map(|tx| tx.send(()).is_ok())
            .unwrap_or(false)
    }
}

impl Drop for MessageFeed {
    fn drop(&mut self) {
        if let Some(unsubscribe_tx) = self.unsubscribe_tx.take() {
            let _ = unsubscribe_tx.send(());
        }
    }
}

/// Wires up a feed: the transport keeps the sender and the unsubscribe
/// receiver; the caller gets the feed handle.
pub fn make_message_feed(
    conversation_id: ConversationId,
) -> (
    mpsc::UnboundedSender<FeedEvent>,
    MessageFeed,
    oneshot::Receiver<()>,
) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (unsubscribe_tx, unsubscribe_rx) = oneshot::channel();
    (
        event_tx,
        MessageFeed::new(conversation_id, event_rx, unsubscribe_tx),
        unsubscribe_rx,
    )
}
