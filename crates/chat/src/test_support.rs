//! Scriptable store and trigger doubles shared by the async tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};

use parlor_storage::{
    AuthorId, BoxFuture, ChatStore, ConversationId, ConversationPatch, ConversationRecord,
    ConversationStore, FeedEvent, MessageFeed, MessageId, MessageRecord, MessageStore,
    NewConversation, NewMessage, StoreResult, make_message_feed,
};

use crate::responder::{ResponderTrigger, TriggerRequest, TriggerResult};

/// Builds an authoritative message row for feed pushes.
pub(crate) fn stored_message(conversation_id: ConversationId, content: &str) -> MessageRecord {
    MessageRecord {
        id: MessageId::mint(),
        conversation_id,
        author_id: AuthorId::mint(),
        content: content.to_string(),
        created_at: Utc::now(),
        is_automated: false,
    }
}

/// In-memory [`ChatStore`] double with scriptable results, a releasable
/// insert gate, and direct access to the feed it hands out.
pub(crate) struct MockChatStore {
    insert_results: Mutex<VecDeque<StoreResult<MessageRecord>>>,
    insert_inputs: Mutex<Vec<NewMessage>>,
    insert_gate: Mutex<Option<oneshot::Receiver<()>>>,
    touch_results: Mutex<VecDeque<StoreResult<()>>>,
    touch_count: AtomicUsize,
    subscribe_count: AtomicUsize,
    feed_senders: Mutex<Vec<mpsc::UnboundedSender<FeedEvent>>>,
    unsubscribe_receivers: Mutex<Vec<Option<oneshot::Receiver<()>>>>,
}

impl MockChatStore {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            insert_results: Mutex::new(VecDeque::new()),
            insert_inputs: Mutex::new(Vec::new()),
            insert_gate: Mutex::new(None),
            touch_results: Mutex::new(VecDeque::new()),
            touch_count: AtomicUsize::new(0),
            subscribe_count: AtomicUsize::new(0),
            feed_senders: Mutex::new(Vec::new()),
            unsubscribe_receivers: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn script_insert(&self, result: StoreResult<MessageRecord>) {
        self.insert_results.lock().unwrap().push_back(result);
    }

    pub(crate) fn script_touch(&self, result: StoreResult<()>) {
        self.touch_results.lock().unwrap().push_back(result);
    }

    /// Holds the next insert until the returned sender fires.
    pub(crate) fn gate_next_insert(&self) -> oneshot::Sender<()> {
        let (release_tx, release_rx) = oneshot::channel();
        *self.insert_gate.lock().unwrap() = Some(release_rx);
        release_tx
    }

    /// Pushes a full snapshot on the most recent subscription, waiting for
    /// the subscription to exist first.
    pub(crate) async fn push_snapshot(&self, records: Vec<MessageRecord>) {
        self.push_event(FeedEvent::Snapshot(records)).await;
    }

    pub(crate) async fn push_lost(&self, details: &str) {
        self.push_event(FeedEvent::Lost {
            details: details.to_string(),
        })
        .await;
    }

    async fn push_event(&self, event: FeedEvent) {
        let mut event = Some(event);
        for _ in 0..5_000 {
            {
                let senders = self.feed_senders.lock().unwrap();
                if let Some(sender) = senders.last() {
                    sender
                        .send(event.take().expect("event pushed once"))
                        .expect("feed should still be open");
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("no subscription appeared to push a feed event into");
    }

    pub(crate) fn insert_inputs(&self) -> Vec<NewMessage> {
        self.insert_inputs.lock().unwrap().clone()
    }

    pub(crate) fn touch_count(&self) -> usize {
        self.touch_count.load(Ordering::SeqCst)
    }

    pub(crate) fn subscribe_count(&self) -> usize {
        self.subscribe_count.load(Ordering::SeqCst)
    }

    /// Takes the unsubscribe signal of the n-th subscription handed out.
    pub(crate) fn take_unsubscribe(&self, index: usize) -> oneshot::Receiver<()> {
        self.unsubscribe_receivers.lock().unwrap()[index]
            .take()
            .expect("unsubscribe receiver already taken")
    }
}

impl MessageStore for MockChatStore {
    fn insert_message(&self, input: NewMessage) -> BoxFuture<'_, StoreResult<MessageRecord>> {
        Box::pin(async move {
            let gate = self.insert_gate.lock().unwrap().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }

            self.insert_inputs.lock().unwrap().push(input.clone());
            let scripted = self.insert_results.lock().unwrap().pop_front();
            scripted.unwrap_or_else(|| {
                Ok(MessageRecord {
                    id: MessageId::mint(),
                    conversation_id: input.conversation_id,
                    author_id: input.author_id,
                    content: input.content,
                    created_at: Utc::now(),
                    is_automated: false,
                })
            })
        })
    }

    fn subscribe_messages(
        &self,
        conversation_id: ConversationId,
    ) -> BoxFuture<'_, StoreResult<MessageFeed>> {
        Box::pin(async move {
            self.subscribe_count.fetch_add(1, Ordering::SeqCst);
            let (event_tx, feed, unsubscribe_rx) = make_message_feed(conversation_id);
            self.feed_senders.lock().unwrap().push(event_tx);
            self.unsubscribe_receivers
                .lock()
                .unwrap()
                .push(Some(unsubscribe_rx));
            Ok(feed)
        })
    }
}

impl ConversationStore for MockChatStore {
    fn create_conversation(
        &self,
        input: NewConversation,
    ) -> BoxFuture<'_, StoreResult<ConversationRecord>> {
        Box::pin(async move {
            let now = Utc::now();
            Ok(ConversationRecord {
                id: ConversationId::mint(),
                title: input.title,
                owner_id: input.owner_id,
                created_at: now,
                updated_at: now,
            })
        })
    }

    fn list_conversations(
        &self,
        _owner_id: AuthorId,
    ) -> BoxFuture<'_, StoreResult<Vec<ConversationRecord>>> {
        Box::pin(async move { Ok(Vec::new()) })
    }

    fn touch_conversation(
        &self,
        _conversation_id: ConversationId,
    ) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            self.touch_count.fetch_add(1, Ordering::SeqCst);
            self.touch_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(()))
        })
    }

    fn rename_conversation(
        &self,
        conversation_id: ConversationId,
        patch: ConversationPatch,
    ) -> BoxFuture<'_, StoreResult<ConversationRecord>> {
        Box::pin(async move {
            let now = Utc::now();
            Ok(ConversationRecord {
                id: conversation_id,
                title: patch.title.unwrap_or_default(),
                owner_id: AuthorId::mint(),
                created_at: now,
                updated_at: now,
            })
        })
    }
}

/// Scriptable [`ResponderTrigger`] double recording every request.
pub(crate) struct MockTrigger {
    results: Mutex<VecDeque<TriggerResult<()>>>,
    requests: Mutex<Vec<TriggerRequest>>,
}

impl MockTrigger {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            results: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn script(&self, result: TriggerResult<()>) {
        self.results.lock().unwrap().push_back(result);
    }

    pub(crate) fn requests(&self) -> Vec<TriggerRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl ResponderTrigger for MockTrigger {
    fn trigger_response(&self, request: TriggerRequest) -> BoxFuture<'_, TriggerResult<()>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(request);
            self.results.lock().unwrap().pop_front().unwrap_or(Ok(()))
        })
    }
}

/// `ChatStore` is object safe and both doubles satisfy their seams.
#[allow(dead_code)]
fn assert_object_safety(store: Arc<MockChatStore>, trigger: Arc<MockTrigger>) {
    let _store: Arc<dyn ChatStore> = store;
    let _trigger: Arc<dyn ResponderTrigger> = trigger;
}
