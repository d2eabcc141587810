use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use parlor_storage::{ChatStore, ConversationId, FeedEvent, MessageFeed};

use crate::engine::{ChatEngine, ChatSnapshot, SubmitRejection};
use crate::pipeline::{SendEvent, run_send};
use crate::responder::ResponderTrigger;
use crate::session::SessionContext;

/// Inputs the controller accepts from the embedding application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    SetDraft(String),
    Submit,
    Select(ConversationId),
    DismissBanner,
}

/// Caller-facing handle: commands in, snapshots out.
///
/// Dropping every handle closes the command channel and tears the
/// controller down, which unsubscribes the live feed.
#[derive(Clone)]
pub struct ChatHandle {
    commands: mpsc::UnboundedSender<ChatCommand>,
    snapshots: watch::Receiver<ChatSnapshot>,
}

impl ChatHandle {
    pub fn send(&self, command: ChatCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn set_draft(&self, text: impl Into<String>) -> bool {
        self.send(ChatCommand::SetDraft(text.into()))
    }

    pub fn submit(&self) -> bool {
        self.send(ChatCommand::Submit)
    }

    pub fn select(&self, conversation_id: ConversationId) -> bool {
        self.send(ChatCommand::Select(conversation_id))
    }

    pub fn dismiss_banner(&self) -> bool {
        self.send(ChatCommand::DismissBanner)
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> ChatSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver for observing snapshot changes.
    pub fn snapshots(&self) -> watch::Receiver<ChatSnapshot> {
        self.snapshots.clone()
    }
}

/// Event loop binding one [`ChatEngine`] to the live feed and the send
/// pipeline.
///
/// Everything that mutates engine state happens here, one event at a
/// time; pipeline and subscription I/O run on their own tasks and report
/// back through channels, so a feed push is applied even while a send
/// attempt is suspended on a network step.
pub struct ChatController {
    session: SessionContext,
    store: Arc<dyn ChatStore>,
    trigger: Arc<dyn ResponderTrigger>,
    engine: ChatEngine,
    feed: Option<MessageFeed>,
    commands: mpsc::UnboundedReceiver<ChatCommand>,
    send_events: mpsc::UnboundedReceiver<SendEvent>,
    // Kept so the channel outlives idle periods; pipelines get clones.
    send_events_tx: mpsc::UnboundedSender<SendEvent>,
    snapshots: watch::Sender<ChatSnapshot>,
}

impl ChatController {
    /// Spawns the controller bound to `conversation_id` and returns the
    /// caller handle plus the driving task.
    pub fn spawn(
        session: SessionContext,
        conversation_id: ConversationId,
        store: Arc<dyn ChatStore>,
        trigger: Arc<dyn ResponderTrigger>,
    ) -> (ChatHandle, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (send_events_tx, send_events_rx) = mpsc::unbounded_channel();
        let engine = ChatEngine::new(session.clone(), conversation_id);
        let (snapshot_tx, snapshot_rx) = watch::channel(engine.snapshot());

        let controller = Self {
            session,
            store,
            trigger,
            engine,
            feed: None,
            commands: command_rx,
            send_events: send_events_rx,
            send_events_tx,
            snapshots: snapshot_tx,
        };
        let task = tokio::spawn(controller.run());

        (
            ChatHandle {
                commands: command_tx,
                snapshots: snapshot_rx,
            },
            task,
        )
    }

    async fn run(mut self) {
        self.resubscribe().await;
        self.publish();

        loop {
            tokio::select! {
                maybe_command = self.commands.recv() => {
                    let Some(command) = maybe_command else {
                        // Every handle is gone; dropping the feed unsubscribes.
                        break;
                    };
                    self.handle_command(command).await;
                }
                maybe_event = recv_feed(self.feed.as_mut()) => {
                    self.handle_feed_event(maybe_event);
                }
                maybe_send = self.send_events.recv() => {
                    // Never `None`: the controller holds a sender.
                    if let Some(event) = maybe_send {
                        self.engine.apply_send_event(event);
                    }
                }
            }
            self.publish();
        }
    }

    async fn handle_command(&mut self, command: ChatCommand) {
        match command {
            ChatCommand::SetDraft(text) => self.engine.set_draft(text),
            ChatCommand::Submit => self.handle_submit(),
            ChatCommand::Select(conversation_id) => self.handle_select(conversation_id).await,
            ChatCommand::DismissBanner => self.engine.dismiss_banner(),
        }
    }

    fn handle_submit(&mut self) {
        match self.engine.begin_send() {
            Ok(attempt) => {
                // Make the optimistic entry observable before the first
                // network step resolves.
                self.publish();
                tokio::spawn(run_send(
                    attempt,
                    Arc::clone(&self.store),
                    Arc::clone(&self.trigger),
                    self.send_events_tx.clone(),
                ));
            }
            Err(SubmitRejection::AttemptInFlight) => {
                tracing::debug!("submit ignored: attempt already in flight");
            }
            Err(SubmitRejection::EmptyDraft) => {
                // The engine already raised the validation banner.
            }
        }
    }

    async fn handle_select(&mut self, conversation_id: ConversationId) {
        if self.engine.conversation_id() == conversation_id {
            // Idempotent: re-selecting must not duplicate the subscription.
            return;
        }

        // The engine is replaced wholesale: no draft, overlay, or banner
        // carries across conversations. An in-flight pipeline keeps
        // running; its events fail the target check and are dropped.
        let attempt_seed = self.engine.attempt_watermark();
        self.engine =
            ChatEngine::with_attempt_seed(self.session.clone(), conversation_id, attempt_seed);
        self.feed = None;
        self.resubscribe().await;
    }

    async fn resubscribe(&mut self) {
        let conversation_id = self.engine.conversation_id();
        match self.store.subscribe_messages(conversation_id).await {
            Ok(feed) => self.feed = Some(feed),
            Err(error) => {
                tracing::error!(
                    conversation = %conversation_id,
                    error = %error,
                    "message subscription failed"
                );
                self.engine.apply_feed_event(FeedEvent::Lost {
                    details: error.to_string(),
                });
                self.feed = None;
            }
        }
    }

    fn handle_feed_event(&mut self, event: Option<FeedEvent>) {
        match event {
            Some(event) => {
                let lost = matches!(event, FeedEvent::Lost { .. });
                self.engine.apply_feed_event(event);
                if lost {
                    // The feed contract is non-restartable: stop polling a
                    // dead subscription; recovery is an explicit re-select.
                    self.feed = None;
                }
            }
            None => {
                self.engine.apply_feed_event(FeedEvent::Lost {
                    details: "live timeline feed closed".to_string(),
                });
                self.feed = None;
            }
        }
    }

    fn publish(&self) {
        let _ = self.snapshots.send(self.engine.snapshot());
    }
}

/// Resolves to the next feed event, or parks forever when no feed is
/// open so the select loop ignores this branch.
async fn recv_feed(feed: Option<&mut MessageFeed>) -> Option<FeedEvent> {
    match feed {
        Some(feed) => feed.recv().await,
        None => std::future::pending().await,
    }
}
