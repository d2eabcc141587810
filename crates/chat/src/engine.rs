use parlor_storage::{ConversationId, FeedEvent, MessageRecord};

use crate::error::ErrorBanner;
use crate::overlay::{OverlaySet, ProvisionalId, ProvisionalMessage};
use crate::pipeline::{SendAttempt, SendEvent, SendEventPayload};
use crate::send::{SendAttemptId, SendFailure, SendState, SendStep, SendTarget, SendTransition};
use crate::session::SessionContext;
use crate::timeline::{TimelineMessage, merge_timeline};

/// Why a submit was refused before any network activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejection {
    /// The trimmed draft was empty; a validation banner was raised.
    EmptyDraft,
    /// A send attempt is already in flight; submits are serialized and
    /// this one is a no-op.
    AttemptInFlight,
}

/// Immutable view of the engine, published after every applied event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSnapshot {
    pub conversation_id: ConversationId,
    pub timeline: Vec<TimelineMessage>,
    pub draft: String,
    /// True while an attempt is submitting; the send control disables on
    /// this flag alone.
    pub sending: bool,
    pub send_step: Option<SendStep>,
    pub banner: Option<ErrorBanner>,
    /// True once the feed has delivered at least one snapshot.
    pub synced: bool,
}

/// Rollback bookkeeping for the attempt currently in flight.
#[derive(Debug, Clone)]
struct InFlightSend {
    target: SendTarget,
    provisional_id: ProvisionalId,
    submitted_text: String,
}

/// Reconciliation engine for one conversation.
///
/// Owns the draft, the optimistic overlay, the authoritative message
/// sequence, the send state machine, and the error banner. All mutation
/// happens through discrete events applied on one logical thread; the
/// network steps themselves live in [`crate::pipeline::run_send`].
pub struct ChatEngine {
    session: SessionContext,
    conversation_id: ConversationId,
    draft: String,
    send_state: SendState,
    next_attempt: u64,
    in_flight: Option<InFlightSend>,
    authoritative: Vec<MessageRecord>,
    overlay: OverlaySet,
    banner: Option<ErrorBanner>,
    synced: bool,
}

impl ChatEngine {
    pub fn new(session: SessionContext, conversation_id: ConversationId) -> Self {
        Self::with_attempt_seed(session, conversation_id, 1)
    }

    /// `attempt_seed` is the first attempt id this engine may issue.
    /// Successor engines are seeded from the predecessor's watermark so a
    /// stale pipeline event can never alias a new attempt after a
    /// conversation switch and back.
    pub fn with_attempt_seed(
        session: SessionContext,
        conversation_id: ConversationId,
        attempt_seed: u64,
    ) -> Self {
        Self {
            session,
            conversation_id,
            draft: String::new(),
            send_state: SendState::Idle,
            next_attempt: attempt_seed.max(1),
            in_flight: None,
            authoritative: Vec::new(),
            overlay: OverlaySet::default(),
            banner: None,
            synced: false,
        }
    }

    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    /// First attempt id a successor engine may use.
    pub fn attempt_watermark(&self) -> u64 {
        self.next_attempt
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn send_state(&self) -> &SendState {
        &self.send_state
    }

    /// Replaces the draft text. Ignored while an attempt is submitting:
    /// the input is disabled then and a racing edit must not clobber the
    /// rollback text.
    pub fn set_draft(&mut self, text: impl Into<String>) {
        let text = text.into();
        let transition = SendTransition::Draft {
            has_text: !text.trim().is_empty(),
        };
        match self.send_state.apply(transition) {
            Ok(next) => {
                self.send_state = next;
                self.draft = text;
            }
            Err(rejection) => {
                tracing::debug!(?rejection, "draft edit ignored");
            }
        }
    }

    /// Starts a send attempt. Validation, the provisional overlay entry,
    /// the draft clear, and the move to `Submitting(Insert)` all happen
    /// synchronously, so the optimistic entry is observable before any
    /// network call resolves.
    pub fn begin_send(&mut self) -> Result<SendAttempt, SubmitRejection> {
        if self.send_state.is_submitting() {
            return Err(SubmitRejection::AttemptInFlight);
        }

        let content = self.draft.trim().to_string();
        if content.is_empty() {
            self.banner = Some(ErrorBanner::Validation {
                reason: "Message text must not be empty.".to_string(),
            });
            return Err(SubmitRejection::EmptyDraft);
        }

        let target = SendTarget::new(
            self.conversation_id,
            SendAttemptId::new(self.next_attempt),
        );
        self.next_attempt = self.next_attempt.saturating_add(1);

        match self.send_state.apply(SendTransition::Begin(target)) {
            Ok(next) => self.send_state = next,
            Err(rejection) => {
                tracing::debug!(?rejection, "submit refused by state machine");
                return Err(SubmitRejection::AttemptInFlight);
            }
        }

        let provisional = ProvisionalMessage::new(self.session.author_id, content.clone());
        let provisional_id = provisional.id;
        self.overlay.push(provisional);
        self.in_flight = Some(InFlightSend {
            target,
            provisional_id,
            submitted_text: content.clone(),
        });
        self.draft.clear();
        self.banner = None;

        Ok(SendAttempt {
            target,
            author_id: self.session.author_id,
            content,
            provisional_id,
        })
    }

    /// Applies one pipeline progress event. Events whose target does not
    /// match the attempt in flight are dropped; that is how completions
    /// for an unselected conversation are tolerated without error.
    pub fn apply_send_event(&mut self, event: SendEvent) {
        let Some(in_flight) = self.in_flight.clone() else {
            tracing::debug!(event_target = ?event.target, "dropping pipeline event with no attempt in flight");
            return;
        };
        if in_flight.target != event.target {
            tracing::debug!(
                active = ?in_flight.target,
                stale = ?event.target,
                "dropping stale pipeline event"
            );
            return;
        }

        match event.payload {
            SendEventPayload::Stepped(step) => {
                if let Ok(next) = self.send_state.apply(SendTransition::Step {
                    target: event.target,
                    step,
                }) {
                    self.send_state = next;
                }
            }
            SendEventPayload::Completed { message_id } => {
                if let Ok(next) = self
                    .send_state
                    .apply(SendTransition::Settle(event.target))
                {
                    self.send_state = next;
                }
                // The overlay entry stays until the feed confirms; removal
                // happens only through the feed-clears-overlay rule.
                self.in_flight = None;
                tracing::debug!(message_id = %message_id, "send attempt settled");
            }
            SendEventPayload::InsertFailed { details } => {
                if let Ok(next) = self.send_state.apply(SendTransition::Fail {
                    target: event.target,
                    failure: SendFailure::Insert {
                        details: details.clone(),
                    },
                }) {
                    self.send_state = next;
                }
                // Full rollback: the provisional entry goes, the draft comes back.
                self.overlay.discard(in_flight.provisional_id);
                self.draft = in_flight.submitted_text;
                self.in_flight = None;
                self.banner = Some(ErrorBanner::SendFailed { details });
            }
            SendEventPayload::TriggerFailed {
                message_id,
                details,
            } => {
                if let Ok(next) = self.send_state.apply(SendTransition::Fail {
                    target: event.target,
                    failure: SendFailure::Trigger {
                        details: details.clone(),
                    },
                }) {
                    self.send_state = next;
                }
                // The message is durable: keep it visible, do not restore
                // the draft, and explain with a banner distinct from
                // SendFailed.
                self.in_flight = None;
                self.banner = Some(ErrorBanner::TriggerFailed { details });
                tracing::debug!(message_id = %message_id, "send settled without responder trigger");
            }
        }
    }

    /// Applies one feed push. A snapshot means the store has caught up, so
    /// every provisional entry is dropped regardless of the push contents.
    pub fn apply_feed_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Snapshot(records) => {
                self.authoritative = records;
                self.overlay.clear();
                self.synced = true;
                // A push proves the transport recovered; send banners stay
                // until dismissed or the next submit.
                if self
                    .banner
                    .as_ref()
                    .is_some_and(ErrorBanner::is_connection_lost)
                {
                    self.banner = None;
                }
            }
            FeedEvent::Lost { details } => {
                tracing::warn!(
                    conversation = %self.conversation_id,
                    details = %details,
                    "live timeline feed lost"
                );
                // Stale-but-visible beats blank: keep the last view.
                self.banner = Some(ErrorBanner::ConnectionLost { details });
            }
        }
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    /// The merged render sequence: authoritative rows then overlay entries.
    pub fn timeline(&self) -> Vec<TimelineMessage> {
        merge_timeline(&self.authoritative, &self.overlay)
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        let (sending, send_step) = match &self.send_state {
            SendState::Submitting { step, .. } => (true, Some(*step)),
            _ => (false, None),
        };

        ChatSnapshot {
            conversation_id: self.conversation_id,
            timeline: self.timeline(),
            draft: self.draft.clone(),
            sending,
            send_step,
            banner: self.banner.clone(),
            synced: self.synced,
        }
    }
}
