use std::sync::Arc;

use tokio::sync::mpsc;

use parlor_storage::{AuthorId, ChatStore, MessageId, NewMessage};

use crate::overlay::ProvisionalId;
use crate::responder::{ResponderTrigger, TriggerRequest};
use crate::send::{SendStep, SendTarget};

/// Data one attempt carries through the pipeline, captured at submit time
/// so the engine holds no borrow while the network steps run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendAttempt {
    pub target: SendTarget,
    pub author_id: AuthorId,
    pub content: String,
    pub provisional_id: ProvisionalId,
}

/// Progress report from one in-flight send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendEvent {
    pub target: SendTarget,
    pub payload: SendEventPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendEventPayload {
    /// The attempt advanced to the named step.
    Stepped(SendStep),
    /// All steps finished; the message is durable and the responder
    /// accepted the trigger.
    Completed { message_id: MessageId },
    /// The durable insert failed; nothing was persisted.
    InsertFailed { details: String },
    /// The message is durable but the responder was not notified.
    TriggerFailed { message_id: MessageId, details: String },
}

/// Drives insert → touch → trigger strictly in order for one attempt.
///
/// Runs detached from the engine so feed pushes keep being applied while
/// a step is suspended; progress travels back through `events`. The touch
/// step is best-effort: its failure is logged and never reaches the
/// attempt's result.
pub async fn run_send(
    attempt: SendAttempt,
    store: Arc<dyn ChatStore>,
    trigger: Arc<dyn ResponderTrigger>,
    events: mpsc::UnboundedSender<SendEvent>,
) {
    let target = attempt.target;
    let emit = |payload: SendEventPayload| {
        // A closed channel means the controller is gone; nothing to do.
        let _ = events.send(SendEvent { target, payload });
    };

    let inserted = store
        .insert_message(NewMessage {
            conversation_id: target.conversation_id,
            author_id: attempt.author_id,
            content: attempt.content.clone(),
        })
        .await;

    let record = match inserted {
        Ok(record) => record,
        Err(error) => {
            tracing::warn!(
                conversation = %target.conversation_id,
                error = %error,
                "message insert failed"
            );
            emit(SendEventPayload::InsertFailed {
                details: error.to_string(),
            });
            return;
        }
    };

    emit(SendEventPayload::Stepped(SendStep::Touch));
    if let Err(error) = store.touch_conversation(target.conversation_id).await {
        // Best-effort: the insert stands and the trigger still runs.
        tracing::warn!(
            conversation = %target.conversation_id,
            error = %error,
            "conversation touch failed"
        );
    }

    emit(SendEventPayload::Stepped(SendStep::Trigger));
    let request = TriggerRequest {
        conversation_id: target.conversation_id,
        message_id: record.id,
        author_id: attempt.author_id,
        content: attempt.content,
    };
    match trigger.trigger_response(request).await {
        Ok(()) => emit(SendEventPayload::Completed {
            message_id: record.id,
        }),
        Err(error) => {
            tracing::warn!(
                conversation = %target.conversation_id,
                message_id = %record.id,
                error = %error,
                "responder trigger failed"
            );
            emit(SendEventPayload::TriggerFailed {
                message_id: record.id,
                details: error.to_string(),
            });
        }
    }
}
