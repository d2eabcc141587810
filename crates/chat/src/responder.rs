use snafu::Snafu;

use parlor_storage::{AuthorId, BoxFuture, ConversationId, MessageId};

/// Inputs for one responder invocation: enough context for the external
/// service to load the conversation and produce a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerRequest {
    pub conversation_id: ConversationId,
    pub message_id: MessageId,
    pub author_id: AuthorId,
    pub content: String,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TriggerError {
    #[snafu(display("responder transport failed at {stage}: {details}"))]
    Transport {
        stage: &'static str,
        details: String,
    },
    #[snafu(display("responder rejected {stage}: {details}"))]
    Rejected {
        stage: &'static str,
        details: String,
    },
}

pub type TriggerResult<T> = Result<T, TriggerError>;

/// Seam to the external automated responder.
///
/// Success means the request was accepted, nothing more: the reply is
/// produced asynchronously and arrives later through the message feed.
pub trait ResponderTrigger: Send + Sync {
    fn trigger_response(&self, request: TriggerRequest) -> BoxFuture<'_, TriggerResult<()>>;
}
