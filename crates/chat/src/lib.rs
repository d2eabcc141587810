#![deny(unsafe_code)]

//! Optimistic send and real-time reconciliation for one conversation.
//!
//! The engine renders a submitted message immediately, drives the durable
//! insert, the best-effort conversation touch, and the responder trigger
//! strictly in order, and merges the provisional overlay with the
//! authoritative feed into one render sequence. The remote store and the
//! responder are reached only through trait boundaries.

/// Event loop binding the engine to the feed and the send pipeline.
pub mod controller;
/// The reconciliation engine: reducer, snapshot, submit validation.
pub mod engine;
/// The user-facing error taxonomy.
pub mod error;
/// Provisional messages awaiting store confirmation.
pub mod overlay;
/// The sequential insert → touch → trigger flow.
pub mod pipeline;
/// Seam to the external automated responder.
pub mod responder;
/// Deterministic send-attempt state machine.
pub mod send;
/// Explicit session identity.
pub mod session;
/// Merge of authoritative and provisional state.
pub mod timeline;

#[cfg(test)]
pub(crate) mod test_support;

pub use controller::{ChatCommand, ChatController, ChatHandle};
pub use engine::{ChatEngine, ChatSnapshot, SubmitRejection};
pub use error::ErrorBanner;
pub use overlay::{OverlaySet, PROVISIONAL_ID_PREFIX, ProvisionalId, ProvisionalMessage};
pub use pipeline::{SendAttempt, SendEvent, SendEventPayload, run_send};
pub use responder::{ResponderTrigger, TriggerError, TriggerRequest, TriggerResult};
pub use send::{
    SendAttemptId, SendFailure, SendState, SendStep, SendTarget, SendTransition,
    SendTransitionRejection, SendTransitionResult,
};
pub use session::SessionContext;
pub use timeline::{TimelineId, TimelineMessage, merge_timeline};
