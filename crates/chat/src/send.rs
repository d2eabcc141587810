use parlor_storage::ConversationId;

/// Identifier for one send attempt.
///
/// Attempt ids are monotone across the life of a controller, including
/// conversation switches, so a stale pipeline event can never alias a
/// newer attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SendAttemptId(pub u64);

impl SendAttemptId {
    /// Creates a typed attempt identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Routing key for pipeline events: which conversation, which attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SendTarget {
    pub conversation_id: ConversationId,
    pub attempt: SendAttemptId,
}

impl SendTarget {
    /// Builds a full routing key from conversation and attempt ids.
    pub const fn new(conversation_id: ConversationId, attempt: SendAttemptId) -> Self {
        Self {
            conversation_id,
            attempt,
        }
    }
}

/// The network step a submitting attempt is currently suspended on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SendStep {
    Insert,
    Touch,
    Trigger,
}

/// Terminal failure classification for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendFailure {
    /// The durable insert failed; nothing was persisted.
    Insert { details: String },
    /// The message persisted but the responder was never notified.
    Trigger { details: String },
}

/// Send-attempt lifecycle for the bound conversation.
///
/// `Idle`/`Drafting` are local-only; `Submitting` covers the three
/// strictly sequential network steps; `Settled`/`Failed` are terminal per
/// attempt and a new attempt may begin from either.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SendState {
    #[default]
    Idle,
    Drafting,
    Submitting {
        target: SendTarget,
        step: SendStep,
    },
    Settled(SendTarget),
    Failed {
        target: SendTarget,
        failure: SendFailure,
    },
}

/// State transition input for the send lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendTransition {
    Draft { has_text: bool },
    Begin(SendTarget),
    Step { target: SendTarget, step: SendStep },
    Settle(SendTarget),
    Fail { target: SendTarget, failure: SendFailure },
}

/// Rejection reason for illegal send transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendTransitionRejection {
    AlreadySubmitting {
        active: SendTarget,
        attempted: SendTarget,
    },
    InputLocked {
        active: SendTarget,
    },
    NoActiveAttempt,
    AttemptMismatch {
        active: SendTarget,
        attempted: SendTarget,
    },
}

/// Result type for send transition application.
pub type SendTransitionResult = Result<SendState, SendTransitionRejection>;

impl SendState {
    /// Returns the active routing key if and only if an attempt is submitting.
    pub fn submitting_target(&self) -> Option<SendTarget> {
        match self {
            Self::Submitting { target, .. } => Some(*target),
            Self::Idle | Self::Drafting | Self::Settled(_) | Self::Failed { .. } => None,
        }
    }

    /// True while the send control must stay disabled.
    pub fn is_submitting(&self) -> bool {
        matches!(self, Self::Submitting { .. })
    }

    /// Returns true when a pipeline event matches the active attempt.
    pub fn accepts_pipeline_event(&self, target: SendTarget) -> bool {
        matches!(self, Self::Submitting { target: active, .. } if *active == target)
    }

    /// Applies one transition deterministically.
    ///
    /// Any non-submitting state may begin a new attempt. Step, settle, and
    /// fail must match the currently active attempt exactly.
    pub fn apply(&self, transition: SendTransition) -> SendTransitionResult {
        match transition {
            SendTransition::Draft { has_text } => self.apply_draft(has_text),
            SendTransition::Begin(target) => self.apply_begin(target),
            SendTransition::Step { target, step } => self.apply_step(target, step),
            SendTransition::Settle(target) => self.apply_settle(target),
            SendTransition::Fail { target, failure } => self.apply_fail(target, failure),
        }
    }

    fn apply_draft(&self, has_text: bool) -> SendTransitionResult {
        match self {
            Self::Submitting { target, .. } => {
                Err(SendTransitionRejection::InputLocked { active: *target })
            }
            Self::Idle | Self::Drafting | Self::Settled(_) | Self::Failed { .. } => {
                Ok(if has_text { Self::Drafting } else { Self::Idle })
            }
        }
    }

    fn apply_begin(&self, target: SendTarget) -> SendTransitionResult {
        match self {
            Self::Submitting { target: active, .. } => {
                Err(SendTransitionRejection::AlreadySubmitting {
                    active: *active,
                    attempted: target,
                })
            }
            Self::Idle | Self::Drafting | Self::Settled(_) | Self::Failed { .. } => {
                Ok(Self::Submitting {
                    target,
                    step: SendStep::Insert,
                })
            }
        }
    }

    fn apply_step(&self, target: SendTarget, step: SendStep) -> SendTransitionResult {
        match self {
            Self::Submitting { target: active, .. } if *active == target => {
                Ok(Self::Submitting { target, step })
            }
            Self::Submitting { target: active, .. } => {
                Err(SendTransitionRejection::AttemptMismatch {
                    active: *active,
                    attempted: target,
                })
            }
            Self::Idle | Self::Drafting | Self::Settled(_) | Self::Failed { .. } => {
                Err(SendTransitionRejection::NoActiveAttempt)
            }
        }
    }

    fn apply_settle(&self, target: SendTarget) -> SendTransitionResult {
        match self {
            Self::Submitting { target: active, .. } if *active == target => {
                Ok(Self::Settled(target))
            }
            Self::Submitting { target: active, .. } => {
                Err(SendTransitionRejection::AttemptMismatch {
                    active: *active,
                    attempted: target,
                })
            }
            Self::Idle | Self::Drafting | Self::Settled(_) | Self::Failed { .. } => {
                Err(SendTransitionRejection::NoActiveAttempt)
            }
        }
    }

    fn apply_fail(&self, target: SendTarget, failure: SendFailure) -> SendTransitionResult {
        match self {
            Self::Submitting { target: active, .. } if *active == target => {
                Ok(Self::Failed { target, failure })
            }
            Self::Submitting { target: active, .. } => {
                Err(SendTransitionRejection::AttemptMismatch {
                    active: *active,
                    attempted: target,
                })
            }
            Self::Idle | Self::Drafting | Self::Settled(_) | Self::Failed { .. } => {
                Err(SendTransitionRejection::NoActiveAttempt)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(attempt: u64) -> SendTarget {
        SendTarget::new(ConversationId::mint(), SendAttemptId::new(attempt))
    }

    #[test]
    fn drafting_follows_text_presence() {
        let state = SendState::Idle;
        let state = state
            .apply(SendTransition::Draft { has_text: true })
            .expect("typing should be legal when idle");
        assert_eq!(state, SendState::Drafting);

        let state = state
            .apply(SendTransition::Draft { has_text: false })
            .expect("clearing should be legal when drafting");
        assert_eq!(state, SendState::Idle);
    }

    #[test]
    fn begin_moves_to_submitting_insert() {
        let target = target(1);
        let state = SendState::Drafting
            .apply(SendTransition::Begin(target))
            .expect("begin from drafting should be legal");
        assert_eq!(
            state,
            SendState::Submitting {
                target,
                step: SendStep::Insert
            }
        );
    }

    #[test]
    fn second_begin_while_submitting_is_rejected() {
        let first = target(1);
        let second = target(2);
        let state = SendState::Drafting
            .apply(SendTransition::Begin(first))
            .expect("first begin should be legal");

        let rejection = state
            .apply(SendTransition::Begin(second))
            .expect_err("submits must be serialized");
        assert_eq!(
            rejection,
            SendTransitionRejection::AlreadySubmitting {
                active: first,
                attempted: second
            }
        );
    }

    #[test]
    fn typing_is_locked_while_submitting() {
        let target = target(1);
        let state = SendState::Drafting
            .apply(SendTransition::Begin(target))
            .expect("begin should be legal");

        let rejection = state
            .apply(SendTransition::Draft { has_text: true })
            .expect_err("input is disabled while submitting");
        assert_eq!(
            rejection,
            SendTransitionRejection::InputLocked { active: target }
        );
    }

    #[test]
    fn steps_advance_only_for_the_active_attempt() {
        let active = target(1);
        let stale = target(7);
        let state = SendState::Drafting
            .apply(SendTransition::Begin(active))
            .expect("begin should be legal");

        let state = state
            .apply(SendTransition::Step {
                target: active,
                step: SendStep::Touch,
            })
            .expect("matching step should advance");
        assert_eq!(
            state,
            SendState::Submitting {
                target: active,
                step: SendStep::Touch
            }
        );

        let rejection = state
            .apply(SendTransition::Step {
                target: stale,
                step: SendStep::Trigger,
            })
            .expect_err("stale step must be rejected");
        assert_eq!(
            rejection,
            SendTransitionRejection::AttemptMismatch {
                active,
                attempted: stale
            }
        );
    }

    #[test]
    fn settle_and_fail_require_an_active_attempt() {
        let target = target(1);
        assert_eq!(
            SendState::Idle.apply(SendTransition::Settle(target)),
            Err(SendTransitionRejection::NoActiveAttempt)
        );
        assert_eq!(
            SendState::Settled(target).apply(SendTransition::Fail {
                target,
                failure: SendFailure::Insert {
                    details: "late".to_string()
                }
            }),
            Err(SendTransitionRejection::NoActiveAttempt)
        );
    }

    #[test]
    fn failed_attempt_records_the_failure_kind() {
        let target = target(3);
        let state = SendState::Drafting
            .apply(SendTransition::Begin(target))
            .expect("begin should be legal");
        let failure = SendFailure::Trigger {
            details: "action refused".to_string(),
        };

        let state = state
            .apply(SendTransition::Fail {
                target,
                failure: failure.clone(),
            })
            .expect("matching fail should be legal");
        assert_eq!(state, SendState::Failed { target, failure });
        assert!(!state.is_submitting());
    }

    #[test]
    fn new_attempt_may_begin_after_terminal_states() {
        let first = target(1);
        let second = target(2);

        let settled = SendState::Settled(first);
        assert!(settled.apply(SendTransition::Begin(second)).is_ok());

        let failed = SendState::Failed {
            target: first,
            failure: SendFailure::Insert {
                details: "offline".to_string(),
            },
        };
        assert!(failed.apply(SendTransition::Begin(second)).is_ok());
    }

    #[test]
    fn pipeline_event_acceptance_is_target_exact() {
        let active = target(1);
        let state = SendState::Drafting
            .apply(SendTransition::Begin(active))
            .expect("begin should be legal");

        assert!(state.accepts_pipeline_event(active));
        assert!(!state.accepts_pipeline_event(target(2)));
        assert!(!SendState::Settled(active).accepts_pipeline_event(active));
    }
}
