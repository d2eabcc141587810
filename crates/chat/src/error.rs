use std::fmt;

/// Recoverable errors surfaced to the user as a dismissible banner.
///
/// This is the full taxonomy the engine signals upward. `SendFailed` and
/// `TriggerFailed` are deliberately distinct: the first means nothing was
/// persisted and the draft was restored, the second means the message is
/// durable but no automated reply will arrive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorBanner {
    /// Local pre-flight rejection; never reached the network.
    Validation { reason: String },
    /// The durable insert failed; the draft was restored.
    SendFailed { details: String },
    /// The message persisted but the responder was not notified.
    TriggerFailed { details: String },
    /// The live feed or query transport failed; the view may be stale and
    /// recovery is an explicit reload.
    ConnectionLost { details: String },
}

impl ErrorBanner {
    /// Short user-facing text for the banner body.
    pub fn user_text(&self) -> &str {
        match self {
            Self::Validation { reason } => reason,
            Self::SendFailed { .. } => "Failed to send message. Please try again.",
            Self::TriggerFailed { .. } => "Failed to trigger AI response. Please try again.",
            Self::ConnectionLost { .. } => "Failed to connect to chat. Please refresh the page.",
        }
    }

    pub fn is_connection_lost(&self) -> bool {
        matches!(self, Self::ConnectionLost { .. })
    }
}

impl fmt::Display for ErrorBanner {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { reason } => write!(formatter, "validation failed: {reason}"),
            Self::SendFailed { details } => write!(formatter, "send failed: {details}"),
            Self::TriggerFailed { details } => {
                write!(formatter, "responder trigger failed: {details}")
            }
            Self::ConnectionLost { details } => write!(formatter, "connection lost: {details}"),
        }
    }
}
