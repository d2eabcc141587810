use parlor_storage::AuthorId;

/// Identity of the signed-in user.
///
/// Passed explicitly into the engine and adapters at construction so the
/// pipeline is testable with a fixed identity; nothing here is looked up
/// ambiently. A missing identity means no engine is constructed at all;
/// submit is disabled by precondition, not by a runtime error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub author_id: AuthorId,
    pub access_token: Option<String>,
}

impl SessionContext {
    pub fn new(author_id: AuthorId) -> Self {
        Self {
            author_id,
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// The bearer token, when one was issued for this session.
    pub fn bearer_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }
}
