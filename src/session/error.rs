use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Transition is not legal from the current state")]
    InvalidState,

    #[error("Question index is out of order: expected {expected}, got {got}")]
    OutOfOrder { expected: usize, got: usize },

    #[error("Question index is out of range")]
    OutOfRange,

    #[error("Answer already submitted for this question")]
    DuplicateSubmission,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("No active session for this code")]
    SessionNotFound,

    #[error("Persistence failed: {0}")]
    Storage(#[from] StoreError),
}

impl SessionError {
    /// Stable code reported to clients in `session_error` events.
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::InvalidState => "invalid_state",
            SessionError::OutOfOrder { .. } => "out_of_order",
            SessionError::OutOfRange => "out_of_range",
            SessionError::DuplicateSubmission => "duplicate_submission",
            SessionError::NotFound(_) => "not_found",
            SessionError::SessionNotFound => "session_not_found",
            SessionError::Storage(_) => "storage_error",
        }
    }
}
