use thiserror::Error;

/// Failures a capsule action can surface to the user.
///
/// None of these are fatal: each one maps to a notice and the caller returns
/// to an interactive state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapsuleError {
    /// Missing or malformed input. Nothing was changed.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The viewer is not allowed to perform this action on this capsule.
    #[error("not permitted: {0}")]
    Forbidden(String),

    /// The capsule's state no longer allows the action (e.g. deleting an opened capsule).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("capsule not found")]
    NotFound,

    /// No session, or the session token was rejected.
    #[error("not logged in")]
    Unauthenticated,

    /// Storage or network failure. Not retried; the user may try again.
    #[error("backend unavailable: {0}")]
    Backend(String),
}

impl CapsuleError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }

    /// The message without the kind prefix, for sending across the wire.
    pub fn detail(&self) -> String {
        match self {
            Self::Validation(m) | Self::Forbidden(m) | Self::Conflict(m) | Self::Backend(m) => m.clone(),
            other => other.to_string(),
        }
    }

    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Backend(_))
    }
}
