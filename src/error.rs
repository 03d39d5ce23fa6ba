//! Error types shared across the dispatch service.

use thiserror::Error;

/// Result type alias for dispatch operations
pub type Result<T> = std::result::Result<T, DispatchError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("post not found: {0}")]
    PostNotFound(String),

    #[error("notification not found: {0}")]
    NotificationNotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DispatchError {
    /// HTTP status code for this error on the read surface.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UserNotFound(_) | Self::PostNotFound(_) | Self::NotificationNotFound(_) => 404,
            Self::Internal(_) => 500,
        }
    }
}
