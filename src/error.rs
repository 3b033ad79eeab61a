use thiserror::Error;
use warp::http::StatusCode;

/// Custom error types for the signaling server
#[derive(Debug, Error)]
pub enum SignalError {
    /// Authentication and authorization errors
    #[error("Not authenticated: {0}")]
    Unauthenticated(String),

    #[error("Invalid room secret for room {0}")]
    Unauthorized(String),

    /// Room registry errors
    #[error("Room {0} not found")]
    RoomNotFound(String),

    #[error("Room {0} already exists")]
    RoomAlreadyExists(String),

    #[error("Room id {0} is not a 6-digit code")]
    Validation(String),

    #[error("Room id generation exhausted retry budget of {0}")]
    Conflict(u32),

    /// Storage backend errors
    #[error("Room store error: {0}")]
    Store(String),

    /// Account directory errors
    #[error("Account directory error: {0}")]
    Directory(String),

    /// Signaling errors
    #[error("Invalid signaling message: {0}")]
    InvalidSignalingMessage(String),

    #[error("Failed to serialize message: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// Generic errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Convenience type alias for Results using SignalError
pub type Result<T> = std::result::Result<T, SignalError>;

impl SignalError {
    /// Helper to create Internal errors with context
    pub fn internal(msg: impl Into<String>) -> Self {
        SignalError::Internal(msg.into())
    }

    /// Helper to create Store errors
    pub fn store(msg: impl Into<String>) -> Self {
        SignalError::Store(msg.into())
    }

    /// HTTP status the REST layer reports for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            SignalError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            SignalError::Unauthorized(_) => StatusCode::FORBIDDEN,
            SignalError::RoomNotFound(_) => StatusCode::NOT_FOUND,
            SignalError::Validation(_) => StatusCode::BAD_REQUEST,
            SignalError::Conflict(_) | SignalError::RoomAlreadyExists(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for SignalError {
    fn from(err: reqwest::Error) -> Self {
        SignalError::Directory(err.to_string())
    }
}
