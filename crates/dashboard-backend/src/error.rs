use thiserror::Error;

/// Failure of a single backend call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The request never produced a response (connect, timeout, TLS, ...).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-2xx status. `message` comes from the error envelope when present.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// 2xx response that reported `success: false`.
    #[error("Rejected by backend: {0}")]
    Rejected(String),

    /// Body did not have the expected shape.
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl BackendError {
    /// True for failures where the server never saw (or never answered) the request.
    pub fn is_transport(&self) -> bool {
        matches!(self, BackendError::Transport(_))
    }

    /// Short text suitable for a transient user-visible notice.
    pub fn user_message(&self) -> String {
        match self {
            BackendError::Transport(_) => "Network error. Please try again.".to_string(),
            BackendError::Status { message, .. } | BackendError::Rejected(message)
                if !message.is_empty() =>
            {
                message.clone()
            }
            BackendError::Malformed(_) => "Unexpected response from server".to_string(),
            _ => "Request failed".to_string(),
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;
