use dashboard_backend::BackendError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WatchlistError {
    /// Rejected locally; no request was sent.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unknown watchlist: {0}")]
    UnknownWatchlist(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Mutation lane closed before the request settled")]
    LaneClosed,
}

impl WatchlistError {
    pub fn validation(msg: impl Into<String>) -> Self {
        WatchlistError::Validation(msg.into())
    }

    /// Text for a transient notice.
    pub fn user_message(&self) -> String {
        match self {
            WatchlistError::Validation(msg) => msg.clone(),
            WatchlistError::UnknownWatchlist(_) => "Watchlist no longer exists".to_string(),
            WatchlistError::Backend(e) => e.user_message(),
            WatchlistError::LaneClosed => "Request was interrupted".to_string(),
        }
    }
}

pub type WatchlistResult<T> = Result<T, WatchlistError>;
