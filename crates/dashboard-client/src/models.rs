use dashboard_backend::{Instrument, Watchlist};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct WatchlistsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub watchlists: Vec<Watchlist>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateWatchlistRequest<'a> {
    pub watchlist_name: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateWatchlistResponse {
    #[serde(default)]
    pub success: bool,
    pub watchlist_name: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenameWatchlistRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct WatchlistItemRequest<'a> {
    pub watchlist_id: &'a str,
    pub symbol: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReorderWatchlistsRequest<'a> {
    pub ordered_ids: &'a [String],
}

#[derive(Debug, Clone, Serialize)]
pub struct ReorderItemsRequest<'a> {
    pub watchlist_id: &'a str,
    pub ordered_items: &'a [String],
}

/// `/api/stocks` has shipped both as a bare array and wrapped in an object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CatalogResponse {
    List(Vec<Instrument>),
    Wrapped { stocks: Vec<Instrument> },
}

impl CatalogResponse {
    pub fn into_instruments(self) -> Vec<Instrument> {
        match self {
            CatalogResponse::List(items) | CatalogResponse::Wrapped { stocks: items } => items,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorDetails {
    pub message: Option<String>,
}

/// `{error, details: {message}}` returned with non-2xx statuses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorEnvelope {
    pub error: Option<String>,
    pub details: Option<ErrorDetails>,
}

impl ErrorEnvelope {
    /// Most specific message available: `details.message`, then `error`.
    pub fn message(&self) -> Option<String> {
        self.details
            .as_ref()
            .and_then(|d| d.message.clone())
            .or_else(|| self.error.clone())
            .filter(|m| !m.is_empty())
    }
}

/// Extract a human-readable message from an error body, falling back to the raw text.
pub fn error_message_from_body(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|env| env.message())
        .unwrap_or_else(|| body.trim().to_string())
}
