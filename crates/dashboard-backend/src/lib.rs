pub mod error;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

pub use error::{BackendError, BackendResult};

// ---------------------------------------------------------------------------
// Watchlists
// ---------------------------------------------------------------------------

/// A named, ordered set of ticker symbols. `id` is assigned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Watchlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub items: Vec<String>,
}

impl Watchlist {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            items: Vec::new(),
        }
    }

    pub fn with_items<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for item in items {
            let item = item.into();
            if !self.items.contains(&item) {
                self.items.push(item);
            }
        }
        self
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.items.iter().any(|s| s == symbol)
    }

    pub fn position_of(&self, symbol: &str) -> Option<usize> {
        self.items.iter().position(|s| s == symbol)
    }

    /// Drop repeated symbols, keeping the first occurrence.
    pub fn dedup_items(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.items.retain(|s| seen.insert(s.clone()));
    }
}

/// Body of `GET /api/watchlist/{id}`: the list name plus enriched rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistDetail {
    pub watchlist_name: String,
    #[serde(default)]
    pub items: Vec<Instrument>,
}

// ---------------------------------------------------------------------------
// Instruments and prices
// ---------------------------------------------------------------------------

/// A tradable symbol with its latest quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub price: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub change: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub change_percent: f64,
}

impl Instrument {
    /// Stand-in row for a symbol with no quote data yet.
    pub fn placeholder(symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        Self {
            name: symbol.clone(),
            symbol,
            price: 0.0,
            change: 0.0,
            change_percent: 0.0,
        }
    }

    pub fn is_positive(&self) -> bool {
        self.change >= 0.0
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.symbol
        } else {
            &self.name
        }
    }

    /// Move the last price, recomputing change against the implied previous close.
    /// An instrument that was never priced takes the tick as its baseline.
    pub fn apply_price(&mut self, price: f64) {
        if self.price <= 0.0 {
            self.price = price;
            self.change = 0.0;
            self.change_percent = 0.0;
            return;
        }

        let previous_close = self.price - self.change;
        self.price = price;
        self.change = price - previous_close;
        self.change_percent = if previous_close != 0.0 {
            self.change / previous_close * 100.0
        } else {
            0.0
        };
    }
}

/// One `price_update` event from the realtime channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    pub symbol: String,
    pub price: f64,
}

impl PriceTick {
    pub fn new(symbol: impl Into<String>, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
        }
    }
}

fn zero_if_null<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

// ---------------------------------------------------------------------------
// Orders and account
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

impl std::str::FromStr for OrderSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(OrderSide::Buy),
            "sell" => Ok(OrderSide::Sell),
            other => Err(format!("unknown order side '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    Day,
    Gtc, // Good til canceled
}

/// Body of `POST /api/order`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRequest {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub qty: Decimal, // fractional quantities are allowed
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
}

impl OrderRequest {
    pub fn market(symbol: impl Into<String>, qty: Decimal, side: OrderSide) -> Self {
        Self {
            symbol: symbol.into(),
            qty,
            side,
            order_type: OrderType::Market,
            time_in_force: TimeInForce::Day,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub equity: Decimal,
}

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait DashboardBackend: Send + Sync {
    /// All watchlists of the current user, in persisted order
    async fn list_watchlists(&self) -> BackendResult<Vec<Watchlist>>;

    /// Create a watchlist; returns the name the server stored
    async fn create_watchlist(&self, name: &str) -> BackendResult<String>;

    async fn rename_watchlist(&self, id: &str, name: &str) -> BackendResult<()>;

    async fn delete_watchlist(&self, id: &str) -> BackendResult<()>;

    /// Watchlist name plus items enriched with quote data
    async fn get_watchlist(&self, id: &str) -> BackendResult<WatchlistDetail>;

    async fn add_item(&self, watchlist_id: &str, symbol: &str) -> BackendResult<()>;

    async fn remove_item(&self, watchlist_id: &str, symbol: &str) -> BackendResult<()>;

    /// Persist the order of the watchlists themselves
    async fn reorder_watchlists(&self, ordered_ids: &[String]) -> BackendResult<()>;

    /// Persist the order of one watchlist's items
    async fn reorder_items(&self, watchlist_id: &str, ordered_items: &[String])
        -> BackendResult<()>;

    /// Default instrument catalog
    async fn list_instruments(&self) -> BackendResult<Vec<Instrument>>;

    async fn submit_order(&self, order: &OrderRequest) -> BackendResult<OrderReceipt>;

    async fn get_account_info(&self) -> BackendResult<AccountInfo>;

    /// Backend name for logging
    fn backend_name(&self) -> &str;
}
