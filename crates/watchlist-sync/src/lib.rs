//! Watchlist state and synchronization
//!
//! Client-side engine behind the dashboard: an in-memory watchlist store,
//! optimistic sync with the backend over serialized per-watchlist lanes, the
//! projection of the active watchlist onto live instrument data, and a
//! drag-and-drop reorder state machine.

pub mod error;
pub mod live_view;
pub mod models;
pub mod notice;
pub mod order_ticket;
pub mod projector;
pub mod reorder;
pub mod store;
pub mod sync;
pub mod universe;
#[cfg(test)]
mod tests;

pub use dashboard_backend::{Instrument, PriceTick, Watchlist};
pub use error::{WatchlistError, WatchlistResult};
pub use live_view::LiveView;
pub use models::{normalize_symbol, ActiveWatchlist, Membership, WatchlistCollection};
pub use notice::{Notice, NoticeLevel, Notifier};
pub use order_ticket::{OrderDesk, OrderTicket};
pub use projector::{ActiveViewProjector, ListView, DEFAULT_VIEW_TITLE};
pub use reorder::{DragSession, DropOutcome, ReorderCommit, ReorderContainer, ReorderController};
pub use store::{RemovedWatchlist, StoreEvent, WatchlistStore};
pub use sync::{Pending, WatchlistSync};
pub use universe::{InstrumentUniverse, SharedUniverse, UniverseEvent};
