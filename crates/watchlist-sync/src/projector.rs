//! Projection of the active selection onto the instrument universe

use dashboard_backend::{Instrument, PriceTick};

use crate::models::{normalize_symbol, WatchlistCollection};
use crate::universe::InstrumentUniverse;

/// Title shown when no watchlist is active.
pub const DEFAULT_VIEW_TITLE: &str = "Stocks";

/// What the stock list should render.
#[derive(Debug, Clone, PartialEq)]
pub enum ListView {
    /// Default catalog, unfiltered, in catalog order
    Catalog { rows: Vec<Instrument> },
    /// Active watchlist items in watchlist order, one row per item
    Watchlist {
        id: String,
        name: String,
        rows: Vec<Instrument>,
    },
    /// Active watchlist with no items: show the "add instruments" call to action
    Empty { id: String, name: String },
}

impl Default for ListView {
    fn default() -> Self {
        ListView::Catalog { rows: Vec::new() }
    }
}

impl ListView {
    pub fn rows(&self) -> &[Instrument] {
        match self {
            ListView::Catalog { rows } | ListView::Watchlist { rows, .. } => rows,
            ListView::Empty { .. } => &[],
        }
    }

    pub fn title(&self) -> &str {
        match self {
            ListView::Catalog { .. } => DEFAULT_VIEW_TITLE,
            ListView::Watchlist { name, .. } | ListView::Empty { name, .. } => name,
        }
    }

    pub fn watchlist_id(&self) -> Option<&str> {
        match self {
            ListView::Catalog { .. } => None,
            ListView::Watchlist { id, .. } | ListView::Empty { id, .. } => Some(id),
        }
    }

    pub fn is_empty_state(&self) -> bool {
        matches!(self, ListView::Empty { .. })
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.rows().iter().map(|r| r.symbol.as_str()).collect()
    }

    /// Move the price of every displayed row for this symbol.
    /// Membership and order never change. Returns true if a row was touched.
    pub fn apply_tick(&mut self, tick: &PriceTick) -> bool {
        let rows = match self {
            ListView::Catalog { rows } | ListView::Watchlist { rows, .. } => rows,
            ListView::Empty { .. } => return false,
        };
        let symbol = normalize_symbol(&tick.symbol);
        let mut touched = false;
        for row in rows.iter_mut().filter(|r| r.symbol == symbol) {
            row.apply_price(tick.price);
            touched = true;
        }
        touched
    }
}

/// Derives the visible stock list. Reads only; never mutates its inputs.
pub struct ActiveViewProjector;

impl ActiveViewProjector {
    pub fn project(collection: &WatchlistCollection, universe: &InstrumentUniverse) -> ListView {
        let Some(watchlist) = collection.active_watchlist() else {
            return ListView::Catalog {
                rows: universe.catalog(),
            };
        };

        if watchlist.items.is_empty() {
            return ListView::Empty {
                id: watchlist.id.clone(),
                name: watchlist.name.clone(),
            };
        }

        // Unresolved symbols become placeholders so rows.len() == items.len().
        let rows = watchlist
            .items
            .iter()
            .map(|symbol| {
                universe
                    .get(symbol)
                    .cloned()
                    .unwrap_or_else(|| Instrument::placeholder(symbol.clone()))
            })
            .collect();

        ListView::Watchlist {
            id: watchlist.id.clone(),
            name: watchlist.name.clone(),
            rows,
        }
    }
}
