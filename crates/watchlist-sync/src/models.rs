//! Watchlist collection model

use dashboard_backend::Watchlist;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{WatchlistError, WatchlistResult};

/// Trim and upper-case a ticker symbol.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Which list drives the visible stock list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActiveWatchlist {
    /// The default instrument catalog
    #[default]
    Default,
    Watchlist(String),
}

impl ActiveWatchlist {
    pub fn from_id(id: Option<&str>) -> Self {
        match id {
            Some(id) => ActiveWatchlist::Watchlist(id.to_string()),
            None => ActiveWatchlist::Default,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            ActiveWatchlist::Default => None,
            ActiveWatchlist::Watchlist(id) => Some(id),
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, ActiveWatchlist::Default)
    }
}

/// One row of the "add to watchlist" picker for a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Membership {
    pub watchlist_id: String,
    pub name: String,
    pub item_count: usize,
    pub contains: bool,
}

/// Ordered watchlists plus the active selection.
///
/// Invariant: `active` is either `Default` or names a watchlist in `watchlists`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchlistCollection {
    watchlists: Vec<Watchlist>,
    active: ActiveWatchlist,
}

impl WatchlistCollection {
    pub fn new(watchlists: Vec<Watchlist>) -> Self {
        let mut collection = Self::default();
        collection.replace_all(watchlists);
        collection
    }

    pub fn watchlists(&self) -> &[Watchlist] {
        &self.watchlists
    }

    pub fn len(&self) -> usize {
        self.watchlists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watchlists.is_empty()
    }

    pub fn active(&self) -> &ActiveWatchlist {
        &self.active
    }

    pub fn get(&self, id: &str) -> Option<&Watchlist> {
        self.watchlists.iter().find(|w| w.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.watchlists.iter().position(|w| w.id == id)
    }

    /// Most recently listed watchlist with this name.
    pub fn find_by_name(&self, name: &str) -> Option<&Watchlist> {
        self.watchlists.iter().rev().find(|w| w.name == name)
    }

    pub fn active_watchlist(&self) -> Option<&Watchlist> {
        self.active.id().and_then(|id| self.get(id))
    }

    pub fn ids(&self) -> Vec<String> {
        self.watchlists.iter().map(|w| w.id.clone()).collect()
    }

    pub fn membership(&self, symbol: &str) -> Vec<Membership> {
        let symbol = normalize_symbol(symbol);
        self.watchlists
            .iter()
            .map(|w| Membership {
                watchlist_id: w.id.clone(),
                name: w.name.clone(),
                item_count: w.items.len(),
                contains: w.contains(&symbol),
            })
            .collect()
    }

    /// Replace every watchlist. Returns true if the active selection had to revert.
    pub(crate) fn replace_all(&mut self, watchlists: Vec<Watchlist>) -> bool {
        let mut seen = HashSet::new();
        self.watchlists = watchlists
            .into_iter()
            .filter(|w| seen.insert(w.id.clone()))
            .map(|mut w| {
                w.dedup_items();
                w
            })
            .collect();
        self.revert_dangling_active()
    }

    pub(crate) fn set_active(&mut self, active: ActiveWatchlist) -> WatchlistResult<bool> {
        if let Some(id) = active.id() {
            if self.get(id).is_none() {
                return Err(WatchlistError::UnknownWatchlist(id.to_string()));
            }
        }
        let changed = self.active != active;
        self.active = active;
        Ok(changed)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Watchlist> {
        self.watchlists.iter_mut().find(|w| w.id == id)
    }

    /// Merge by id: replace in place, or append if new.
    pub(crate) fn upsert(&mut self, mut watchlist: Watchlist) {
        watchlist.dedup_items();
        match self.get_mut(&watchlist.id) {
            Some(existing) => *existing = watchlist,
            None => self.watchlists.push(watchlist),
        }
    }

    /// Remove by id. Returns the old position, the watchlist, and whether it was active.
    pub(crate) fn remove(&mut self, id: &str) -> Option<(usize, Watchlist, bool)> {
        let index = self.position(id)?;
        let watchlist = self.watchlists.remove(index);
        let was_active = self.active.id() == Some(id);
        if was_active {
            self.active = ActiveWatchlist::Default;
        }
        Some((index, watchlist, was_active))
    }

    pub(crate) fn insert(&mut self, index: usize, watchlist: Watchlist) {
        let index = index.min(self.watchlists.len());
        self.watchlists.insert(index, watchlist);
    }

    /// Reorder to match `ordered_ids`. Unknown ids are ignored; watchlists missing
    /// from `ordered_ids` keep their relative order after the listed ones.
    pub(crate) fn reorder(&mut self, ordered_ids: &[String]) -> bool {
        let before = self.ids();
        let mut remaining = std::mem::take(&mut self.watchlists);
        let mut reordered = Vec::with_capacity(remaining.len());
        for id in ordered_ids {
            if let Some(pos) = remaining.iter().position(|w| &w.id == id) {
                reordered.push(remaining.remove(pos));
            }
        }
        reordered.extend(remaining);
        self.watchlists = reordered;
        self.ids() != before
    }

    fn revert_dangling_active(&mut self) -> bool {
        let dangling = matches!(self.active.id(), Some(id) if self.get(id).is_none());
        if dangling {
            self.active = ActiveWatchlist::Default;
        }
        dangling
    }
}
