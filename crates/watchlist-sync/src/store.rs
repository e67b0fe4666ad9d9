//! In-memory watchlist store
//!
//! Single owner of the `WatchlistCollection`. Every mutation publishes a
//! `StoreEvent` after the write lock is released, so dependent views (nav
//! list, settings list, active item list) subscribe once instead of being
//! re-invoked by hand.

use dashboard_backend::Watchlist;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

use crate::error::WatchlistResult;
use crate::models::{ActiveWatchlist, WatchlistCollection};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// Whole collection replaced (full fetch)
    Replaced,
    ActiveChanged(ActiveWatchlist),
    /// Name or items of one watchlist changed, or it was (re)inserted
    WatchlistChanged(String),
    WatchlistRemoved(String),
    ListsReordered,
}

/// A watchlist taken out by `remove_local`, kept so it can be put back.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedWatchlist {
    pub index: usize,
    pub watchlist: Watchlist,
    pub was_active: bool,
}

#[derive(Clone)]
pub struct WatchlistStore {
    state: Arc<RwLock<WatchlistCollection>>,
    tx: broadcast::Sender<StoreEvent>,
}

impl Default for WatchlistStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchlistStore {
    pub fn new() -> Self {
        Self::with_collection(WatchlistCollection::default())
    }

    pub fn with_collection(collection: WatchlistCollection) -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            state: Arc::new(RwLock::new(collection)),
            tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.tx.subscribe()
    }

    /// Snapshot of the whole collection.
    pub fn get_all(&self) -> WatchlistCollection {
        self.read_guard().clone()
    }

    /// Run `f` against the current state without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&WatchlistCollection) -> R) -> R {
        f(&self.read_guard())
    }

    pub fn active(&self) -> ActiveWatchlist {
        self.read_guard().active().clone()
    }

    pub fn get(&self, id: &str) -> Option<Watchlist> {
        self.read_guard().get(id).cloned()
    }

    /// Replace wholesale, e.g. after a full fetch.
    pub fn set_all(&self, watchlists: Vec<Watchlist>) {
        let reverted = self.write_guard().replace_all(watchlists);
        self.emit(StoreEvent::Replaced);
        if reverted {
            tracing::debug!("Active watchlist vanished after refresh, showing default view");
            self.emit(StoreEvent::ActiveChanged(ActiveWatchlist::Default));
        }
    }

    /// Select a watchlist, or `None` for the default catalog.
    pub fn set_active(&self, id: Option<&str>) -> WatchlistResult<()> {
        let active = ActiveWatchlist::from_id(id);
        let changed = self.write_guard().set_active(active.clone())?;
        if changed {
            self.emit(StoreEvent::ActiveChanged(active));
        }
        Ok(())
    }

    pub fn upsert_local(&self, watchlist: Watchlist) {
        let id = watchlist.id.clone();
        self.write_guard().upsert(watchlist);
        self.emit(StoreEvent::WatchlistChanged(id));
    }

    /// Remove a watchlist; the active selection reverts to default if it pointed here.
    pub fn remove_local(&self, id: &str) -> Option<RemovedWatchlist> {
        let removed = self.write_guard().remove(id);
        let (index, watchlist, was_active) = removed?;
        self.emit(StoreEvent::WatchlistRemoved(id.to_string()));
        if was_active {
            self.emit(StoreEvent::ActiveChanged(ActiveWatchlist::Default));
        }
        Some(RemovedWatchlist {
            index,
            watchlist,
            was_active,
        })
    }

    /// Put back a removed watchlist unless one with the same id exists again.
    /// Re-selects it if it was active and nothing else has been selected since.
    pub fn restore_local(&self, removed: RemovedWatchlist) -> bool {
        let id = removed.watchlist.id.clone();
        let reactivated = {
            let mut state = self.write_guard();
            if state.get(&id).is_some() {
                return false;
            }
            state.insert(removed.index, removed.watchlist);
            removed.was_active
                && state.active().is_default()
                && state
                    .set_active(ActiveWatchlist::Watchlist(id.clone()))
                    .unwrap_or(false)
        };
        self.emit(StoreEvent::WatchlistChanged(id.clone()));
        if reactivated {
            self.emit(StoreEvent::ActiveChanged(ActiveWatchlist::Watchlist(id)));
        }
        true
    }

    /// Mutate one watchlist in place. Returns `None` if it does not exist.
    /// An event is published only when the watchlist actually changed.
    pub fn update_local<R>(&self, id: &str, f: impl FnOnce(&mut Watchlist) -> R) -> Option<R> {
        let (result, changed) = {
            let mut state = self.write_guard();
            let watchlist = state.get_mut(id)?;
            let before = watchlist.clone();
            let result = f(watchlist);
            watchlist.dedup_items();
            let changed = *watchlist != before;
            (result, changed)
        };
        if changed {
            self.emit(StoreEvent::WatchlistChanged(id.to_string()));
        }
        Some(result)
    }

    /// Reorder the watchlists themselves. Returns true if the order changed.
    pub fn reorder_local(&self, ordered_ids: &[String]) -> bool {
        let changed = self.write_guard().reorder(ordered_ids);
        if changed {
            self.emit(StoreEvent::ListsReordered);
        }
        changed
    }

    fn emit(&self, event: StoreEvent) {
        // No subscribers yet is not an error.
        let _ = self.tx.send(event);
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, WatchlistCollection> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, WatchlistCollection> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
