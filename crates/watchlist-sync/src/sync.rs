//! Watchlist synchronization with the backend
//!
//! Mutations are optimistic: the store changes first, then the request goes
//! out on the watchlist's lane. Lanes run one request at a time in the order
//! the operations were called, so two edits of the same watchlist can never
//! reach the server out of order. A failed request is rolled back only if it
//! is still the newest intent for the field it touched, and the field goes
//! back to the last value the server accepted.

use dashboard_backend::{DashboardBackend, Instrument, Watchlist};
use dashmap::DashMap;
use futures_util::future::{self, BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::error::{WatchlistError, WatchlistResult};
use crate::models::normalize_symbol;
use crate::notice::{Notice, Notifier};
use crate::reorder::{ReorderCommit, ReorderContainer};
use crate::store::WatchlistStore;
use crate::universe::SharedUniverse;

/// A mutation that has already been applied locally and queued.
/// Await it for the server outcome, or spawn it and let notices report failure.
pub type Pending<T> = BoxFuture<'static, WatchlistResult<T>>;

/// Lane for reordering the watchlists themselves.
const LISTS_LANE: &str = "\u{0}lists";

type LaneJob = BoxFuture<'static, ()>;

/// One FIFO worker per key.
#[derive(Default)]
struct Lanes {
    senders: DashMap<String, mpsc::UnboundedSender<LaneJob>>,
}

impl Lanes {
    fn submit(&self, key: &str, job: LaneJob) {
        let tx = self
            .senders
            .entry(key.to_string())
            .or_insert_with(|| spawn_lane(key))
            .value()
            .clone();

        if let Err(mpsc::error::SendError(job)) = tx.send(job) {
            // Worker is gone; start a fresh one for this and later jobs.
            let tx = spawn_lane(key);
            let _ = tx.send(job);
            self.senders.insert(key.to_string(), tx);
        }
    }

    /// Close a lane. Jobs already queued still run.
    fn retire(&self, key: &str) {
        self.senders.remove(key);
    }
}

struct IntentState<T> {
    latest: u64,
    pending: usize,
    /// Value the server is known to hold
    confirmed: T,
}

/// Outstanding intents per field (a name, one symbol's membership, an order).
///
/// `confirmed` is read from the store when the first intent on a key begins
/// and moves forward on every success. The entry is dropped once nothing is
/// pending, so the next intent snapshots fresh local state.
struct IntentLog<T> {
    entries: DashMap<String, IntentState<T>>,
}

impl<T> Default for IntentLog<T> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<T: Clone> IntentLog<T> {
    /// Register a new intent. `before` is the value prior to its optimistic edit.
    fn begin(&self, key: &str, before: T) -> u64 {
        let mut state = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| IntentState {
                latest: 0,
                pending: 0,
                confirmed: before,
            });
        state.latest += 1;
        state.pending += 1;
        state.latest
    }

    fn is_latest(&self, key: &str, seq: u64) -> bool {
        self.entries
            .get(key)
            .map(|s| s.latest == seq)
            .unwrap_or(false)
    }

    /// The server accepted an intent that left the field at `value`.
    fn confirm(&self, key: &str, value: T) {
        if let Some(mut state) = self.entries.get_mut(key) {
            state.confirmed = value;
        }
        self.settle(key);
    }

    /// An intent failed. Returns the value to restore, or `None` when a newer
    /// intent on the same field has been issued since.
    fn abandon(&self, key: &str, seq: u64) -> Option<T> {
        let target = self
            .entries
            .get(key)
            .filter(|s| s.latest == seq)
            .map(|s| s.confirmed.clone());
        self.settle(key);
        target
    }

    /// Finish an intent that never reached the server.
    fn settle(&self, key: &str) {
        if let Some(mut state) = self.entries.get_mut(key) {
            state.pending = state.pending.saturating_sub(1);
        }
        self.entries.remove_if(key, |_, s| s.pending == 0);
    }
}

#[derive(Default)]
struct Intents {
    names: IntentLog<String>,
    /// Keyed by watchlist and symbol; the value is the item index when listed
    members: IntentLog<Option<usize>>,
    /// Item order per watchlist, plus the list order under `LISTS_LANE`
    orders: IntentLog<Vec<String>>,
}

fn member_key(id: &str, symbol: &str) -> String {
    format!("{}\u{0}{}", id, symbol)
}

/// `items` arranged by `order`; items missing from `order` keep their
/// relative position at the end.
fn arrange(items: &[String], order: &[String]) -> Vec<String> {
    let mut arranged: Vec<String> = order
        .iter()
        .filter(|s| items.contains(s))
        .cloned()
        .collect();
    arranged.extend(items.iter().filter(|s| !order.contains(s)).cloned());
    arranged
}

fn spawn_lane(key: &str) -> mpsc::UnboundedSender<LaneJob> {
    let (tx, mut rx) = mpsc::unbounded_channel::<LaneJob>();
    let key = key.to_string();
    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            job.await;
        }
        tracing::debug!("Mutation lane {:?} closed", key);
    });
    tx
}

fn rejected<T: Send + 'static>(err: WatchlistError) -> Pending<T> {
    future::ready(Err(err)).boxed()
}

fn settled<T: Send + 'static>(value: T) -> Pending<T> {
    future::ready(Ok(value)).boxed()
}

fn validate_name(name: &str) -> WatchlistResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(WatchlistError::validation("Watchlist name cannot be empty"));
    }
    Ok(name.to_string())
}

fn validate_symbol(symbol: &str) -> WatchlistResult<String> {
    let symbol = normalize_symbol(symbol);
    if symbol.is_empty() {
        return Err(WatchlistError::validation("Symbol cannot be empty"));
    }
    Ok(symbol)
}

/// Put one symbol back where the server last had it.
fn restore_membership(store: &WatchlistStore, id: &str, symbol: &str, confirmed: Option<usize>) {
    store.update_local(id, |wl| match (confirmed, wl.position_of(symbol)) {
        (Some(index), None) => {
            tracing::warn!("Restoring {} to watchlist {}", symbol, id);
            let at = index.min(wl.items.len());
            wl.items.insert(at, symbol.to_string());
        }
        (None, Some(pos)) => {
            tracing::warn!("Removing {} from watchlist {} again", symbol, id);
            wl.items.remove(pos);
        }
        _ => {}
    });
}

struct SyncInner {
    backend: Arc<dyn DashboardBackend>,
    store: WatchlistStore,
    universe: SharedUniverse,
    notifier: Notifier,
    lanes: Lanes,
    intents: Intents,
}

/// Keeps a `WatchlistStore` in step with the backend.
///
/// Mutating methods take effect locally and claim their lane slot when
/// called, not when the returned future is first polled, so call order is
/// send order. They must be called from within a Tokio runtime.
#[derive(Clone)]
pub struct WatchlistSync {
    inner: Arc<SyncInner>,
}

impl WatchlistSync {
    pub fn new(
        backend: Arc<dyn DashboardBackend>,
        store: WatchlistStore,
        universe: SharedUniverse,
        notifier: Notifier,
    ) -> Self {
        Self {
            inner: Arc::new(SyncInner {
                backend,
                store,
                universe,
                notifier,
                lanes: Lanes::default(),
                intents: Intents::default(),
            }),
        }
    }

    pub fn store(&self) -> &WatchlistStore {
        &self.inner.store
    }

    pub fn universe(&self) -> &SharedUniverse {
        &self.inner.universe
    }

    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.inner.notifier.subscribe()
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Replace local state with the server's list. On failure the last known
    /// state stays.
    pub async fn fetch_all(&self) -> WatchlistResult<()> {
        match self.inner.backend.list_watchlists().await {
            Ok(watchlists) => {
                tracing::info!("Loaded {} watchlists", watchlists.len());
                self.inner.store.set_all(watchlists);
                Ok(())
            }
            Err(e) => {
                let err = WatchlistError::from(e);
                self.inner.notifier.failure("Load watchlists", &err);
                Err(err)
            }
        }
    }

    /// Load the default instrument catalog into the universe.
    pub async fn load_catalog(&self) -> WatchlistResult<usize> {
        match self.inner.backend.list_instruments().await {
            Ok(instruments) => {
                let count = instruments.len();
                self.inner.universe.set_catalog(instruments);
                tracing::info!("Loaded {} catalog instruments", count);
                Ok(count)
            }
            Err(e) => {
                let err = WatchlistError::from(e);
                self.inner.notifier.failure("Load stocks", &err);
                Err(err)
            }
        }
    }

    /// Fetch quote data for a watchlist's items and merge it into the universe,
    /// provided the watchlist still exists when the response arrives.
    pub async fn load_items(&self, id: &str) -> WatchlistResult<Vec<Instrument>> {
        if self.inner.store.get(id).is_none() {
            return Err(WatchlistError::UnknownWatchlist(id.to_string()));
        }

        let detail = match self.inner.backend.get_watchlist(id).await {
            Ok(detail) => detail,
            Err(e) => {
                let err = WatchlistError::from(e);
                self.inner.notifier.failure("Load watchlist", &err);
                return Err(err);
            }
        };

        if self.inner.store.get(id).is_some() {
            self.inner.universe.merge(detail.items.clone());
        } else {
            tracing::debug!("Watchlist {} deleted while loading, discarding items", id);
        }
        Ok(detail.items)
    }

    /// Switch the active view; `None` selects the default catalog.
    pub async fn switch_to(&self, id: Option<&str>) -> WatchlistResult<()> {
        self.inner.store.set_active(id)?;
        if let Some(id) = id {
            self.load_items(id).await?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Watchlist lifecycle
    // -----------------------------------------------------------------------

    /// Create a watchlist. Nothing changes locally until the server confirms;
    /// the collection is then refetched to learn the new id.
    pub async fn create(&self, name: &str) -> WatchlistResult<Option<Watchlist>> {
        let name = validate_name(name)?;

        let created = match self.inner.backend.create_watchlist(&name).await {
            Ok(created) => created,
            Err(e) => {
                let err = WatchlistError::from(e);
                self.inner.notifier.failure("Create watchlist", &err);
                return Err(err);
            }
        };

        self.inner
            .notifier
            .info(format!("Watchlist \"{}\" created!", created));

        // A failed refetch is already reported; the creation itself stands.
        let _ = self.fetch_all().await;
        Ok(self
            .inner
            .store
            .read(|c| c.find_by_name(&created).cloned()))
    }

    pub fn rename(&self, id: &str, name: &str) -> Pending<()> {
        let name = match validate_name(name) {
            Ok(name) => name,
            Err(e) => return rejected(e),
        };
        let previous = match self
            .inner
            .store
            .update_local(id, |wl| std::mem::replace(&mut wl.name, name.clone()))
        {
            Some(previous) => previous,
            None => return rejected(WatchlistError::UnknownWatchlist(id.to_string())),
        };
        if previous == name {
            return settled(());
        }
        let seq = self.inner.intents.names.begin(id, previous);

        let inner = self.inner.clone();
        let id = id.to_string();
        self.enqueue(&id.clone(), async move {
            match inner.backend.rename_watchlist(&id, &name).await {
                Ok(()) => {
                    tracing::info!("Watchlist {} renamed to {}", id, name);
                    inner.intents.names.confirm(&id, name);
                    Ok(())
                }
                Err(e) => {
                    if let Some(confirmed) = inner.intents.names.abandon(&id, seq) {
                        inner.store.update_local(&id, |wl| {
                            tracing::warn!("Rolling back rename of watchlist {}", id);
                            wl.name = confirmed;
                        });
                    }
                    let err = WatchlistError::from(e);
                    inner.notifier.failure("Rename watchlist", &err);
                    Err(err)
                }
            }
        })
    }

    /// Delete a watchlist. If it was active the view falls back to the default catalog.
    pub fn delete(&self, id: &str) -> Pending<()> {
        let Some(removed) = self.inner.store.remove_local(id) else {
            return rejected(WatchlistError::UnknownWatchlist(id.to_string()));
        };

        let inner = self.inner.clone();
        let id = id.to_string();
        self.enqueue(&id.clone(), async move {
            match inner.backend.delete_watchlist(&id).await {
                Ok(()) => {
                    inner.lanes.retire(&id);
                    Ok(())
                }
                Err(e) => {
                    if inner.store.restore_local(removed) {
                        tracing::warn!("Rolled back delete of watchlist {}", id);
                    }
                    let err = WatchlistError::from(e);
                    inner.notifier.failure("Delete watchlist", &err);
                    Err(err)
                }
            }
        })
    }

    // -----------------------------------------------------------------------
    // Items
    // -----------------------------------------------------------------------

    /// Append a symbol. Already present is a no-op with no request.
    pub fn add_item(&self, id: &str, symbol: &str) -> Pending<()> {
        let symbol = match validate_symbol(symbol) {
            Ok(symbol) => symbol,
            Err(e) => return rejected(e),
        };
        let added_at = self.inner.store.update_local(id, |wl| {
            if wl.contains(&symbol) {
                None
            } else {
                wl.items.push(symbol.clone());
                Some(wl.items.len() - 1)
            }
        });
        let index = match added_at {
            None => return rejected(WatchlistError::UnknownWatchlist(id.to_string())),
            Some(None) => return settled(()),
            Some(Some(index)) => index,
        };
        let key = member_key(id, &symbol);
        let seq = self.inner.intents.members.begin(&key, None);

        let inner = self.inner.clone();
        let id = id.to_string();
        self.enqueue(&id.clone(), async move {
            match inner.backend.add_item(&id, &symbol).await {
                Ok(()) => {
                    tracing::info!("Added {} to watchlist {}", symbol, id);
                    inner.intents.members.confirm(&key, Some(index));
                    Ok(())
                }
                Err(e) => {
                    if let Some(confirmed) = inner.intents.members.abandon(&key, seq) {
                        restore_membership(&inner.store, &id, &symbol, confirmed);
                    }
                    let err = WatchlistError::from(e);
                    inner.notifier.failure("Add to watchlist", &err);
                    Err(err)
                }
            }
        })
    }

    /// Remove a symbol. Already absent is a no-op with no request.
    pub fn remove_item(&self, id: &str, symbol: &str) -> Pending<()> {
        let symbol = match validate_symbol(symbol) {
            Ok(symbol) => symbol,
            Err(e) => return rejected(e),
        };
        let removed_at = self.inner.store.update_local(id, |wl| {
            let pos = wl.position_of(&symbol)?;
            wl.items.remove(pos);
            Some(pos)
        });
        let index = match removed_at {
            None => return rejected(WatchlistError::UnknownWatchlist(id.to_string())),
            Some(None) => return settled(()),
            Some(Some(index)) => index,
        };

        let key = member_key(id, &symbol);
        let seq = self.inner.intents.members.begin(&key, Some(index));

        let inner = self.inner.clone();
        let id = id.to_string();
        self.enqueue(&id.clone(), async move {
            match inner.backend.remove_item(&id, &symbol).await {
                Ok(()) => {
                    tracing::info!("Removed {} from watchlist {}", symbol, id);
                    inner.intents.members.confirm(&key, None);
                    Ok(())
                }
                Err(e) => {
                    if let Some(confirmed) = inner.intents.members.abandon(&key, seq) {
                        restore_membership(&inner.store, &id, &symbol, confirmed);
                    }
                    let err = WatchlistError::from(e);
                    inner.notifier.failure("Remove from watchlist", &err);
                    Err(err)
                }
            }
        })
    }

    /// Add if absent, remove if present. Resolves to whether the symbol is now listed.
    pub fn toggle_item(&self, id: &str, symbol: &str) -> Pending<bool> {
        let symbol = normalize_symbol(symbol);
        match self.inner.store.get(id) {
            None => rejected(WatchlistError::UnknownWatchlist(id.to_string())),
            Some(wl) if wl.contains(&symbol) => self.remove_item(id, &symbol).map(|r| r.map(|_| false)).boxed(),
            Some(_) => self.add_item(id, &symbol).map(|r| r.map(|_| true)).boxed(),
        }
    }

    // -----------------------------------------------------------------------
    // Reordering
    // -----------------------------------------------------------------------

    /// Persist a new order of the watchlists themselves.
    pub fn reorder_lists(&self, ordered_ids: Vec<String>) -> Pending<()> {
        let previous = self.inner.store.read(|c| c.ids());
        if !self.inner.store.reorder_local(&ordered_ids) {
            return settled(());
        }
        let applied = self.inner.store.read(|c| c.ids());
        let seq = self.inner.intents.orders.begin(LISTS_LANE, previous);

        let inner = self.inner.clone();
        self.enqueue(LISTS_LANE, async move {
            if !inner.intents.orders.is_latest(LISTS_LANE, seq) {
                tracing::debug!("Watchlist reorder superseded by a newer one");
                inner.intents.orders.settle(LISTS_LANE);
                return Ok(());
            }
            match inner.backend.reorder_watchlists(&applied).await {
                Ok(()) => {
                    inner.intents.orders.confirm(LISTS_LANE, applied);
                    Ok(())
                }
                Err(e) => {
                    if let Some(confirmed) = inner.intents.orders.abandon(LISTS_LANE, seq) {
                        tracing::warn!("Rolling back watchlist reorder");
                        inner.store.reorder_local(&confirmed);
                    }
                    let err = WatchlistError::from(e);
                    inner.notifier.failure("Reorder watchlists", &err);
                    Err(err)
                }
            }
        })
    }

    /// Persist a new item order. `ordered_symbols` must be a permutation of the
    /// current items.
    pub fn reorder_items(&self, id: &str, ordered_symbols: Vec<String>) -> Pending<()> {
        let ordered: Vec<String> = ordered_symbols.iter().map(|s| normalize_symbol(s)).collect();
        let Some(current) = self.inner.store.get(id).map(|wl| wl.items) else {
            return rejected(WatchlistError::UnknownWatchlist(id.to_string()));
        };
        if current == ordered {
            return settled(());
        }
        let mut a = current.clone();
        let mut b = ordered.clone();
        a.sort();
        b.sort();
        if a != b {
            return rejected(WatchlistError::validation(
                "New order must contain exactly the current items",
            ));
        }

        self.inner
            .store
            .update_local(id, |wl| wl.items = ordered.clone());
        let seq = self.inner.intents.orders.begin(id, current);

        let inner = self.inner.clone();
        let id = id.to_string();
        self.enqueue(&id.clone(), async move {
            if !inner.intents.orders.is_latest(&id, seq) {
                tracing::debug!("Item reorder of watchlist {} superseded", id);
                inner.intents.orders.settle(&id);
                return Ok(());
            }
            match inner.backend.reorder_items(&id, &ordered).await {
                Ok(()) => {
                    inner.intents.orders.confirm(&id, ordered);
                    Ok(())
                }
                Err(e) => {
                    if let Some(confirmed) = inner.intents.orders.abandon(&id, seq) {
                        inner.store.update_local(&id, |wl| {
                            tracing::warn!("Rolling back item reorder of watchlist {}", id);
                            wl.items = arrange(&wl.items, &confirmed);
                        });
                    }
                    let err = WatchlistError::from(e);
                    inner.notifier.failure("Reorder items", &err);
                    Err(err)
                }
            }
        })
    }

    /// Route a committed drag-and-drop to the matching reorder.
    pub fn apply_reorder(&self, commit: ReorderCommit) -> Pending<()> {
        match commit.container {
            ReorderContainer::Watchlists => self.reorder_lists(commit.ordered_ids),
            ReorderContainer::Items { watchlist_id } => {
                self.reorder_items(&watchlist_id, commit.ordered_ids)
            }
        }
    }

    fn enqueue<T, F>(&self, lane: &str, job: F) -> Pending<T>
    where
        T: Send + 'static,
        F: Future<Output = WatchlistResult<T>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.inner.lanes.submit(
            lane,
            async move {
                let _ = tx.send(job.await);
            }
            .boxed(),
        );
        async move { rx.await.map_err(|_| WatchlistError::LaneClosed)? }.boxed()
    }
}
