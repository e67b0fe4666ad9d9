//! Live projection of the active view
//!
//! Re-projects on store and universe events, and patches prices in place on
//! ticks so a tick never changes which rows are shown or their order.

use dashboard_backend::PriceTick;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Notify};

use crate::models::normalize_symbol;
use crate::projector::{ActiveViewProjector, ListView};
use crate::store::WatchlistStore;
use crate::universe::SharedUniverse;

pub struct LiveView {
    store: WatchlistStore,
    universe: SharedUniverse,
    tx: watch::Sender<ListView>,
    shutdown: Arc<Notify>,
}

impl LiveView {
    pub fn new(store: WatchlistStore, universe: SharedUniverse) -> Self {
        let initial = store.read(|c| universe.read(|u| ActiveViewProjector::project(c, u)));
        let (tx, _) = watch::channel(initial);
        Self {
            store,
            universe,
            tx,
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ListView> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> ListView {
        self.tx.borrow().clone()
    }

    /// Project again from scratch.
    pub fn reproject(&self) {
        let view = self
            .store
            .read(|c| self.universe.read(|u| ActiveViewProjector::project(c, u)));
        self.tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }

    /// Record the tick in the universe and move the matching visible rows.
    /// Symbols held in any watchlist are remembered even before their quote
    /// data has loaded, so a later re-projection keeps the price.
    pub fn apply_tick(&self, tick: &PriceTick) -> bool {
        let symbol = normalize_symbol(&tick.symbol);
        let listed = self
            .store
            .read(|c| c.watchlists().iter().any(|w| w.contains(&symbol)));
        if listed {
            self.universe.adopt_tick(tick);
        } else {
            self.universe.apply_tick(tick);
        }
        self.tx.send_if_modified(|view| view.apply_tick(tick))
    }

    /// Stop `run`. Takes effect even if `run` has not reached its loop yet.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Follow store changes, universe refreshes and price ticks until shut down.
    pub async fn run(&self, mut ticks: broadcast::Receiver<PriceTick>) {
        let mut store_events = self.store.subscribe();
        let mut universe_events = self.universe.subscribe();
        let mut ticks_open = true;

        // Anything that happened before we subscribed.
        self.reproject();

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    tracing::info!("Live view shutting down");
                    break;
                }
                event = store_events.recv() => match event {
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => self.reproject(),
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                event = universe_events.recv() => match event {
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => self.reproject(),
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                tick = ticks.recv(), if ticks_open => match tick {
                    Ok(tick) => {
                        self.apply_tick(&tick);
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("Live view lagged {} price ticks", n);
                        self.reproject();
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::warn!("Price stream closed, prices will no longer update");
                        ticks_open = false;
                    }
                },
            }
        }
    }
}
