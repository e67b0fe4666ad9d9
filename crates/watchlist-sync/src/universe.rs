//! Instrument universe: every known symbol with its latest quote

use dashboard_backend::{Instrument, PriceTick};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

use crate::models::normalize_symbol;

const MIN_SEARCH_LEN: usize = 2;

#[derive(Debug, Clone, Default)]
pub struct InstrumentUniverse {
    /// Default catalog order
    catalog: Vec<String>,
    instruments: HashMap<String, Instrument>,
}

impl InstrumentUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    pub fn get(&self, symbol: &str) -> Option<&Instrument> {
        self.instruments.get(&normalize_symbol(symbol))
    }

    /// The default catalog, in catalog order.
    pub fn catalog(&self) -> Vec<Instrument> {
        self.catalog
            .iter()
            .filter_map(|s| self.instruments.get(s))
            .cloned()
            .collect()
    }

    /// Replace the catalog. Instruments known only from watchlist detail stay.
    pub fn set_catalog(&mut self, instruments: Vec<Instrument>) {
        self.catalog.clear();
        for inst in instruments {
            let symbol = normalize_symbol(&inst.symbol);
            if symbol.is_empty() || self.catalog.contains(&symbol) {
                continue;
            }
            self.catalog.push(symbol.clone());
            self.insert(symbol, inst);
        }
    }

    /// Merge enriched rows (e.g. from a watchlist detail fetch).
    pub fn merge(&mut self, instruments: impl IntoIterator<Item = Instrument>) {
        for inst in instruments {
            let symbol = normalize_symbol(&inst.symbol);
            if !symbol.is_empty() {
                self.insert(symbol, inst);
            }
        }
    }

    /// Apply a price tick to a known symbol. Unknown symbols are ignored.
    pub fn apply_tick(&mut self, tick: &PriceTick) -> bool {
        match self.instruments.get_mut(&normalize_symbol(&tick.symbol)) {
            Some(inst) => {
                inst.apply_price(tick.price);
                true
            }
            None => false,
        }
    }

    /// Apply a tick, adding an unknown symbol (outside the catalog) with the
    /// tick as its first price.
    pub fn adopt_tick(&mut self, tick: &PriceTick) -> bool {
        let symbol = normalize_symbol(&tick.symbol);
        if symbol.is_empty() {
            return false;
        }
        self.instruments
            .entry(symbol.clone())
            .or_insert_with(|| Instrument::placeholder(symbol))
            .apply_price(tick.price);
        true
    }

    /// Case-insensitive substring match on symbol or name.
    /// Catalog entries come first in catalog order, then the rest by symbol.
    pub fn search(&self, query: &str) -> Vec<Instrument> {
        let query = query.trim().to_lowercase();
        if query.chars().count() < MIN_SEARCH_LEN {
            return Vec::new();
        }
        let matches = |inst: &Instrument| {
            inst.symbol.to_lowercase().contains(&query) || inst.name.to_lowercase().contains(&query)
        };

        let mut results: Vec<Instrument> = self
            .catalog
            .iter()
            .filter_map(|s| self.instruments.get(s))
            .filter(|i| matches(i))
            .cloned()
            .collect();

        let mut others: Vec<&Instrument> = self
            .instruments
            .iter()
            .filter(|(s, _)| !self.catalog.contains(s))
            .map(|(_, i)| i)
            .filter(|i| matches(i))
            .collect();
        others.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        results.extend(others.into_iter().cloned());
        results
    }

    fn insert(&mut self, symbol: String, mut inst: Instrument) {
        if inst.name.is_empty() {
            if let Some(existing) = self.instruments.get(&symbol) {
                inst.name = existing.name.clone();
            }
        }
        inst.symbol = symbol.clone();
        self.instruments.insert(symbol, inst);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniverseEvent {
    /// Catalog or enrichment data replaced; views should re-project
    Refreshed,
}

/// Shared handle to the universe. Ticks are applied silently; bulk
/// refreshes publish `UniverseEvent::Refreshed`.
#[derive(Clone)]
pub struct SharedUniverse {
    inner: Arc<RwLock<InstrumentUniverse>>,
    tx: broadcast::Sender<UniverseEvent>,
}

impl Default for SharedUniverse {
    fn default() -> Self {
        Self::new(InstrumentUniverse::default())
    }
}

impl SharedUniverse {
    pub fn new(universe: InstrumentUniverse) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(RwLock::new(universe)),
            tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UniverseEvent> {
        self.tx.subscribe()
    }

    pub fn read<R>(&self, f: impl FnOnce(&InstrumentUniverse) -> R) -> R {
        f(&self.inner.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn set_catalog(&self, instruments: Vec<Instrument>) {
        self.write(|u| u.set_catalog(instruments));
        let _ = self.tx.send(UniverseEvent::Refreshed);
    }

    pub fn merge(&self, instruments: Vec<Instrument>) {
        self.write(|u| u.merge(instruments));
        let _ = self.tx.send(UniverseEvent::Refreshed);
    }

    pub fn apply_tick(&self, tick: &PriceTick) -> bool {
        self.write(|u| u.apply_tick(tick))
    }

    pub fn adopt_tick(&self, tick: &PriceTick) -> bool {
        self.write(|u| u.adopt_tick(tick))
    }

    pub fn search(&self, query: &str) -> Vec<Instrument> {
        self.read(|u| u.search(query))
    }

    fn write<R>(&self, f: impl FnOnce(&mut InstrumentUniverse) -> R) -> R {
        f(&mut self.inner.write().unwrap_or_else(PoisonError::into_inner))
    }
}
