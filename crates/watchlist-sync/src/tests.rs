use super::*;
use async_trait::async_trait;
use dashboard_backend::{
    AccountInfo, BackendError, BackendResult, DashboardBackend, OrderReceipt, OrderRequest,
    OrderSide, WatchlistDetail,
};
use rust_decimal_macros::dec;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

// ---------------------------------------------------------------------------
// Fake backend
// ---------------------------------------------------------------------------

/// In-memory server with a call log, per-method failure injection, per-symbol
/// latency and an optional gate on watchlist detail fetches.
#[derive(Default)]
struct FakeBackend {
    server: Mutex<Vec<Watchlist>>,
    catalog: Vec<Instrument>,
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<&'static str>>,
    latency: Mutex<HashMap<String, Duration>>,
    detail_gate: Option<Arc<Semaphore>>,
    next_id: Mutex<u32>,
}

impl FakeBackend {
    fn with_watchlists(watchlists: Vec<Watchlist>) -> Self {
        Self {
            server: Mutex::new(watchlists),
            catalog: vec![instrument("AAPL", "Apple Inc.", 150.0), instrument("MSFT", "Microsoft", 400.0)],
            ..Default::default()
        }
    }

    fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.detail_gate = Some(gate);
        self
    }

    fn fail(&self, method: &'static str) {
        self.failing.lock().unwrap().insert(method);
    }

    fn heal(&self, method: &'static str) {
        self.failing.lock().unwrap().remove(method);
    }

    fn slow(&self, symbol: &str, ms: u64) {
        self.latency
            .lock()
            .unwrap()
            .insert(symbol.to_string(), Duration::from_millis(ms));
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn calls_to(&self, method: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split(' ').next() == Some(method))
            .count()
    }

    fn server_items(&self, id: &str) -> Vec<String> {
        self.server
            .lock()
            .unwrap()
            .iter()
            .find(|w| w.id == id)
            .map(|w| w.items.clone())
            .unwrap_or_default()
    }

    async fn enter(&self, method: &'static str, detail: String) -> BackendResult<()> {
        self.calls.lock().unwrap().push(format!("{} {}", method, detail).trim().to_string());
        let delay = self.latency.lock().unwrap().get(&detail).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().unwrap().contains(method) {
            return Err(BackendError::Status {
                status: 500,
                message: format!("{} exploded", method),
            });
        }
        Ok(())
    }

    fn with_server<R>(&self, id: &str, f: impl FnOnce(&mut Watchlist) -> R) -> BackendResult<R> {
        let mut server = self.server.lock().unwrap();
        match server.iter_mut().find(|w| w.id == id) {
            Some(wl) => Ok(f(wl)),
            None => Err(BackendError::Status {
                status: 404,
                message: "Watchlist not found".into(),
            }),
        }
    }
}

#[async_trait]
impl DashboardBackend for FakeBackend {
    async fn list_watchlists(&self) -> BackendResult<Vec<Watchlist>> {
        self.enter("list_watchlists", String::new()).await?;
        Ok(self.server.lock().unwrap().clone())
    }

    async fn create_watchlist(&self, name: &str) -> BackendResult<String> {
        self.enter("create_watchlist", name.to_string()).await?;
        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            format!("wl-{}", next)
        };
        self.server.lock().unwrap().push(Watchlist::new(id, name));
        Ok(name.to_string())
    }

    async fn rename_watchlist(&self, id: &str, name: &str) -> BackendResult<()> {
        self.enter("rename_watchlist", name.to_string()).await?;
        self.with_server(id, |wl| wl.name = name.to_string())
    }

    async fn delete_watchlist(&self, id: &str) -> BackendResult<()> {
        self.enter("delete_watchlist", id.to_string()).await?;
        self.server.lock().unwrap().retain(|w| w.id != id);
        Ok(())
    }

    async fn get_watchlist(&self, id: &str) -> BackendResult<WatchlistDetail> {
        self.enter("get_watchlist", id.to_string()).await?;
        let wl = self.with_server(id, |wl| wl.clone())?;
        if let Some(gate) = &self.detail_gate {
            let _permit = gate.acquire().await.unwrap();
        }
        Ok(WatchlistDetail {
            watchlist_name: wl.name,
            items: wl
                .items
                .iter()
                .map(|s| instrument(s, &format!("{} Corp", s), 10.0))
                .collect(),
        })
    }

    async fn add_item(&self, watchlist_id: &str, symbol: &str) -> BackendResult<()> {
        self.enter("add_item", symbol.to_string()).await?;
        self.with_server(watchlist_id, |wl| {
            if !wl.contains(symbol) {
                wl.items.push(symbol.to_string());
            }
        })
    }

    async fn remove_item(&self, watchlist_id: &str, symbol: &str) -> BackendResult<()> {
        self.enter("remove_item", symbol.to_string()).await?;
        self.with_server(watchlist_id, |wl| wl.items.retain(|s| s != symbol))
    }

    async fn reorder_watchlists(&self, ordered_ids: &[String]) -> BackendResult<()> {
        self.enter("reorder_watchlists", ordered_ids.join(",")).await?;
        let mut server = self.server.lock().unwrap();
        server.sort_by_key(|w| ordered_ids.iter().position(|id| id == &w.id));
        Ok(())
    }

    async fn reorder_items(&self, watchlist_id: &str, ordered_items: &[String]) -> BackendResult<()> {
        self.enter("reorder_items", ordered_items.join(",")).await?;
        self.with_server(watchlist_id, |wl| wl.items = ordered_items.to_vec())
    }

    async fn list_instruments(&self) -> BackendResult<Vec<Instrument>> {
        self.enter("list_instruments", String::new()).await?;
        Ok(self.catalog.clone())
    }

    async fn submit_order(&self, order: &OrderRequest) -> BackendResult<OrderReceipt> {
        self.enter("submit_order", order.symbol.clone()).await?;
        Ok(OrderReceipt {
            id: "ord-1".into(),
            status: "accepted".into(),
        })
    }

    async fn get_account_info(&self) -> BackendResult<AccountInfo> {
        self.enter("get_account_info", String::new()).await?;
        Ok(AccountInfo { equity: dec!(10000) })
    }

    fn backend_name(&self) -> &str {
        "Fake"
    }
}

fn instrument(symbol: &str, name: &str, price: f64) -> Instrument {
    Instrument {
        symbol: symbol.into(),
        name: name.into(),
        price,
        change: 0.0,
        change_percent: 0.0,
    }
}

fn tech() -> Watchlist {
    Watchlist::new("a", "Tech").with_items(["AAPL", "MSFT"])
}

async fn setup(backend: FakeBackend) -> (Arc<FakeBackend>, WatchlistSync) {
    let backend = Arc::new(backend);
    let sync = WatchlistSync::new(
        backend.clone(),
        WatchlistStore::new(),
        SharedUniverse::default(),
        Notifier::new(),
    );
    sync.fetch_all().await.unwrap();
    sync.load_catalog().await.unwrap();
    (backend, sync)
}

fn items(sync: &WatchlistSync, id: &str) -> Vec<String> {
    sync.store().get(id).map(|w| w.items).unwrap_or_default()
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<Notice>) -> Vec<Notice> {
    let mut notices = Vec::new();
    while let Ok(n) = rx.try_recv() {
        notices.push(n);
    }
    notices
}

// ---------------------------------------------------------------------------
// Ordering and idempotence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_item_mutations_land_in_call_order() {
    let (backend, sync) = setup(FakeBackend::with_watchlists(vec![tech()])).await;
    // Earlier calls are slower; without serialization they would land last.
    backend.slow("NVDA", 60);
    backend.slow("AAPL", 30);

    let ops = vec![
        sync.add_item("a", "nvda"),
        sync.remove_item("a", "AAPL"),
        sync.add_item("a", "TSLA"),
        sync.add_item("a", "AAPL"),
    ];
    for op in futures_util::future::join_all(ops).await {
        op.unwrap();
    }

    let expected = vec!["MSFT", "NVDA", "TSLA", "AAPL"];
    assert_eq!(items(&sync, "a"), expected);
    assert_eq!(backend.server_items("a"), expected);
    assert_eq!(
        backend.calls()[2..],
        ["add_item NVDA", "remove_item AAPL", "add_item TSLA", "add_item AAPL"]
    );
}

#[tokio::test]
async fn test_repeat_remove_is_local_noop() {
    let (backend, sync) = setup(FakeBackend::with_watchlists(vec![tech()])).await;

    sync.remove_item("a", "MSFT").await.unwrap();
    sync.remove_item("a", "MSFT").await.unwrap();
    sync.add_item("a", "AAPL").await.unwrap();

    assert_eq!(items(&sync, "a"), vec!["AAPL"]);
    assert_eq!(backend.calls_to("remove_item"), 1);
    assert_eq!(backend.calls_to("add_item"), 0);
}

#[tokio::test]
async fn test_toggle_flips_membership() {
    let (_backend, sync) = setup(FakeBackend::with_watchlists(vec![tech()])).await;

    assert!(!sync.toggle_item("a", "aapl").await.unwrap());
    assert!(sync.toggle_item("a", "AAPL").await.unwrap());
    assert_eq!(items(&sync, "a"), vec!["MSFT", "AAPL"]);

    let membership = sync.store().read(|c| c.membership("msft"));
    assert_eq!(membership.len(), 1);
    assert!(membership[0].contains);
    assert_eq!(membership[0].item_count, 2);
}

#[tokio::test]
async fn test_unknown_watchlist_is_rejected_without_call() {
    let (backend, sync) = setup(FakeBackend::with_watchlists(vec![tech()])).await;
    let before = backend.calls().len();

    assert_eq!(
        sync.add_item("nope", "AAPL").await,
        Err(WatchlistError::UnknownWatchlist("nope".into()))
    );
    assert!(sync.delete("nope").await.is_err());
    assert!(sync.switch_to(Some("nope")).await.is_err());
    assert_eq!(backend.calls().len(), before);
}

// ---------------------------------------------------------------------------
// Rollback
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_failed_add_rolls_back_and_notifies() {
    let (backend, sync) = setup(FakeBackend::with_watchlists(vec![tech()])).await;
    let mut notices = sync.subscribe_notices();
    backend.fail("add_item");

    let pending = sync.add_item("a", "NVDA");
    // Optimistic state is visible before the request settles.
    assert_eq!(items(&sync, "a"), vec!["AAPL", "MSFT", "NVDA"]);

    let err = pending.await.unwrap_err();
    assert!(matches!(err, WatchlistError::Backend(BackendError::Status { status: 500, .. })));
    assert_eq!(items(&sync, "a"), vec!["AAPL", "MSFT"]);

    let notices = drain(&mut notices);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert_eq!(notices[0].message, "Add to watchlist: add_item exploded");
}

#[tokio::test]
async fn test_failed_remove_restores_position() {
    let (backend, sync) = setup(FakeBackend::with_watchlists(vec![
        Watchlist::new("a", "Tech").with_items(["AAPL", "MSFT", "NVDA"]),
    ]))
    .await;
    backend.fail("remove_item");

    assert!(sync.remove_item("a", "MSFT").await.is_err());
    assert_eq!(items(&sync, "a"), vec!["AAPL", "MSFT", "NVDA"]);
}

#[tokio::test]
async fn test_rollback_skipped_when_no_longer_relevant() {
    let (backend, sync) = setup(FakeBackend::with_watchlists(vec![tech()])).await;
    backend.fail("add_item");

    let add = sync.add_item("a", "NVDA");
    let remove = sync.remove_item("a", "NVDA");
    assert!(add.await.is_err());
    remove.await.unwrap();

    // The later remove already took NVDA out; rollback must not resurrect or double-remove.
    assert_eq!(items(&sync, "a"), vec!["AAPL", "MSFT"]);
}

#[tokio::test]
async fn test_failed_add_keeps_later_readd() {
    let (backend, sync) = setup(FakeBackend::with_watchlists(vec![tech()])).await;
    backend.slow("NVDA", 50);
    backend.fail("add_item");

    let first = sync.add_item("a", "NVDA");
    let remove = sync.remove_item("a", "NVDA");
    let second = sync.add_item("a", "NVDA");
    assert!(first.await.is_err());
    backend.heal("add_item");
    remove.await.unwrap();
    second.await.unwrap();

    // The re-add was issued after the failed add, so the failure must not undo it.
    let expected = vec!["AAPL", "MSFT", "NVDA"];
    assert_eq!(items(&sync, "a"), expected);
    assert_eq!(backend.server_items("a"), expected);
}

#[tokio::test]
async fn test_failed_rename_keeps_newer_name() {
    let (backend, sync) = setup(FakeBackend::with_watchlists(vec![tech()])).await;
    backend.slow("Chips", 30);
    backend.fail("rename_watchlist");

    let first = sync.rename("a", "Chips");
    let second = sync.rename("a", "Semis");
    assert!(first.await.is_err());
    assert_eq!(sync.store().get("a").unwrap().name, "Semis");
    // A failure of the newest rename goes back to the last accepted name.
    assert!(second.await.is_err());
    assert_eq!(sync.store().get("a").unwrap().name, "Tech");
}

#[tokio::test]
async fn test_failed_rename_restores_name() {
    let (backend, sync) = setup(FakeBackend::with_watchlists(vec![tech()])).await;
    backend.fail("rename_watchlist");

    let pending = sync.rename("a", "  Chips ");
    assert_eq!(sync.store().get("a").unwrap().name, "Chips");
    assert!(pending.await.is_err());
    assert_eq!(sync.store().get("a").unwrap().name, "Tech");

    backend.heal("rename_watchlist");
    sync.rename("a", "Chips").await.unwrap();
    assert_eq!(sync.store().get("a").unwrap().name, "Chips");
}

#[tokio::test]
async fn test_failed_delete_restores_watchlist_and_selection() {
    let (backend, sync) = setup(FakeBackend::with_watchlists(vec![
        tech(),
        Watchlist::new("b", "Energy"),
    ]))
    .await;
    sync.store().set_active(Some("a")).unwrap();
    backend.fail("delete_watchlist");

    let pending = sync.delete("a");
    assert!(sync.store().active().is_default());
    assert!(pending.await.is_err());

    assert_eq!(sync.store().read(|c| c.ids()), vec!["a", "b"]);
    assert_eq!(sync.store().active(), ActiveWatchlist::Watchlist("a".into()));
}

#[tokio::test]
async fn test_failed_reorder_restores_previous_order() {
    let (backend, sync) = setup(FakeBackend::with_watchlists(vec![
        tech(),
        Watchlist::new("b", "Energy"),
    ]))
    .await;
    backend.fail("reorder_watchlists");
    backend.fail("reorder_items");

    assert!(sync.reorder_lists(vec!["b".into(), "a".into()]).await.is_err());
    assert_eq!(sync.store().read(|c| c.ids()), vec!["a", "b"]);

    assert!(sync
        .reorder_items("a", vec!["MSFT".into(), "AAPL".into()])
        .await
        .is_err());
    assert_eq!(items(&sync, "a"), vec!["AAPL", "MSFT"]);
}

// ---------------------------------------------------------------------------
// Reordering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_superseded_reorders_are_not_sent() {
    let (backend, sync) = setup(FakeBackend::with_watchlists(vec![
        Watchlist::new("a", "Tech").with_items(["A", "B", "C"]),
    ]))
    .await;

    let first = sync.reorder_items("a", vec!["B".into(), "A".into(), "C".into()]);
    let second = sync.reorder_items("a", vec!["C".into(), "B".into(), "A".into()]);
    let third = sync.reorder_items("a", vec!["C".into(), "A".into(), "B".into()]);
    first.await.unwrap();
    second.await.unwrap();
    third.await.unwrap();

    assert_eq!(backend.calls_to("reorder_items"), 1);
    assert_eq!(items(&sync, "a"), vec!["C", "A", "B"]);
    assert_eq!(backend.server_items("a"), vec!["C", "A", "B"]);
}

#[tokio::test]
async fn test_failed_reorder_after_superseded_one_restores_server_order() {
    let (backend, sync) = setup(FakeBackend::with_watchlists(vec![
        Watchlist::new("a", "Tech").with_items(["A", "B", "C"]),
    ]))
    .await;
    backend.fail("reorder_items");

    let first = sync.reorder_items("a", vec!["B".into(), "A".into(), "C".into()]);
    let second = sync.reorder_items("a", vec!["C".into(), "B".into(), "A".into()]);
    first.await.unwrap();
    assert!(second.await.is_err());

    // The skipped reorder never reached the server, so its order is not the one to restore.
    assert_eq!(backend.calls_to("reorder_items"), 1);
    assert_eq!(items(&sync, "a"), vec!["A", "B", "C"]);
    assert_eq!(backend.server_items("a"), vec!["A", "B", "C"]);
}

#[tokio::test]
async fn test_failed_reorder_restores_last_accepted_order() {
    let (backend, sync) = setup(FakeBackend::with_watchlists(vec![
        Watchlist::new("a", "Tech").with_items(["A", "B", "C"]),
    ]))
    .await;

    sync.reorder_items("a", vec!["B".into(), "A".into(), "C".into()])
        .await
        .unwrap();
    backend.fail("reorder_items");
    assert!(sync
        .reorder_items("a", vec!["C".into(), "B".into(), "A".into()])
        .await
        .is_err());

    assert_eq!(items(&sync, "a"), vec!["B", "A", "C"]);
}

#[tokio::test]
async fn test_reorder_items_requires_permutation() {
    let (backend, sync) = setup(FakeBackend::with_watchlists(vec![tech()])).await;

    let err = sync
        .reorder_items("a", vec!["MSFT".into(), "TSLA".into()])
        .await
        .unwrap_err();
    assert!(matches!(err, WatchlistError::Validation(_)));
    assert_eq!(items(&sync, "a"), vec!["AAPL", "MSFT"]);
    assert_eq!(backend.calls_to("reorder_items"), 0);
}

#[tokio::test]
async fn test_drag_and_drop_commit_is_persisted() {
    let (backend, sync) = setup(FakeBackend::with_watchlists(vec![
        Watchlist::new("a", "Tech").with_items(["A", "B", "C", "D"]),
    ]))
    .await;
    let container = ReorderContainer::Items {
        watchlist_id: "a".into(),
    };

    let mut ctl = ReorderController::new();
    ctl.start_drag(container.clone(), items(&sync, "a"), "A");
    ctl.drag_over(&container, "C");
    let DropOutcome::Commit(commit) = ctl.drop(Some((&container, "C"))) else {
        panic!("expected a commit");
    };
    assert_eq!(commit.ordered_ids, vec!["B", "C", "A", "D"]);

    sync.apply_reorder(commit).await.unwrap();
    assert_eq!(backend.server_items("a"), vec!["B", "C", "A", "D"]);
    assert_eq!(
        backend.calls().last().map(String::as_str),
        Some("reorder_items B,C,A,D")
    );
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_create_blank_name_sends_nothing() {
    let (backend, sync) = setup(FakeBackend::with_watchlists(vec![tech()])).await;
    let before = backend.calls().len();
    let snapshot = sync.store().get_all();

    for name in ["", "   "] {
        let err = sync.create(name).await.unwrap_err();
        assert!(matches!(err, WatchlistError::Validation(_)));
    }
    assert_eq!(backend.calls().len(), before);
    assert_eq!(sync.store().get_all(), snapshot);
}

#[tokio::test]
async fn test_create_refetches_and_announces() {
    let (backend, sync) = setup(FakeBackend::with_watchlists(vec![tech()])).await;
    let mut notices = sync.subscribe_notices();

    let created = sync.create(" Energy ").await.unwrap().unwrap();
    assert_eq!(created.name, "Energy");
    assert_eq!(created.id, "wl-1");
    assert_eq!(sync.store().read(|c| c.ids()), vec!["a", "wl-1"]);
    assert_eq!(backend.calls_to("list_watchlists"), 2);

    let notices = drain(&mut notices);
    assert_eq!(notices[0].level, NoticeLevel::Info);
    assert_eq!(notices[0].message, "Watchlist \"Energy\" created!");
}

#[tokio::test]
async fn test_delete_active_falls_back_to_catalog() {
    let (_backend, sync) = setup(FakeBackend::with_watchlists(vec![tech()])).await;
    sync.switch_to(Some("a")).await.unwrap();
    let live = LiveView::new(sync.store().clone(), sync.universe().clone());
    assert_eq!(live.current().title(), "Tech");

    sync.delete("a").await.unwrap();
    assert!(sync.store().active().is_default());
    live.reproject();
    let view = live.current();
    assert_eq!(view.title(), DEFAULT_VIEW_TITLE);
    assert_eq!(view.symbols(), vec!["AAPL", "MSFT"]);
}

#[tokio::test]
async fn test_fetch_failure_keeps_last_state() {
    let (backend, sync) = setup(FakeBackend::with_watchlists(vec![tech()])).await;
    let mut notices = sync.subscribe_notices();
    backend.fail("list_watchlists");

    assert!(sync.fetch_all().await.is_err());
    assert_eq!(sync.store().read(|c| c.ids()), vec!["a"]);
    assert_eq!(drain(&mut notices).len(), 1);
}

#[tokio::test]
async fn test_late_detail_for_deleted_watchlist_is_discarded() {
    let gate = Arc::new(Semaphore::new(0));
    let (backend, sync) = setup(
        FakeBackend::with_watchlists(vec![
            Watchlist::new("a", "Tech").with_items(["NVDA"]),
        ])
        .gated(gate.clone()),
    )
    .await;

    let loading = {
        let sync = sync.clone();
        tokio::spawn(async move { sync.load_items("a").await })
    };
    // Wait until the detail response has been produced and is held at the gate.
    while backend.calls_to("get_watchlist") == 0 {
        tokio::task::yield_now().await;
    }

    sync.delete("a").await.unwrap();
    gate.add_permits(1);

    let loaded = loading.await.unwrap().unwrap();
    assert_eq!(loaded.len(), 1);
    assert!(sync.universe().read(|u| u.get("NVDA").is_none()));
}

#[tokio::test]
async fn test_switch_to_enriches_rows() {
    let (_backend, sync) = setup(FakeBackend::with_watchlists(vec![
        Watchlist::new("a", "Tech").with_items(["NVDA", "AAPL"]),
    ]))
    .await;

    sync.switch_to(Some("a")).await.unwrap();
    let view = sync
        .store()
        .read(|c| sync.universe().read(|u| ActiveViewProjector::project(c, u)));
    assert_eq!(view.symbols(), vec!["NVDA", "AAPL"]);
    assert_eq!(view.rows()[0].name, "NVDA Corp");

    sync.switch_to(None).await.unwrap();
    assert!(sync.store().active().is_default());
}

// ---------------------------------------------------------------------------
// Live prices and orders
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_tick_moves_only_matching_row() {
    let (_backend, sync) = setup(FakeBackend::with_watchlists(vec![tech()])).await;
    sync.store().set_active(Some("a")).unwrap();
    let live = LiveView::new(sync.store().clone(), sync.universe().clone());

    live.apply_tick(&PriceTick::new("AAPL", 150.25));
    let view = live.current();
    assert_eq!(view.symbols(), vec!["AAPL", "MSFT"]);
    assert_eq!(view.rows()[0].price, 150.25);
    assert_eq!(view.rows()[1].price, 400.0);
}

#[tokio::test]
async fn test_order_desk_submits_and_refreshes_balance() {
    let backend = Arc::new(FakeBackend::with_watchlists(vec![]));
    let notifier = Notifier::new();
    let mut notices = notifier.subscribe();
    let desk = OrderDesk::new(backend.clone(), notifier);
    assert_eq!(desk.balance(), None);

    let mut ticket = OrderTicket::new(&instrument("AAPL", "Apple Inc.", 200.0), OrderSide::Buy).unwrap();
    ticket.apply_preset(dec!(1), desk.refresh_balance().await.unwrap());
    assert_eq!(ticket.value, dec!(100));

    let receipt = desk.place(&ticket).await.unwrap();
    assert_eq!(receipt.id, "ord-1");
    assert_eq!(desk.balance(), Some(dec!(10000)));
    assert_eq!(backend.calls_to("get_account_info"), 2);
    assert_eq!(
        drain(&mut notices)[0].message,
        "Order Submitted! ID: ord-1, Status: accepted"
    );
}

#[tokio::test]
async fn test_failed_order_reports_backend_message() {
    let backend = Arc::new(FakeBackend::with_watchlists(vec![]));
    backend.fail("submit_order");
    let notifier = Notifier::new();
    let mut notices = notifier.subscribe();
    let desk = OrderDesk::new(backend.clone(), notifier);

    let mut ticket = OrderTicket::new(&instrument("AAPL", "Apple Inc.", 200.0), OrderSide::Sell).unwrap();
    ticket.set_value(dec!(20));
    assert!(desk.place(&ticket).await.is_err());
    assert_eq!(
        drain(&mut notices)[0].message,
        "Order Failed: submit_order exploded"
    );
    assert_eq!(backend.calls_to("get_account_info"), 0);
}
