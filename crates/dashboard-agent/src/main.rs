use std::sync::Arc;

use anyhow::Result;
use dashboard_client::{DashboardBackend, HttpDashboardClient, PriceStream};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use watchlist_sync::{
    LiveView, NoticeLevel, Notifier, OrderDesk, SharedUniverse, WatchlistError, WatchlistStore,
    WatchlistSync,
};

mod actions;
mod config;

use actions::{Dashboard, Flow, UiAction};
use config::DashboardConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load .env, init tracing
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
        tracing::error!("PANIC: {info}");
    }));

    // 2. Configuration
    let config = DashboardConfig::from_env()?;
    tracing::info!("Configuration loaded");
    tracing::info!("  Backend: {}", config.api_url);
    tracing::info!(
        "  Price stream: {} ({})",
        config.stream_url,
        if config.stream_enabled { "enabled" } else { "disabled" }
    );

    // 3. Backend and state
    let backend = Arc::new(HttpDashboardClient::new(
        config.api_url.clone(),
        config.http_timeout(),
    )?);
    tracing::info!("Using {} backend at {}", backend.backend_name(), backend.base_url());

    let store = WatchlistStore::new();
    let universe = SharedUniverse::default();
    let notifier = Notifier::new();
    let sync = WatchlistSync::new(backend.clone(), store.clone(), universe.clone(), notifier.clone());
    let desk = OrderDesk::new(backend.clone(), notifier.clone());

    // 4. Realtime prices
    let (stream, ticks) = if config.stream_enabled {
        let (stream, ticks) = PriceStream::new(config.stream_url.clone(), config.reconnect_delay());
        let stream = Arc::new(stream);
        let runner = stream.clone();
        tokio::spawn(async move { runner.run().await });
        (Some(stream), ticks)
    } else {
        // Sender dropped at once: the live view sees a closed feed.
        let (_, ticks) = broadcast::channel(1);
        (None, ticks)
    };

    let live = Arc::new(LiveView::new(store.clone(), universe.clone()));
    {
        let live = live.clone();
        tokio::spawn(async move { live.run(ticks).await });
    }

    // 5. Notices
    {
        let mut notices = notifier.subscribe();
        tokio::spawn(async move {
            loop {
                match notices.recv().await {
                    Ok(notice) => match notice.level {
                        NoticeLevel::Info => println!("[ok] {}", notice.message),
                        NoticeLevel::Error => println!("[error] {}", notice.message),
                    },
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    // 6. Initial load; failures are already shown as notices
    let _ = sync.fetch_all().await;
    let _ = sync.load_catalog().await;
    let _ = desk.refresh_balance().await;
    live.reproject();

    let mut dashboard = Dashboard::new(sync, live.clone(), desk);
    actions::print_view(&live.current());
    println!("type 'help' for commands");

    // 7. Command loop
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let action = match line.parse::<UiAction>() {
            Ok(action) => action,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match dashboard.dispatch(action).await {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(e) => match e.downcast_ref::<WatchlistError>() {
                // Shown as a notice already
                Some(WatchlistError::Backend(_)) => {}
                _ => println!("error: {:#}", e),
            },
        }
    }

    tracing::info!("Shutting down");
    live.shutdown();
    if let Some(stream) = stream {
        stream.shutdown();
    }
    Ok(())
}
