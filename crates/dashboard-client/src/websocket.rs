use dashboard_backend::PriceTick;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_tungstenite::{connect_async, tungstenite::Message};

const PRICE_UPDATE_EVENT: &str = "price_update";

/// Process-wide subscription to the backend's `price_update` push channel.
///
/// One connection, fanned out to any number of receivers. Reconnects after
/// `reconnect_delay` on error until `shutdown` is called.
pub struct PriceStream {
    url: String,
    reconnect_delay: Duration,
    tx: broadcast::Sender<PriceTick>,
    shutdown: Arc<tokio::sync::Notify>,
}

impl PriceStream {
    pub fn new(
        url: impl Into<String>,
        reconnect_delay: Duration,
    ) -> (Self, broadcast::Receiver<PriceTick>) {
        let (tx, rx) = broadcast::channel(1024);
        let stream = Self {
            url: url.into(),
            reconnect_delay,
            tx,
            shutdown: Arc::new(tokio::sync::Notify::new()),
        };
        (stream, rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PriceTick> {
        self.tx.subscribe()
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    pub async fn run(&self) {
        loop {
            match self.connect_and_stream().await {
                Ok(()) => {
                    tracing::info!("Price stream disconnected gracefully");
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        "Price stream error: {}, reconnecting in {}s",
                        e,
                        self.reconnect_delay.as_secs()
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(self.reconnect_delay) => {},
                        _ = self.shutdown.notified() => {
                            tracing::info!("Price stream shutdown requested");
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn connect_and_stream(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let (ws_stream, _) = connect_async(self.url.as_str()).await?;
        let (mut write, mut read) = ws_stream.split();
        tracing::info!("Connected to price stream at {}", self.url);

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_message(&text);
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = write.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::info!("Price stream connection closed");
                            return Ok(());
                        }
                        Some(Err(e)) => {
                            return Err(Box::new(e));
                        }
                        _ => {}
                    }
                }
                _ = self.shutdown.notified() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }
            }
        }
    }

    fn handle_message(&self, text: &str) {
        for tick in parse_price_message(text) {
            tracing::debug!("Price update: {} {}", tick.symbol, tick.price);
            // No receivers is fine: nobody is displaying prices yet.
            let _ = self.tx.send(tick);
        }
    }
}

/// Decode one text frame into zero or more ticks.
///
/// Accepted shapes: `{"event":"price_update","data":{..}}`,
/// `["price_update", {..}]`, a bare `{symbol, price}` object, or a JSON array
/// of any of those. Everything else yields nothing.
pub fn parse_price_message(text: &str) -> Vec<PriceTick> {
    let Ok(value) = serde_json::from_str::<Value>(text) else {
        return Vec::new();
    };
    let mut ticks = Vec::new();
    collect_ticks(&value, &mut ticks);
    ticks
}

fn collect_ticks(value: &Value, out: &mut Vec<PriceTick>) {
    match value {
        Value::Array(items) => {
            if let [Value::String(event), payload] = items.as_slice() {
                if event == PRICE_UPDATE_EVENT {
                    if let Some(tick) = tick_from_payload(payload) {
                        out.push(tick);
                    }
                }
                return;
            }
            for item in items {
                collect_ticks(item, out);
            }
        }
        Value::Object(map) => match map.get("event").and_then(|e| e.as_str()) {
            Some(PRICE_UPDATE_EVENT) => {
                if let Some(tick) = map.get("data").and_then(tick_from_payload) {
                    out.push(tick);
                }
            }
            Some(_) => {}
            None => {
                if let Some(tick) = tick_from_payload(value) {
                    out.push(tick);
                }
            }
        },
        _ => {}
    }
}

fn tick_from_payload(payload: &Value) -> Option<PriceTick> {
    let symbol = payload.get("symbol")?.as_str()?.trim();
    if symbol.is_empty() {
        return None;
    }
    let price = match payload.get("price")? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.parse().ok()?,
        _ => return None,
    };
    if !price.is_finite() {
        return None;
    }
    Some(PriceTick::new(symbol.to_uppercase(), price))
}
