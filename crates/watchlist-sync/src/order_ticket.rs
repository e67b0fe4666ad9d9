//! Order ticket and submission
//!
//! The ticket is sized in account currency. Units are derived from the last
//! price at submit time; the backend only ever sees a market/day order.

use dashboard_backend::{DashboardBackend, Instrument, OrderReceipt, OrderRequest, OrderSide};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::{WatchlistError, WatchlistResult};
use crate::models::normalize_symbol;
use crate::notice::Notifier;

/// Half the displayed spread around the last price.
const QUOTE_OFFSET: Decimal = dec!(0.01);

#[derive(Debug, Clone, PartialEq)]
pub struct OrderTicket {
    pub symbol: String,
    pub side: OrderSide,
    pub last_price: Decimal,
    /// Order value in account currency
    pub value: Decimal,
}

impl OrderTicket {
    pub fn new(instrument: &Instrument, side: OrderSide) -> WatchlistResult<Self> {
        let last_price = Decimal::from_f64(instrument.price)
            .filter(|p| p.is_sign_positive() && !p.is_zero())
            .ok_or_else(|| {
                WatchlistError::validation(format!("No price available for {}", instrument.symbol))
            })?;

        Ok(Self {
            symbol: normalize_symbol(&instrument.symbol),
            side,
            last_price,
            value: Decimal::ZERO,
        })
    }

    pub fn set_value(&mut self, value: Decimal) {
        self.value = value;
    }

    /// Size the order as `pct` percent of account equity.
    pub fn apply_preset(&mut self, pct: Decimal, equity: Decimal) {
        self.value = (equity * pct / dec!(100)).round_dp(2);
    }

    pub fn units(&self) -> Decimal {
        if self.last_price.is_zero() {
            return Decimal::ZERO;
        }
        self.value / self.last_price
    }

    pub fn units_display(&self) -> String {
        format!("{:.4}", self.units())
    }

    pub fn sell_quote(&self) -> Decimal {
        self.last_price - QUOTE_OFFSET
    }

    pub fn buy_quote(&self) -> Decimal {
        self.last_price + QUOTE_OFFSET
    }

    pub fn to_request(&self) -> WatchlistResult<OrderRequest> {
        let qty = self.units();
        if qty <= Decimal::ZERO {
            return Err(WatchlistError::validation("Order quantity must be greater than zero"));
        }
        Ok(OrderRequest::market(self.symbol.clone(), qty, self.side))
    }
}

/// Places orders and tracks the account balance.
pub struct OrderDesk {
    backend: Arc<dyn DashboardBackend>,
    notifier: Notifier,
    balance: watch::Sender<Option<Decimal>>,
}

impl OrderDesk {
    pub fn new(backend: Arc<dyn DashboardBackend>, notifier: Notifier) -> Self {
        let (balance, _) = watch::channel(None);
        Self {
            backend,
            notifier,
            balance,
        }
    }

    /// Last known equity, `None` until the first successful refresh.
    pub fn balance(&self) -> Option<Decimal> {
        *self.balance.borrow()
    }

    pub async fn refresh_balance(&self) -> WatchlistResult<Decimal> {
        match self.backend.get_account_info().await {
            Ok(info) => {
                tracing::debug!("Account equity: {}", info.equity);
                self.balance.send_replace(Some(info.equity));
                Ok(info.equity)
            }
            Err(e) => {
                let err = WatchlistError::from(e);
                self.notifier.failure("Load account balance", &err);
                Err(err)
            }
        }
    }

    pub async fn place(&self, ticket: &OrderTicket) -> WatchlistResult<OrderReceipt> {
        let request = ticket.to_request()?;
        tracing::info!(
            "Submitting {} order for {} {} (value {})",
            request.side.as_str(),
            request.qty,
            request.symbol,
            ticket.value
        );

        match self.backend.submit_order(&request).await {
            Ok(receipt) => {
                self.notifier.info(format!(
                    "Order Submitted! ID: {}, Status: {}",
                    receipt.id, receipt.status
                ));
                // Balance refresh failures are reported on their own.
                let _ = self.refresh_balance().await;
                Ok(receipt)
            }
            Err(e) => {
                let err = WatchlistError::from(e);
                self.notifier.failure("Order Failed", &err);
                Err(err)
            }
        }
    }
}
