use crate::models::*;
use anyhow::Result;
use async_trait::async_trait;
use dashboard_backend::{
    AccountInfo, BackendError, BackendResult, DashboardBackend, Instrument, OrderReceipt,
    OrderRequest, Watchlist, WatchlistDetail,
};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// REST client for the dashboard backend.
pub struct HttpDashboardClient {
    client: Client,
    base_url: String,
}

impl HttpDashboardClient {
    /// Create a new client against `base_url` (e.g. `http://localhost:5000`)
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Get the base URL (for logging/diagnostics)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request, turning transport failures and non-2xx statuses into `BackendError`.
    async fn send(&self, request: RequestBuilder) -> BackendResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status,
                message: error_message_from_body(&body),
            });
        }

        Ok(response)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> BackendResult<T> {
        let text = response
            .text()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| BackendError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl DashboardBackend for HttpDashboardClient {
    async fn list_watchlists(&self) -> BackendResult<Vec<Watchlist>> {
        let response = self.send(self.client.get(self.url("/api/watchlists"))).await?;
        let body: WatchlistsResponse = Self::read_json(response).await?;

        if !body.success {
            return Err(BackendError::Rejected(
                body.error.unwrap_or_else(|| "Failed to load watchlists".to_string()),
            ));
        }

        Ok(body.watchlists)
    }

    async fn create_watchlist(&self, name: &str) -> BackendResult<String> {
        let request = self
            .client
            .post(self.url("/api/create_watchlist"))
            .json(&CreateWatchlistRequest {
                watchlist_name: name,
            });
        let body: CreateWatchlistResponse = Self::read_json(self.send(request).await?).await?;

        if !body.success {
            return Err(BackendError::Rejected(
                body.error
                    .unwrap_or_else(|| "Failed to create watchlist".to_string()),
            ));
        }

        let created = body.watchlist_name.unwrap_or_else(|| name.to_string());
        tracing::info!("Watchlist created: {}", created);
        Ok(created)
    }

    async fn rename_watchlist(&self, id: &str, name: &str) -> BackendResult<()> {
        let request = self
            .client
            .put(self.url(&format!("/api/watchlist/{}", id)))
            .json(&RenameWatchlistRequest { name });
        self.send(request).await?;
        Ok(())
    }

    async fn delete_watchlist(&self, id: &str) -> BackendResult<()> {
        let request = self.client.delete(self.url(&format!("/api/watchlist/{}", id)));
        self.send(request).await?;
        tracing::info!("Watchlist {} deleted", id);
        Ok(())
    }

    async fn get_watchlist(&self, id: &str) -> BackendResult<WatchlistDetail> {
        let request = self.client.get(self.url(&format!("/api/watchlist/{}", id)));
        Self::read_json(self.send(request).await?).await
    }

    async fn add_item(&self, watchlist_id: &str, symbol: &str) -> BackendResult<()> {
        let request = self
            .client
            .post(self.url("/api/watchlist/item"))
            .json(&WatchlistItemRequest {
                watchlist_id,
                symbol,
            });
        self.send(request).await?;
        Ok(())
    }

    async fn remove_item(&self, watchlist_id: &str, symbol: &str) -> BackendResult<()> {
        let request = self
            .client
            .delete(self.url("/api/watchlist/item"))
            .json(&WatchlistItemRequest {
                watchlist_id,
                symbol,
            });
        self.send(request).await?;
        Ok(())
    }

    async fn reorder_watchlists(&self, ordered_ids: &[String]) -> BackendResult<()> {
        let request = self
            .client
            .post(self.url("/api/watchlist/reorder"))
            .json(&ReorderWatchlistsRequest { ordered_ids });
        self.send(request).await?;
        Ok(())
    }

    async fn reorder_items(
        &self,
        watchlist_id: &str,
        ordered_items: &[String],
    ) -> BackendResult<()> {
        let request = self
            .client
            .post(self.url("/api/watchlist/item/reorder"))
            .json(&ReorderItemsRequest {
                watchlist_id,
                ordered_items,
            });
        self.send(request).await?;
        Ok(())
    }

    async fn list_instruments(&self) -> BackendResult<Vec<Instrument>> {
        let response = self.send(self.client.get(self.url("/api/stocks"))).await?;
        let catalog: CatalogResponse = Self::read_json(response).await?;
        Ok(catalog.into_instruments())
    }

    async fn submit_order(&self, order: &OrderRequest) -> BackendResult<OrderReceipt> {
        tracing::info!("Submitting order: {:?}", order);

        let request = self.client.post(self.url("/api/order")).json(order);
        let receipt: OrderReceipt = Self::read_json(self.send(request).await?).await?;

        tracing::info!("Order submitted successfully: {} ({})", receipt.id, receipt.status);
        Ok(receipt)
    }

    async fn get_account_info(&self) -> BackendResult<AccountInfo> {
        let response = self.send(self.client.get(self.url("/api/account_info"))).await?;
        Self::read_json(response).await
    }

    fn backend_name(&self) -> &str {
        "http"
    }
}
