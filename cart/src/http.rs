//! HTTP stock and catalog client.

use crate::environment::{LookupFuture, ProductCatalog, StockOracle};
use crate::error::LookupError;
use crate::types::{CatalogProduct, ProductId, StockRecord};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Client for the inventory API.
///
/// - `GET {base}/stock/{id}` returns `{"id": 1, "amount": 3}`
/// - `GET {base}/products/{id}` returns `{"id": 1, ...display fields}`
#[derive(Debug, Clone)]
pub struct HttpInventoryClient {
    client: Client,
    base_url: String,
}

impl HttpInventoryClient {
    /// Client for the API at `base_url`
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, LookupError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// API base URL, without a trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        resource: &str,
        id: ProductId,
    ) -> Result<T, LookupError> {
        let url = format!("{}/{resource}/{id}", self.base_url);
        tracing::debug!(%url, "Inventory lookup");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        match response.status() {
            status if status.is_success() => response
                .json::<T>()
                .await
                .map_err(|e| LookupError::Decode(e.to_string())),
            StatusCode::NOT_FOUND => Err(LookupError::NotFound(id)),
            status => Err(LookupError::Status {
                status: status.as_u16(),
            }),
        }
    }
}

impl StockOracle for HttpInventoryClient {
    fn stock(&self, id: ProductId) -> LookupFuture<'_, StockRecord> {
        Box::pin(self.get_json::<StockRecord>("stock", id))
    }
}

impl ProductCatalog for HttpInventoryClient {
    fn product(&self, id: ProductId) -> LookupFuture<'_, CatalogProduct> {
        Box::pin(self.get_json::<CatalogProduct>("products", id))
    }
}
