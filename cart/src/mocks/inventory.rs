//! Stock and catalog doubles.

use crate::environment::{LookupFuture, ProductCatalog, StockOracle};
use crate::error::LookupError;
use crate::types::{CatalogProduct, ProductId, StockRecord};
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Stock service double.
///
/// Unknown products answer [`LookupError::NotFound`]; products marked with
/// [`MockStockOracle::fail_for`] answer a transport error.
///
/// # Example
///
/// ```
/// use rocket_cart::mocks::MockStockOracle;
///
/// let stock = MockStockOracle::new().with_stock(1, 5).with_stock(2, 0);
/// stock.set_stock(2, 3);
/// assert_eq!(stock.calls(), 0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct MockStockOracle {
    stock: Arc<RwLock<HashMap<ProductId, u32>>>,
    failing: Arc<RwLock<HashSet<ProductId>>>,
    latency: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl MockStockOracle {
    /// Oracle with no stock records
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: `amount` units available for `id`
    #[must_use]
    pub fn with_stock(self, id: u64, amount: u32) -> Self {
        self.set_stock(id, amount);
        self
    }

    /// Builder: every lookup sleeps for `latency` first
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Change the available quantity for `id`
    pub fn set_stock(&self, id: u64, amount: u32) {
        self.stock
            .write()
            .unwrap()
            .insert(ProductId::new(id), amount);
    }

    /// Make lookups for `id` fail
    pub fn fail_for(&self, id: u64) {
        self.failing.write().unwrap().insert(ProductId::new(id));
    }

    /// Make lookups for `id` succeed again
    pub fn recover(&self, id: u64) {
        self.failing.write().unwrap().remove(&ProductId::new(id));
    }

    /// Number of lookups made
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer(&self, id: ProductId) -> Result<StockRecord, LookupError> {
        if self.failing.read().unwrap().contains(&id) {
            return Err(LookupError::Transport("connection refused".to_string()));
        }
        self.stock
            .read()
            .unwrap()
            .get(&id)
            .map(|&amount| StockRecord { id, amount })
            .ok_or(LookupError::NotFound(id))
    }
}

impl StockOracle for MockStockOracle {
    fn stock(&self, id: ProductId) -> LookupFuture<'_, StockRecord> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            self.answer(id)
        })
    }
}

/// Catalog double.
#[derive(Clone, Debug, Default)]
pub struct MockProductCatalog {
    products: Arc<RwLock<HashMap<ProductId, CatalogProduct>>>,
    failing: Arc<RwLock<HashSet<ProductId>>>,
    calls: Arc<AtomicUsize>,
}

impl MockProductCatalog {
    /// Empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: catalog entry for `id` with a title and a price
    #[must_use]
    pub fn with_product(self, id: u64, title: &str, price: f64) -> Self {
        let mut attributes = Map::new();
        attributes.insert("title".to_string(), Value::from(title));
        attributes.insert("price".to_string(), json!(price));
        self.insert(CatalogProduct {
            id: ProductId::new(id),
            attributes,
        });
        self
    }

    /// Builder: catalog entry for `id` with arbitrary attributes
    #[must_use]
    pub fn with_attributes(self, id: u64, attributes: Map<String, Value>) -> Self {
        self.insert(CatalogProduct {
            id: ProductId::new(id),
            attributes,
        });
        self
    }

    /// Make lookups for `id` fail
    pub fn fail_for(&self, id: u64) {
        self.failing.write().unwrap().insert(ProductId::new(id));
    }

    /// Number of lookups made
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn insert(&self, product: CatalogProduct) {
        self.products.write().unwrap().insert(product.id, product);
    }

    fn answer(&self, id: ProductId) -> Result<CatalogProduct, LookupError> {
        if self.failing.read().unwrap().contains(&id) {
            return Err(LookupError::Status { status: 503 });
        }
        self.products
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(LookupError::NotFound(id))
    }
}

impl ProductCatalog for MockProductCatalog {
    fn product(&self, id: ProductId) -> LookupFuture<'_, CatalogProduct> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer(id)
        })
    }
}
