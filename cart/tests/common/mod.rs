//! Shared fixtures for cart integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use rocket_cart::config::CartConfig;
use rocket_cart::mocks::{InMemoryKeyValueStore, MockProductCatalog, MockStockOracle, RecordingNotifier};
use rocket_cart::{CartEnvironment, CartStorage, CartStore, Product};
use std::sync::Arc;

pub const KEY: &str = "@rocket-cart:cart";

/// Collaborator doubles plus handles to inspect them after the fact.
pub struct Harness {
    pub stock: MockStockOracle,
    pub catalog: MockProductCatalog,
    pub storage: InMemoryKeyValueStore,
    pub notifier: RecordingNotifier,
    pub config: CartConfig,
}

impl Harness {
    /// Products 1..=3 in the catalog; product 1 has 5 in stock, 2 has 1, 3 has 0.
    pub fn new() -> Self {
        Self {
            stock: MockStockOracle::new()
                .with_stock(1, 5)
                .with_stock(2, 1)
                .with_stock(3, 0),
            catalog: MockProductCatalog::new()
                .with_product(1, "Tênis de Caminhada Leve Confortável", 179.9)
                .with_product(2, "Tênis VR Caminhada Confort Detalhes Couro Masculino", 139.9)
                .with_product(3, "Tênis Adidas Duramo Lite 2.0", 219.9),
            storage: InMemoryKeyValueStore::new(),
            notifier: RecordingNotifier::new(),
            config: CartConfig::default(),
        }
    }

    pub fn with_storage(mut self, storage: InMemoryKeyValueStore) -> Self {
        self.storage = storage;
        self
    }

    pub fn env(&self) -> CartEnvironment {
        CartEnvironment::new(
            Arc::new(self.stock.clone()),
            Arc::new(self.catalog.clone()),
            CartStorage::new(Arc::new(self.storage.clone()), KEY),
            Arc::new(self.notifier.clone()),
        )
    }

    pub fn cart(&self) -> CartStore {
        CartStore::new(self.env(), &self.config)
    }

    /// Cart as persisted, `None` if never written
    pub fn persisted(&self) -> Option<Vec<Product>> {
        self.storage
            .raw(KEY)
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }

    /// Persisted cart reduced to `(id, amount)` pairs
    pub fn persisted_amounts(&self) -> Vec<(u64, u32)> {
        amounts(&self.persisted().unwrap_or_default())
    }
}

pub fn amounts(items: &[Product]) -> Vec<(u64, u32)> {
    items.iter().map(|item| (item.id.get(), item.amount)).collect()
}
