//! Injected dependencies of the cart reducer.
//!
//! Each collaborator is a dyn-compatible trait so production implementations
//! ([`HttpInventoryClient`](crate::http::HttpInventoryClient),
//! [`FileKeyValueStore`](crate::persistence::FileKeyValueStore)) and the test
//! doubles in [`mocks`](crate::mocks) can be swapped freely.

use crate::error::{CartError, LookupError, StorageError};
use crate::types::{CatalogProduct, Product, ProductId, RequestId, StockRecord};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{oneshot, watch};

/// Boxed future returned by the lookup traits
pub type LookupFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, LookupError>> + Send + 'a>>;

/// Authoritative source of available stock.
///
/// Implementations must be fresh on every call; the cart never caches
/// stock.
pub trait StockOracle: Send + Sync {
    /// Available quantity for `id`
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] if the stock service cannot answer.
    fn stock(&self, id: ProductId) -> LookupFuture<'_, StockRecord>;
}

/// Source of product descriptions.
pub trait ProductCatalog: Send + Sync {
    /// Catalog entry for `id`
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] if the catalog cannot answer.
    fn product(&self, id: ProductId) -> LookupFuture<'_, CatalogProduct>;
}

/// Synchronous string key-value store that survives restarts.
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`, if any
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the backend fails.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Write`] if the backend fails.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Sink for user-facing error notifications.
///
/// Called once per failed operation. Must not block.
pub trait Notifier: Send + Sync {
    /// Deliver `error` to the user
    fn notify(&self, error: &CartError);
}

/// The cart's view of persistence: one JSON array under one key.
#[derive(Clone)]
pub struct CartStorage {
    backend: Arc<dyn KeyValueStore>,
    key: String,
}

impl CartStorage {
    /// Persist the cart under `key` in `backend`
    pub fn new(backend: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// Storage key
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the persisted cart.
    ///
    /// Absent and malformed values both yield an empty cart; a malformed
    /// value is logged.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] only if the backend itself fails.
    pub fn load(&self) -> Result<Vec<Product>, StorageError> {
        let Some(raw) = self.backend.get(&self.key)? else {
            tracing::debug!(key = %self.key, "No persisted cart");
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<Product>>(&raw) {
            Ok(items) => Ok(items),
            Err(error) => {
                tracing::warn!(key = %self.key, %error, "Ignoring malformed persisted cart");
                Ok(Vec::new())
            },
        }
    }

    /// Write `items` as the new persisted cart
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if serialization or the write fails.
    pub fn save(&self, items: &[Product]) -> Result<(), StorageError> {
        let raw =
            serde_json::to_string(items).map_err(|e| StorageError::Serialize(e.to_string()))?;
        self.backend.set(&self.key, &raw)
    }
}

/// Publishes every committed cart to subscribers.
#[derive(Clone)]
pub struct CartFeed {
    sender: Arc<watch::Sender<Vec<Product>>>,
}

impl CartFeed {
    /// Feed whose subscribers start at `initial`
    #[must_use]
    pub fn new(initial: Vec<Product>) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Replace the published cart
    pub fn publish(&self, items: Vec<Product>) {
        self.sender.send_replace(items);
    }

    /// Receiver holding the last committed cart
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<Product>> {
        self.sender.subscribe()
    }
}

/// Final result of one cart operation, as seen by its caller
pub type Outcome = Result<(), CartError>;

/// What the reducer may do with a request it is about to settle.
#[derive(Debug)]
pub enum Claim {
    /// A caller is waiting for the outcome
    Waiting(oneshot::Sender<Outcome>),
    /// Nobody registered the request
    Unobserved,
    /// The caller gave up; the request must not commit or notify
    Abandoned,
}

impl Claim {
    /// Hand `outcome` to the waiting caller, if there is one
    pub fn resolve(self, outcome: Outcome) {
        if let Self::Waiting(sender) = self {
            // The caller may already be gone
            let _ = sender.send(outcome);
        }
    }
}

#[derive(Debug, Default)]
struct Registry {
    waiting: HashMap<RequestId, oneshot::Sender<Outcome>>,
    abandoned: HashSet<RequestId>,
}

/// Per-request outcome delivery between [`CartStore`](crate::CartStore)
/// callers and the reducer.
///
/// A request is claimed exactly once, when the reducer commits, rejects or
/// ignores it. A caller that stops waiting first abandons the request, and
/// the claim then tells the reducer to drop it.
#[derive(Clone, Debug, Default)]
pub struct PendingRequests {
    registry: Arc<Mutex<Registry>>,
}

impl PendingRequests {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start waiting for `request_id`
    pub fn register(&self, request_id: RequestId) -> oneshot::Receiver<Outcome> {
        let (sender, receiver) = oneshot::channel();
        self.lock().waiting.insert(request_id, sender);
        receiver
    }

    /// Take the right to settle `request_id`
    pub fn claim(&self, request_id: RequestId) -> Claim {
        let mut registry = self.lock();
        if let Some(sender) = registry.waiting.remove(&request_id) {
            Claim::Waiting(sender)
        } else if registry.abandoned.remove(&request_id) {
            Claim::Abandoned
        } else {
            Claim::Unobserved
        }
    }

    /// Stop waiting for `request_id` and drop it when it is claimed.
    ///
    /// Returns `false` if the request was already claimed, in which case its
    /// outcome is on the way.
    pub fn abandon(&self, request_id: RequestId) -> bool {
        let mut registry = self.lock();
        if registry.waiting.remove(&request_id).is_some() {
            registry.abandoned.insert(request_id);
            true
        } else {
            false
        }
    }

    /// Stop waiting for a request the store never accepted
    pub fn forget(&self, request_id: RequestId) {
        self.lock().waiting.remove(&request_id);
    }

    /// Requests registered and not yet claimed or abandoned
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.lock().waiting.len()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Everything the cart reducer needs from the outside world.
#[derive(Clone)]
pub struct CartEnvironment {
    /// Stock lookups
    pub stock: Arc<dyn StockOracle>,
    /// Catalog lookups
    pub catalog: Arc<dyn ProductCatalog>,
    /// Write-through persistence
    pub storage: CartStorage,
    /// Error sink
    pub notifier: Arc<dyn Notifier>,
    /// Committed-cart feed
    pub feed: CartFeed,
    /// Callers waiting on outcomes
    pub pending: PendingRequests,
}

impl CartEnvironment {
    /// Wire collaborators together; the feed starts empty and is reset by
    /// [`CartStore::new`](crate::CartStore::new) to the loaded cart.
    pub fn new(
        stock: Arc<dyn StockOracle>,
        catalog: Arc<dyn ProductCatalog>,
        storage: CartStorage,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            stock,
            catalog,
            storage,
            notifier,
            feed: CartFeed::new(Vec::new()),
            pending: PendingRequests::new(),
        }
    }
}
