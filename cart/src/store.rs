//! [`CartStore`], the public face of the cart.

use crate::config::CartConfig;
use crate::environment::{CartEnvironment, Outcome};
use crate::error::CartError;
use crate::metrics::CartMetrics;
use crate::reducer::CartReducer;
use crate::types::{CartAction, CartState, Operation, Product, ProductId, RequestId};
use rocket_cart_runtime::{Store, StoreError};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, oneshot, watch};

/// Store type driving the cart
pub type CartRuntime = Store<CartState, CartAction, CartEnvironment, CartReducer>;

/// Shopping cart handle.
///
/// Cheap to clone; all clones share the same cart. Every operation resolves
/// once its outcome is final: `Ok(())` when the cart was committed (or the
/// command was a no-op), `Err` when it was rejected. Rejections are also
/// delivered to the environment's notifier exactly once, and leave the cart
/// untouched.
///
/// With a command timeout configured, an operation that times out is
/// abandoned: it reports [`CartError::Unavailable`] and its late lookup
/// results are discarded without committing.
///
/// # Example
///
/// ```ignore
/// let cart = CartStore::new(env, &CartConfig::default());
///
/// cart.add_product(ProductId::new(1)).await?;
/// cart.update_product_amount(ProductId::new(1), 3).await?;
/// println!("{} items", cart.state().await.item_count());
/// ```
#[derive(Clone)]
pub struct CartStore {
    store: Arc<CartRuntime>,
    next_request: Arc<AtomicU64>,
    command_timeout: Option<Duration>,
}

impl CartStore {
    /// Build a cart, loading the persisted contents.
    ///
    /// A missing or malformed persisted value (or a failing read) starts an
    /// empty cart. Loaded items are not re-validated against stock.
    #[must_use]
    pub fn new(env: CartEnvironment, config: &CartConfig) -> Self {
        let items = env.storage.load().unwrap_or_else(|error| {
            tracing::warn!(%error, "Failed to read persisted cart, starting empty");
            Vec::new()
        });
        tracing::info!(
            key = env.storage.key(),
            unique_items = items.len(),
            "Cart loaded"
        );

        env.feed.publish(items.clone());

        let store = Store::with_broadcast_capacity(
            CartState::new(items),
            CartReducer::new(),
            env,
            config.broadcast_capacity,
        );

        Self {
            store: Arc::new(store),
            next_request: Arc::new(AtomicU64::new(1)),
            command_timeout: config.command_timeout(),
        }
    }

    /// Add one unit of `product_id`, fetching its catalog entry if it is new
    ///
    /// # Errors
    ///
    /// - [`CartError::OutOfStock`] if one more unit exceeds stock
    /// - [`CartError::Collaborator`] if a lookup or the write fails
    /// - [`CartError::Unavailable`] if the store is shutting down or the
    ///   command timed out
    #[tracing::instrument(skip(self))]
    pub async fn add_product(&self, product_id: ProductId) -> Result<(), CartError> {
        let request_id = self.next_request_id();
        self.execute(
            Operation::Add,
            CartAction::AddProduct {
                request_id,
                product_id,
            },
        )
        .await
    }

    /// Remove `product_id` from the cart
    ///
    /// # Errors
    ///
    /// - [`CartError::NotFound`] if the product is not in the cart
    /// - [`CartError::Collaborator`] if the write fails
    /// - [`CartError::Unavailable`] if the store is shutting down
    #[tracing::instrument(skip(self))]
    pub async fn remove_product(&self, product_id: ProductId) -> Result<(), CartError> {
        let request_id = self.next_request_id();
        self.execute(
            Operation::Remove,
            CartAction::RemoveProduct {
                request_id,
                product_id,
            },
        )
        .await
    }

    /// Set the quantity of `product_id`.
    ///
    /// Non-positive amounts are ignored and return `Ok(())`.
    ///
    /// # Errors
    ///
    /// - [`CartError::OutOfStock`] if `amount` exceeds stock
    /// - [`CartError::NotFound`] if the product is not in the cart
    /// - [`CartError::Collaborator`] if the stock lookup or the write fails
    /// - [`CartError::Unavailable`] if the store is shutting down or the
    ///   command timed out
    #[tracing::instrument(skip(self))]
    pub async fn update_product_amount(
        &self,
        product_id: ProductId,
        amount: i64,
    ) -> Result<(), CartError> {
        let request_id = self.next_request_id();
        self.execute(
            Operation::UpdateAmount,
            CartAction::UpdateProductAmount {
                request_id,
                product_id,
                amount,
            },
        )
        .await
    }

    /// Current line items
    pub async fn cart(&self) -> Vec<Product> {
        self.store.state(|s| s.items.clone()).await
    }

    /// Snapshot of the whole state, for the convenience reads on [`CartState`]
    pub async fn state(&self) -> CartState {
        self.store.state(Clone::clone).await
    }

    /// Receiver that always holds the last committed cart
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<Product>> {
        self.store.environment().feed.subscribe()
    }

    /// Every action produced by effects: lookup results and outcomes
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<CartAction> {
        self.store.subscribe_actions()
    }

    /// Stop accepting operations and wait for in-flight ones.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if lookups are still running
    /// after `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        tracing::info!("Shutting down cart");
        self.store.shutdown(timeout).await
    }

    fn next_request_id(&self) -> RequestId {
        RequestId::new(self.next_request.fetch_add(1, Ordering::Relaxed))
    }

    async fn execute(&self, operation: Operation, action: CartAction) -> Result<(), CartError> {
        let request_id = action.request_id();
        let pending = &self.store.environment().pending;
        let started = Instant::now();

        let mut outcome = pending.register(request_id);
        let settled = match self.store.send(action).await {
            Ok(_) => self.wait(request_id, &mut outcome).await,
            Err(store_error) => {
                pending.forget(request_id);
                Err(store_error)
            },
        };

        CartMetrics::record_duration(started.elapsed());

        settled.unwrap_or_else(|store_error| {
            let error = CartError::Unavailable {
                operation,
                reason: store_error.to_string(),
            };
            tracing::warn!(%request_id, %error, "Cart command did not complete");
            CartMetrics::record_rejection(error.kind().as_str());
            self.store.environment().notifier.notify(&error);
            Err(error)
        })
    }

    /// Wait for the reducer to settle `request_id`, abandoning it on timeout
    async fn wait(
        &self,
        request_id: RequestId,
        outcome: &mut oneshot::Receiver<Outcome>,
    ) -> Result<Outcome, StoreError> {
        let Some(limit) = self.command_timeout else {
            return outcome.await.map_err(|_| StoreError::ChannelClosed);
        };

        let timed = tokio::time::timeout(limit, &mut *outcome).await;
        match timed {
            Ok(received) => received.map_err(|_| StoreError::ChannelClosed),
            Err(_) if self.store.environment().pending.abandon(request_id) => {
                Err(StoreError::Timeout)
            },
            // Claimed while the timer fired; the outcome is already sent
            Err(_) => outcome.await.map_err(|_| StoreError::ChannelClosed),
        }
    }
}
