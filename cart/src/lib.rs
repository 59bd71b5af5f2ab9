//! # Rocket Cart
//!
//! Client-side shopping cart built on the Rocket Cart reducer runtime.
//!
//! The cart holds line items (product plus quantity), validates every add
//! and quantity change against a live stock service, fetches display data
//! from a product catalog, writes every change through to persistent
//! storage and publishes each committed cart to subscribers. Failed
//! operations leave the cart untouched and are reported once to a
//! [`Notifier`].
//!
//! ## Example
//!
//! ```no_run
//! use rocket_cart::{
//!     CartEnvironment, CartStorage, CartStore, FileKeyValueStore, HttpInventoryClient,
//!     ProductId, TracingNotifier, config::CartConfig,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CartConfig::from_env()?;
//! let inventory = Arc::new(HttpInventoryClient::new(&config.api_url, config.http_timeout())?);
//! let env = CartEnvironment::new(
//!     inventory.clone(),
//!     inventory,
//!     CartStorage::new(
//!         Arc::new(FileKeyValueStore::new(&config.storage_dir)),
//!         config.storage_key.clone(),
//!     ),
//!     Arc::new(TracingNotifier),
//! );
//!
//! let cart = CartStore::new(env, &config);
//! cart.add_product(ProductId::new(1)).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod environment;
pub mod error;
pub mod http;
pub mod metrics;
pub mod mocks;
pub mod notify;
pub mod persistence;
pub mod reducer;
pub mod store;
pub mod types;

pub use environment::{
    CartEnvironment, CartFeed, CartStorage, Claim, KeyValueStore, Notifier, Outcome,
    PendingRequests, ProductCatalog, StockOracle,
};
pub use error::{CartError, CollaboratorError, ErrorKind, LookupError, StorageError};
pub use http::HttpInventoryClient;
pub use metrics::CartMetrics;
pub use notify::{ChannelNotifier, TracingNotifier};
pub use persistence::FileKeyValueStore;
pub use reducer::CartReducer;
pub use store::CartStore;
pub use types::{
    CartAction, CartState, CatalogProduct, Operation, Product, ProductId, RequestId, StockRecord,
};
