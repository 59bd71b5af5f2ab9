//! Cart domain types: identifiers, line items, state and actions.

use crate::error::CartError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Product identifier shared by the catalog, the stock service and the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(u64);

impl ProductId {
    /// Wrap a raw identifier
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw identifier
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<u64> for ProductId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Correlation id tying a command to its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

impl RequestId {
    /// Wrap a raw request number
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Available quantity for a product, as reported by the stock service.
///
/// Never stored; fetched fresh for every validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    /// Product the record describes
    pub id: ProductId,
    /// Units available
    pub amount: u32,
}

/// A product as described by the catalog.
///
/// Everything except the id is kept verbatim and never interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    /// Product id
    pub id: ProductId,
    /// Display attributes (title, price, image, ...)
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// A cart line item.
///
/// Serialized flat, e.g. `{"id":1,"title":"Sneaker","price":179.9,"amount":2}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Product id
    pub id: ProductId,
    /// Display attributes carried over from the catalog
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
    /// Quantity in the cart, always at least 1
    pub amount: u32,
}

impl Product {
    /// Build a line item with amount 1 from a catalog entry.
    ///
    /// Any `amount` the catalog sends is dropped; the cart owns that field.
    #[must_use]
    pub fn from_catalog(product: CatalogProduct) -> Self {
        let CatalogProduct { id, mut attributes } = product;
        attributes.remove("amount");
        Self {
            id,
            attributes,
            amount: 1,
        }
    }

    /// Display title, if the catalog provided one
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.attributes.get("title").and_then(Value::as_str)
    }
}

/// Cart state: line items in first-add order, unique by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartState {
    /// Line items
    pub items: Vec<Product>,
}

impl CartState {
    /// State holding `items`
    #[must_use]
    pub const fn new(items: Vec<Product>) -> Self {
        Self { items }
    }

    /// Line item for `id`
    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&Product> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Quantity of `id` currently in the cart (0 when absent)
    #[must_use]
    pub fn amount_of(&self, id: ProductId) -> u32 {
        self.get(id).map_or(0, |item| item.amount)
    }

    /// Total units across all line items
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.amount)).sum()
    }

    /// Number of distinct products
    #[must_use]
    pub fn unique_item_count(&self) -> usize {
        self.items.len()
    }

    /// Whether the cart has no line items
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The three cart operations, used to label errors and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `add_product`
    Add,
    /// `remove_product`
    Remove,
    /// `update_product_amount`
    UpdateAmount,
}

impl Operation {
    /// Metric label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::UpdateAmount => "update_amount",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cart actions.
///
/// Commands come from [`CartStore`](crate::CartStore) and feedback from
/// lookup effects. Every settled command is announced by exactly one
/// terminal action carrying its request id; a command abandoned by its
/// caller is dropped without one.
#[derive(Debug, Clone, PartialEq)]
pub enum CartAction {
    // Commands
    /// Add one unit of a product
    AddProduct {
        /// Correlation id
        request_id: RequestId,
        /// Product to add
        product_id: ProductId,
    },
    /// Drop a product from the cart
    RemoveProduct {
        /// Correlation id
        request_id: RequestId,
        /// Product to remove
        product_id: ProductId,
    },
    /// Set the quantity of a product already in the cart
    UpdateProductAmount {
        /// Correlation id
        request_id: RequestId,
        /// Product to update
        product_id: ProductId,
        /// Requested quantity
        amount: i64,
    },

    // Feedback
    /// Stock (and, for new items, the catalog entry) fetched for an add
    AddChecked {
        /// Correlation id
        request_id: RequestId,
        /// Product being added
        product_id: ProductId,
        /// Stock at validation time
        stock: StockRecord,
        /// Catalog entry, present when the item was absent at validation time
        product: Option<CatalogProduct>,
    },
    /// Stock fetched for an update
    UpdateChecked {
        /// Correlation id
        request_id: RequestId,
        /// Product being updated
        product_id: ProductId,
        /// Requested quantity
        amount: u64,
        /// Stock at validation time
        stock: StockRecord,
    },
    /// A stock or catalog lookup failed
    LookupFailed {
        /// Correlation id
        request_id: RequestId,
        /// Failure to report
        error: CartError,
    },

    // Outcomes
    /// New cart persisted and applied
    CartCommitted {
        /// Correlation id
        request_id: RequestId,
        /// Cart after the commit
        items: Vec<Product>,
    },
    /// The command was rejected; the cart is unchanged
    CommandFailed {
        /// Correlation id
        request_id: RequestId,
        /// Why
        error: CartError,
    },
    /// The command was a no-op
    CommandIgnored {
        /// Correlation id
        request_id: RequestId,
    },
}

impl CartAction {
    /// Correlation id carried by every action
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        match self {
            Self::AddProduct { request_id, .. }
            | Self::RemoveProduct { request_id, .. }
            | Self::UpdateProductAmount { request_id, .. }
            | Self::AddChecked { request_id, .. }
            | Self::UpdateChecked { request_id, .. }
            | Self::LookupFailed { request_id, .. }
            | Self::CartCommitted { request_id, .. }
            | Self::CommandFailed { request_id, .. }
            | Self::CommandIgnored { request_id } => *request_id,
        }
    }

    /// Whether this is the final action for `request_id`
    #[must_use]
    pub fn is_terminal_for(&self, request_id: RequestId) -> bool {
        matches!(
            self,
            Self::CartCommitted { .. } | Self::CommandFailed { .. } | Self::CommandIgnored { .. }
        ) && self.request_id() == request_id
    }
}
