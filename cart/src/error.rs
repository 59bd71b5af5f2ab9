//! Error types for cart operations and their collaborators.

use crate::types::{Operation, ProductId};
use thiserror::Error;

/// Failure of a stock or catalog lookup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Request could not be sent or no response arrived
    #[error("Request failed: {0}")]
    Transport(String),

    /// Service answered with a non-success status
    #[error("Service returned status {status}")]
    Status {
        /// HTTP status code
        status: u16,
    },

    /// Response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Service has no record for the product
    #[error("Product {0} not found")]
    NotFound(ProductId),
}

/// Failure of the persistent key-value store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Reading the stored value failed
    #[error("Failed to read '{key}': {message}")]
    Read {
        /// Storage key
        key: String,
        /// Underlying error
        message: String,
    },

    /// Writing the value failed
    #[error("Failed to write '{key}': {message}")]
    Write {
        /// Storage key
        key: String,
        /// Underlying error
        message: String,
    },

    /// Value could not be serialized
    #[error("Failed to serialize cart: {0}")]
    Serialize(String),
}

/// Which collaborator failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// Stock lookup failed
    #[error("stock lookup failed: {0}")]
    Stock(LookupError),

    /// Catalog lookup failed
    #[error("catalog lookup failed: {0}")]
    Catalog(LookupError),

    /// Persistence failed
    #[error("persistence failed: {0}")]
    Storage(StorageError),
}

/// Error kind, for callers that only care about the class of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Requested quantity exceeds stock
    OutOfStock,
    /// Product is not in the cart
    NotFound,
    /// A collaborator failed
    CollaboratorFailure,
    /// The store could not take or finish the command
    Unavailable,
}

impl ErrorKind {
    /// Metric label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OutOfStock => "out_of_stock",
            Self::NotFound => "not_found",
            Self::CollaboratorFailure => "collaborator_failure",
            Self::Unavailable => "unavailable",
        }
    }
}

/// Why a cart operation was rejected.
///
/// Whenever one of these is produced the cart is exactly as it was before
/// the operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// Requested quantity exceeds available stock
    #[error("Product {product_id}: requested {requested}, only {available} in stock")]
    OutOfStock {
        /// Product
        product_id: ProductId,
        /// Quantity that would have resulted
        requested: u64,
        /// Quantity in stock
        available: u32,
    },

    /// Product is not in the cart
    #[error("Cannot {operation}: product {product_id} is not in the cart")]
    NotFound {
        /// Operation that was attempted
        operation: Operation,
        /// Product
        product_id: ProductId,
    },

    /// A stock, catalog or storage call failed
    #[error("Cannot {operation} product {product_id}: {source}")]
    Collaborator {
        /// Operation that was attempted
        operation: Operation,
        /// Product
        product_id: ProductId,
        /// Failing collaborator
        #[source]
        source: CollaboratorError,
    },

    /// The store rejected the command or no outcome arrived
    #[error("Cannot {operation}: {reason}")]
    Unavailable {
        /// Operation that was attempted
        operation: Operation,
        /// Store-level reason
        reason: String,
    },
}

impl CartError {
    /// Class of failure
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::OutOfStock { .. } => ErrorKind::OutOfStock,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Collaborator { .. } => ErrorKind::CollaboratorFailure,
            Self::Unavailable { .. } => ErrorKind::Unavailable,
        }
    }

    /// Operation that failed, when known
    #[must_use]
    pub const fn operation(&self) -> Option<Operation> {
        match self {
            Self::OutOfStock { .. } => None,
            Self::NotFound { operation, .. }
            | Self::Collaborator { operation, .. }
            | Self::Unavailable { operation, .. } => Some(*operation),
        }
    }

    /// Message shown to the shopper
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self.operation() {
            None => "Requested quantity is out of stock",
            Some(Operation::Add) => "Failed to add product",
            Some(Operation::Remove) => "Failed to remove product",
            Some(Operation::UpdateAmount) => "Failed to update product quantity",
        }
    }
}
