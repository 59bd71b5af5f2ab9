//! In-memory test doubles for the cart's collaborators
//!
//! Provides fast, deterministic stand-ins with failure injection:
//! - [`MockStockOracle`]: fixed stock table, per-product failures, latency
//! - [`MockProductCatalog`]: fixed catalog entries, per-product failures
//! - [`InMemoryKeyValueStore`]: `HashMap` storage with write-failure switch
//! - [`RecordingNotifier`]: captures every delivered error

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Locks only panic if a test thread already panicked

mod inventory;
mod storage;

pub use inventory::{MockProductCatalog, MockStockOracle};
pub use storage::InMemoryKeyValueStore;

use crate::environment::Notifier;
use crate::error::CartError;
use std::sync::{Arc, Mutex};

/// Notifier that records every error it receives.
#[derive(Clone, Debug, Default)]
pub struct RecordingNotifier {
    errors: Arc<Mutex<Vec<CartError>>>,
}

impl RecordingNotifier {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors delivered so far, oldest first
    #[must_use]
    pub fn errors(&self) -> Vec<CartError> {
        self.errors.lock().unwrap().clone()
    }

    /// User-facing messages delivered so far
    #[must_use]
    pub fn messages(&self) -> Vec<&'static str> {
        self.errors
            .lock()
            .unwrap()
            .iter()
            .map(CartError::user_message)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, error: &CartError) {
        self.errors.lock().unwrap().push(error.clone());
    }
}
