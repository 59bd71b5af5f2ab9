//! Cart operation metrics.
//!
//! Recorded through the runtime's re-exported `metrics` macros, so they land
//! in whichever recorder [`MetricsServer`](rocket_cart_runtime::metrics::MetricsServer)
//! installed.

use rocket_cart_runtime::metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Cart operation metrics recorder.
pub struct CartMetrics;

impl CartMetrics {
    /// Register descriptions for the cart metrics.
    pub fn describe() {
        describe_counter!(
            "cart.commands.total",
            "Cart commands received, labelled by operation"
        );
        describe_counter!(
            "cart.commits.total",
            "Cart contents successfully persisted and applied"
        );
        describe_counter!(
            "cart.rejections.total",
            "Cart commands rejected, labelled by error kind"
        );
        describe_histogram!(
            "cart.command.duration_seconds",
            "Time from command submission to its outcome"
        );
    }

    /// Record a command entering the store.
    pub fn record_command(operation: &'static str) {
        counter!("cart.commands.total", "operation" => operation).increment(1);
    }

    /// Record a successful commit.
    pub fn record_commit() {
        counter!("cart.commits.total").increment(1);
    }

    /// Record a rejected command.
    pub fn record_rejection(kind: &'static str) {
        counter!("cart.rejections.total", "kind" => kind).increment(1);
    }

    /// Record how long a command took from submission to outcome.
    pub fn record_duration(duration: Duration) {
        histogram!("cart.command.duration_seconds").record(duration.as_secs_f64());
    }
}
