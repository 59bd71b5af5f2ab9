//! Error notifiers.

use crate::environment::Notifier;
use crate::error::CartError;
use tokio::sync::mpsc;

/// Logs each error's user message at `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, error: &CartError) {
        tracing::warn!(kind = error.kind().as_str(), detail = %error, "{}", error.user_message());
    }
}

/// Forwards errors into an unbounded channel, e.g. for a UI that renders
/// them as toasts.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<CartError>,
}

impl ChannelNotifier {
    /// Notifier plus the receiving end of its channel
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CartError>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, error: &CartError) {
        if self.sender.send(error.clone()).is_err() {
            tracing::debug!("Notification receiver dropped");
        }
    }
}
