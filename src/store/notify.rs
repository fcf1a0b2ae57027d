//! Store change notifications
//!
//! Payload-free "store changed" signals fanned out over a tokio broadcast
//! channel. Writers call [`ChangeNotifier::notify`]; consumers subscribe and
//! rebuild whatever they derive from the store.

use tokio::sync::broadcast;

/// Signal that the record store contents changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreChanged;

/// Broadcasts [`StoreChanged`] to all subscribers
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<StoreChanged>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(64)
    }
}

impl ChangeNotifier {
    /// Create a notifier with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to change signals
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChanged> {
        self.tx.subscribe()
    }

    /// Publish a change signal. Having no subscribers is not an error.
    pub fn notify(&self) {
        let receivers = self.tx.send(StoreChanged).unwrap_or(0);
        tracing::debug!(receivers, "Store change published");
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notify_reaches_subscriber() {
        let notifier = ChangeNotifier::default();
        let mut rx = notifier.subscribe();
        notifier.notify();
        assert_eq!(rx.recv().await.unwrap(), StoreChanged);
    }

    #[test]
    fn test_notify_without_subscribers() {
        let notifier = ChangeNotifier::new(4);
        notifier.notify();
        assert_eq!(notifier.subscriber_count(), 0);
    }
}
