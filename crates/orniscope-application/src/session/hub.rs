//! Listener registry and best-effort fan-out for one session.

use orniscope_core::DiffEvent;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

/// Identity of a subscribed listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sending half of a listener's delivery queue.
///
/// Diffs are shared as `Arc<DiffEvent>` so a broadcast never copies the
/// payload per listener.
#[derive(Debug, Clone)]
pub struct Listener {
    id: ListenerId,
    sender: mpsc::Sender<Arc<DiffEvent>>,
}

impl Listener {
    /// Creates a listener together with the queue it delivers into.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Arc<DiffEvent>>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self::from_sender(sender), receiver)
    }

    pub fn from_sender(sender: mpsc::Sender<Arc<DiffEvent>>) -> Self {
        Self {
            id: ListenerId::new(),
            sender,
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }
}

/// Why a diff could not be handed to a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryFailure {
    /// The listener is not draining its queue fast enough
    #[error("listener queue is full")]
    QueueFull,
    /// The receiving half was dropped; the listener is removed
    #[error("listener disconnected")]
    Disconnected,
}

/// Outcome of one broadcast.
#[derive(Debug, Default)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failures: Vec<(ListenerId, DeliveryFailure)>,
}

impl BroadcastReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Set of listeners of a session.
///
/// Owned by the session worker, so subscription changes and broadcasts are
/// serialized with every other session command.
#[derive(Debug, Default)]
pub struct SubscriptionHub {
    listeners: HashMap<ListenerId, mpsc::Sender<Arc<DiffEvent>>>,
}

impl SubscriptionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `listener`; returns `false` if it was already subscribed.
    pub fn subscribe(&mut self, listener: Listener) -> bool {
        if self.listeners.contains_key(&listener.id) {
            return false;
        }
        self.listeners.insert(listener.id, listener.sender);
        true
    }

    /// Removes a listener; returns `false` if it was not subscribed.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.listeners.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Hands `event` to every listener without waiting on any of them.
    ///
    /// A full or closed queue only affects its own listener. Disconnected
    /// listeners are dropped from the hub.
    pub fn broadcast(&mut self, event: Arc<DiffEvent>) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for (id, sender) in &self.listeners {
            match sender.try_send(Arc::clone(&event)) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(listener = %id, "[SubscriptionHub] listener queue full, diff dropped");
                    report.failures.push((*id, DeliveryFailure::QueueFull));
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::info!(listener = %id, "[SubscriptionHub] listener disconnected");
                    report.failures.push((*id, DeliveryFailure::Disconnected));
                }
            }
        }

        for (id, failure) in &report.failures {
            if *failure == DeliveryFailure::Disconnected {
                self.listeners.remove(id);
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> Arc<DiffEvent> {
        Arc::new(DiffEvent::snapshot(Vec::new()))
    }

    #[test]
    fn test_subscribe_is_idempotent() {
        let mut hub = SubscriptionHub::new();
        let (listener, _rx) = Listener::channel(4);

        assert!(hub.subscribe(listener.clone()));
        assert!(!hub.subscribe(listener.clone()));
        assert_eq!(hub.len(), 1);

        assert!(hub.unsubscribe(listener.id()));
        assert!(!hub.unsubscribe(listener.id()));
        assert!(hub.is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_listener() {
        let mut hub = SubscriptionHub::new();
        let (a, mut rx_a) = Listener::channel(4);
        let (b, mut rx_b) = Listener::channel(4);
        hub.subscribe(a);
        hub.subscribe(b);

        let report = hub.broadcast(event());

        assert_eq!(report.delivered, 2);
        assert!(report.is_clean());
        assert!(rx_a.recv().await.is_some());
        assert!(rx_b.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_failing_listener_does_not_block_others() {
        let mut hub = SubscriptionHub::new();
        let (full, _rx_full) = Listener::channel(1);
        let (gone, rx_gone) = Listener::channel(4);
        let (healthy, mut rx_healthy) = Listener::channel(4);
        let full_id = full.id();
        let gone_id = gone.id();
        hub.subscribe(full);
        hub.subscribe(gone);
        hub.subscribe(healthy);
        drop(rx_gone);

        hub.broadcast(event());
        let report = hub.broadcast(event());

        assert_eq!(report.delivered, 1);
        assert!(report.failures.contains(&(full_id, DeliveryFailure::QueueFull)));
        assert!(!hub.contains(gone_id));
        assert!(hub.contains(full_id));
        assert!(rx_healthy.recv().await.is_some());
        assert!(rx_healthy.recv().await.is_some());
    }
}
