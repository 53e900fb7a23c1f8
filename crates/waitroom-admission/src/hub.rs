//! Notification hub: identity → live channel.
//!
//! The hub never owns a connection. It holds the sending half of an
//! unbounded channel whose receiving half lives in the connection's task;
//! when that task ends, the receiver is dropped and the next push notices.

use std::collections::HashMap;

use tokio::sync::{Mutex, mpsc};
use waitroom_protocol::{ServerMessage, SessionId};
use waitroom_transport::ConnectionId;

/// An event for one visitor's live channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    /// The visitor holds a slot.
    Admitted,
    /// The visitor is waiting at this 1-based position.
    QueuePosition { position: usize },
    /// The visitor's last request failed.
    Error { reason: String },
}

impl From<QueueEvent> for ServerMessage {
    fn from(event: QueueEvent) -> Self {
        match event {
            QueueEvent::Admitted => ServerMessage::admitted(),
            QueueEvent::QueuePosition { position } => ServerMessage::waiting(position),
            QueueEvent::Error { reason } => ServerMessage::Error { message: reason },
        }
    }
}

/// Sending half handed to the hub on bind.
pub type EventSender = mpsc::UnboundedSender<QueueEvent>;

/// Receiving half kept by the connection task.
pub type EventReceiver = mpsc::UnboundedReceiver<QueueEvent>;

#[derive(Debug)]
struct Binding {
    conn: ConnectionId,
    sender: EventSender,
}

/// Maps each identity to at most one live channel.
///
/// Bindings are independent of admission state: a visitor can be bound
/// while active, waiting, or unknown to the coordinator.
#[derive(Debug, Default)]
pub struct NotificationHub {
    bindings: Mutex<HashMap<SessionId, Binding>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `id` to a connection's event channel.
    ///
    /// A later bind for the same identity replaces the earlier one, which
    /// is how a reconnecting browser takes over its notifications.
    pub async fn bind(&self, id: SessionId, conn: ConnectionId, sender: EventSender) {
        let mut bindings = self.bindings.lock().await;
        if let Some(previous) = bindings.insert(id.clone(), Binding { conn, sender }) {
            if previous.conn != conn {
                tracing::debug!(session_id = %id, old = %previous.conn, new = %conn, "binding replaced");
            }
        }
    }

    /// Removes every binding that points at `conn` and returns the
    /// identities that were unbound.
    ///
    /// A binding already taken over by a newer connection is left alone.
    pub async fn unbind(&self, conn: ConnectionId) -> Vec<SessionId> {
        let mut bindings = self.bindings.lock().await;
        let mut removed = Vec::new();
        bindings.retain(|id, binding| {
            if binding.conn == conn {
                removed.push(id.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    /// Delivers `event` to the channel bound to `id`.
    ///
    /// Best effort: returns `false` if there is no binding or the channel
    /// has closed. A closed channel's binding is dropped.
    pub async fn push(&self, id: &SessionId, event: QueueEvent) -> bool {
        let mut bindings = self.bindings.lock().await;
        let Some(binding) = bindings.get(id) else {
            return false;
        };
        if binding.sender.send(event).is_ok() {
            return true;
        }
        tracing::debug!(session_id = %id, conn_id = %binding.conn, "dropping closed binding");
        bindings.remove(id);
        false
    }

    /// Pushes one event per identity. Returns how many were delivered.
    pub async fn push_all(&self, events: Vec<(SessionId, QueueEvent)>) -> usize {
        let mut delivered = 0;
        for (id, event) in events {
            if self.push(&id, event).await {
                delivered += 1;
            }
        }
        delivered
    }

    /// Whether `id` currently has a channel.
    pub async fn is_bound(&self, id: &SessionId) -> bool {
        self.bindings.lock().await.contains_key(id)
    }

    /// Number of bindings.
    pub async fn len(&self) -> usize {
        self.bindings.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(raw: &str) -> SessionId {
        SessionId::new(raw).unwrap()
    }

    #[tokio::test]
    async fn test_push_bound_identity_delivers() {
        let hub = NotificationHub::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        hub.bind(sid("a"), ConnectionId::new(1), tx).await;

        assert!(hub.push(&sid("a"), QueueEvent::Admitted).await);
        assert_eq!(rx.recv().await, Some(QueueEvent::Admitted));
    }

    #[tokio::test]
    async fn test_push_unbound_identity_is_silent_noop() {
        let hub = NotificationHub::new();
        assert!(!hub.push(&sid("ghost"), QueueEvent::Admitted).await);
    }

    #[tokio::test]
    async fn test_push_closed_channel_drops_binding() {
        let hub = NotificationHub::new();
        let (tx, rx) = mpsc::unbounded_channel();
        hub.bind(sid("a"), ConnectionId::new(1), tx).await;
        drop(rx);

        assert!(!hub.push(&sid("a"), QueueEvent::Admitted).await);
        assert!(!hub.is_bound(&sid("a")).await);
    }

    #[tokio::test]
    async fn test_bind_twice_replaces_earlier_channel() {
        let hub = NotificationHub::new();
        let (old_tx, mut old_rx) = mpsc::unbounded_channel();
        let (new_tx, mut new_rx) = mpsc::unbounded_channel();
        hub.bind(sid("a"), ConnectionId::new(1), old_tx).await;
        hub.bind(sid("a"), ConnectionId::new(2), new_tx).await;

        hub.push(&sid("a"), QueueEvent::QueuePosition { position: 2 }).await;

        assert_eq!(
            new_rx.recv().await,
            Some(QueueEvent::QueuePosition { position: 2 })
        );
        assert!(old_rx.try_recv().is_err());
        assert_eq!(hub.len().await, 1);
    }

    #[tokio::test]
    async fn test_unbind_removes_all_bindings_for_connection() {
        let hub = NotificationHub::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let (other_tx, _other_rx) = mpsc::unbounded_channel();
        hub.bind(sid("a"), ConnectionId::new(1), tx.clone()).await;
        hub.bind(sid("b"), ConnectionId::new(1), tx).await;
        hub.bind(sid("c"), ConnectionId::new(2), other_tx).await;

        let mut removed = hub.unbind(ConnectionId::new(1)).await;
        removed.sort();

        assert_eq!(removed, vec![sid("a"), sid("b")]);
        assert!(hub.is_bound(&sid("c")).await);
    }

    #[tokio::test]
    async fn test_unbind_old_connection_keeps_reconnected_binding() {
        let hub = NotificationHub::new();
        let (old_tx, _old_rx) = mpsc::unbounded_channel();
        let (new_tx, _new_rx) = mpsc::unbounded_channel();
        hub.bind(sid("a"), ConnectionId::new(1), old_tx).await;
        hub.bind(sid("a"), ConnectionId::new(2), new_tx).await;

        assert!(hub.unbind(ConnectionId::new(1)).await.is_empty());
        assert!(hub.is_bound(&sid("a")).await);
    }

    #[tokio::test]
    async fn test_push_all_counts_deliveries() {
        let hub = NotificationHub::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        hub.bind(sid("a"), ConnectionId::new(1), tx).await;

        let delivered = hub
            .push_all(vec![
                (sid("a"), QueueEvent::QueuePosition { position: 1 }),
                (sid("b"), QueueEvent::QueuePosition { position: 2 }),
            ])
            .await;

        assert_eq!(delivered, 1);
    }

    #[test]
    fn test_queue_event_into_server_message() {
        assert_eq!(
            ServerMessage::from(QueueEvent::Admitted),
            ServerMessage::QueuePosition { position: 0, allowed: true }
        );
        assert_eq!(
            ServerMessage::from(QueueEvent::QueuePosition { position: 3 }),
            ServerMessage::QueuePosition { position: 3, allowed: false }
        );
        assert_eq!(
            ServerMessage::from(QueueEvent::Error { reason: "Invalid userId".into() }),
            ServerMessage::Error { message: "Invalid userId".into() }
        );
    }
}
