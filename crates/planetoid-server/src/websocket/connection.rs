//! Outbound handle for one connected game-data client.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::errors::DeliveryError;

/// A connected client as seen by the registry.
///
/// Holds the sending half of the client's bounded outbound queue; the
/// session's writer task owns the receiving half and the socket.
pub struct ClientConnection {
    id: String,
    identity: String,
    tx: mpsc::Sender<Arc<String>>,
    connected_at: Instant,
    last_activity: Mutex<Instant>,
    dropped_messages: AtomicU64,
}

impl ClientConnection {
    /// Create a connection for `identity` with a fresh connection ID.
    pub fn new(identity: impl Into<String>, tx: mpsc::Sender<Arc<String>>) -> Self {
        let now = Instant::now();
        Self {
            id: Uuid::now_v7().to_string(),
            identity: identity.into(),
            tx,
            connected_at: now,
            last_activity: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Unique per physical connection, unlike the identity.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The client-chosen name this connection registered under.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Enqueue a text message without waiting.
    ///
    /// A full or closed queue counts as a dropped message.
    pub fn send(&self, message: Arc<String>) -> Result<(), DeliveryError> {
        match self.tx.try_send(message) {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
                Err(match e {
                    TrySendError::Full(_) => DeliveryError::QueueFull,
                    TrySendError::Closed(_) => DeliveryError::Closed,
                })
            }
        }
    }

    /// Total messages dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Record inbound activity (any frame, including Pong).
    pub fn mark_alive(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    /// Time since the last inbound frame (or connection establishment).
    pub fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl std::fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConnection")
            .field("id", &self.id)
            .field("identity", &self.identity)
            .field("dropped_messages", &self.drop_count())
            .finish_non_exhaustive()
    }
}
