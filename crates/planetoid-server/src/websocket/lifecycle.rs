//! Connect / disconnect / error / message handling for the game-data channel.

use std::fmt::Display;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::broadcast::{BroadcastHub, BroadcastReport};
use super::connection::ClientConnection;
use super::registry::ConnectionRegistry;

/// Notice broadcast when `identity` connects.
pub fn joined_notice(identity: &str) -> String {
    format!("User {identity} joined")
}

/// Notice broadcast when `identity` is dropped because of a transport error.
pub fn left_on_error_notice(identity: &str, cause: &dyn Display) -> String {
    format!("User {identity} left on error: {cause}")
}

/// Applies lifecycle events to the registry and emits the resulting broadcasts.
///
/// Per identity: `ABSENT -> CONNECTED` on connect, back to `ABSENT` on
/// disconnect or error. Reconnecting under a live identity overwrites the
/// entry and announces a fresh join with no "left" for the previous one.
pub struct LifecycleCoordinator {
    registry: Arc<ConnectionRegistry>,
    hub: BroadcastHub,
}

impl LifecycleCoordinator {
    /// Create a coordinator with an empty registry.
    pub fn new() -> Self {
        Self::with_registry(Arc::new(ConnectionRegistry::new()))
    }

    /// Create a coordinator over an existing registry.
    pub fn with_registry(registry: Arc<ConnectionRegistry>) -> Self {
        let hub = BroadcastHub::new(Arc::clone(&registry));
        Self { registry, hub }
    }

    /// Register `connection` and announce the join to everyone, itself included.
    pub fn connect(&self, connection: Arc<ClientConnection>) -> BroadcastReport {
        let identity = connection.identity();
        if let Some(previous) = self.registry.register(Arc::clone(&connection)) {
            // The previous socket stays open; only its registry entry is replaced.
            info!(
                identity,
                previous_conn_id = previous.id(),
                conn_id = connection.id(),
                "identity re-registered by a new connection"
            );
        } else {
            info!(identity, conn_id = connection.id(), "client joined");
        }
        self.hub.broadcast(joined_notice(identity))
    }

    /// Clean disconnect: unregister without any broadcast.
    pub fn disconnect(&self, identity: &str) {
        if self.registry.unregister(identity).is_some() {
            info!(identity, "client disconnected");
        } else {
            debug!(identity, "disconnect for unregistered identity");
        }
    }

    /// Transport error: unregister and tell the remaining clients why.
    ///
    /// The notice goes out even if `identity` was not registered.
    pub fn error(&self, identity: &str, cause: &dyn Display) -> BroadcastReport {
        let _ = self.registry.unregister(identity);
        warn!(identity, cause = %cause, "client left on error");
        self.hub.broadcast(left_on_error_notice(identity, cause))
    }

    /// Inbound text: fan it out verbatim, echo to the sender included.
    pub fn message(&self, identity: &str, text: &str) -> BroadcastReport {
        debug!(identity, len = text.len(), "message received");
        self.hub.broadcast(text)
    }

    /// Clean close of a specific physical connection.
    ///
    /// No-op if `connection` was superseded by a newer one for the same
    /// identity, so the replacement stays registered.
    pub fn connection_closed(&self, connection: &ClientConnection) -> bool {
        if self.registry.unregister_connection(connection) {
            info!(
                identity = connection.identity(),
                conn_id = connection.id(),
                "client disconnected"
            );
            true
        } else {
            debug!(
                identity = connection.identity(),
                conn_id = connection.id(),
                "superseded connection closed"
            );
            false
        }
    }

    /// Transport failure of a specific physical connection.
    ///
    /// Returns `None` (and broadcasts nothing) if `connection` was already
    /// superseded or removed.
    pub fn connection_failed(
        &self,
        connection: &ClientConnection,
        cause: &dyn Display,
    ) -> Option<BroadcastReport> {
        let identity = connection.identity();
        if !self.registry.unregister_connection(connection) {
            debug!(
                identity,
                conn_id = connection.id(),
                cause = %cause,
                "superseded connection failed"
            );
            return None;
        }
        warn!(identity, conn_id = connection.id(), cause = %cause, "client left on error");
        Some(self.hub.broadcast(left_on_error_notice(identity, cause)))
    }

    /// Broadcast arbitrary text to everyone.
    pub fn broadcast(&self, text: &str) -> BroadcastReport {
        self.hub.broadcast(text)
    }

    /// Live connection registry.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Broadcast hub.
    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }
}

impl Default for LifecycleCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
