//! Identity → connection registry.

use std::sync::Arc;

use dashmap::DashMap;

use super::connection::ClientConnection;

/// Concurrent map from client identity to its live connection.
///
/// A second registration under the same identity replaces the first
/// (last writer wins). The displaced connection is returned, not closed.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<String, Arc<ClientConnection>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for `connection.identity()`.
    pub fn register(&self, connection: Arc<ClientConnection>) -> Option<Arc<ClientConnection>> {
        self.connections
            .insert(connection.identity().to_string(), connection)
    }

    /// Remove the entry for `identity`. No-op if absent.
    pub fn unregister(&self, identity: &str) -> Option<Arc<ClientConnection>> {
        self.connections.remove(identity).map(|(_, conn)| conn)
    }

    /// Remove the entry for this connection's identity only if it still
    /// points at this physical connection.
    ///
    /// Returns `false` when the identity was re-registered by a newer
    /// connection (or is already gone).
    pub fn unregister_connection(&self, connection: &ClientConnection) -> bool {
        self.connections
            .remove_if(connection.identity(), |_, current| {
                current.id() == connection.id()
            })
            .is_some()
    }

    /// Point-in-time copy of all live connections.
    ///
    /// Entries added or removed concurrently may or may not appear.
    pub fn snapshot(&self) -> Vec<Arc<ClientConnection>> {
        self.connections
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Connection currently registered under `identity`.
    pub fn get(&self, identity: &str) -> Option<Arc<ClientConnection>> {
        self.connections
            .get(identity)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Whether `identity` is registered to the connection with `connection_id`.
    pub fn is_current(&self, identity: &str, connection_id: &str) -> bool {
        self.connections
            .get(identity)
            .is_some_and(|entry| entry.value().id() == connection_id)
    }

    /// Registered identities, sorted.
    pub fn identities(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .connections
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Number of registered identities.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether nobody is registered.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
