//! Text fan-out to every registered client.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, warn};

use super::registry::ConnectionRegistry;
use crate::metrics::WS_BROADCAST_DROPS_TOTAL;

/// Outcome of one broadcast call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections in the snapshot the broadcast iterated.
    pub recipients: usize,
    /// Messages accepted by a recipient's outbound queue.
    pub delivered: usize,
    /// Recipients whose queue was full or closed.
    pub failed: usize,
}

/// Delivers a text payload to every connection in the registry.
///
/// Each delivery is a non-blocking enqueue onto the recipient's own queue;
/// the socket write happens on that recipient's writer task, so a stalled
/// peer never delays the others. Per-recipient failures are logged and
/// counted, never returned.
pub struct BroadcastHub {
    registry: Arc<ConnectionRegistry>,
}

impl BroadcastHub {
    /// Create a hub over `registry`.
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Send `text` to all currently registered connections, sender included.
    pub fn broadcast(&self, text: impl Into<String>) -> BroadcastReport {
        let payload = Arc::new(text.into());
        let connections = self.registry.snapshot();
        let mut report = BroadcastReport {
            recipients: connections.len(),
            ..BroadcastReport::default()
        };
        debug!(recipients = report.recipients, "broadcast to all");

        for conn in &connections {
            match conn.send(Arc::clone(&payload)) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    counter!(WS_BROADCAST_DROPS_TOTAL).increment(1);
                    warn!(
                        conn_id = conn.id(),
                        identity = conn.identity(),
                        error = %e,
                        "failed to deliver broadcast"
                    );
                }
            }
        }
        report
    }

    /// The registry this hub reads from.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }
}
