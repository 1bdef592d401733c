//! Connection limit enforcement for the game-data channel.
//!
//! An upgrade is admitted before its socket exists, so the registry alone
//! cannot see it. Each admitted identity holds an [`AdmissionTicket`] until
//! its session has registered; the limit counts registered identities plus
//! identities still holding a ticket.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::registry::ConnectionRegistry;

/// Admits new identities while fewer than `max_connections` are live or pending.
pub struct AdmissionControl {
    registry: Arc<ConnectionRegistry>,
    max_connections: usize,
    pending: Mutex<HashMap<String, usize>>,
}

impl AdmissionControl {
    /// Gate admissions to `registry` at `max_connections` identities.
    pub fn new(registry: Arc<ConnectionRegistry>, max_connections: usize) -> Self {
        Self {
            registry,
            max_connections,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Reserve a slot for `identity`.
    ///
    /// An identity that is already registered or pending is always admitted,
    /// since its session replaces the existing entry. Returns `None` when
    /// the limit is reached.
    pub fn try_admit(self: &Arc<Self>, identity: &str) -> Option<AdmissionTicket> {
        let mut pending = self.pending.lock();
        let known = pending.contains_key(identity) || self.registry.get(identity).is_some();
        if !known {
            let in_flight = pending
                .keys()
                .filter(|id| self.registry.get(id.as_str()).is_none())
                .count();
            if self.registry.len() + in_flight >= self.max_connections {
                return None;
            }
        }
        *pending.entry(identity.to_owned()).or_insert(0) += 1;
        Some(AdmissionTicket {
            control: Arc::clone(self),
            identity: identity.to_owned(),
        })
    }

    /// Identities admitted but not yet released.
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Configured limit.
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    fn release(&self, identity: &str) {
        let mut pending = self.pending.lock();
        if let Some(count) = pending.get_mut(identity) {
            *count -= 1;
            if *count == 0 {
                let _ = pending.remove(identity);
            }
        }
    }
}

/// A reserved slot; released on drop.
///
/// Dropped unused if the HTTP upgrade never completes.
pub struct AdmissionTicket {
    control: Arc<AdmissionControl>,
    identity: String,
}

impl AdmissionTicket {
    /// Identity the slot was reserved for.
    pub fn identity(&self) -> &str {
        &self.identity
    }
}

impl Drop for AdmissionTicket {
    fn drop(&mut self) {
        self.control.release(&self.identity);
    }
}

impl std::fmt::Debug for AdmissionTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionTicket")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
