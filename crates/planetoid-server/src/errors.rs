//! Server error types.

use std::time::Duration;

use thiserror::Error;

/// Failure to hand a message to one recipient's outbound queue.
///
/// Never escapes a broadcast; it is logged and counted per recipient.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    /// The recipient's queue is full (slow reader).
    #[error("outbound queue full")]
    QueueFull,
    /// The recipient's writer task has gone away.
    #[error("connection closed")]
    Closed,
}

/// Transport-level failure that ends a `WebSocket` session.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Reading from or writing to the socket failed.
    #[error("socket error: {0}")]
    Socket(#[from] axum::Error),
    /// No frame from the client within the heartbeat timeout.
    #[error("heartbeat timeout after {0:?}")]
    HeartbeatTimeout(Duration),
    /// The outbound writer task panicked or was cancelled.
    #[error("writer task failed: {0}")]
    Writer(String),
}

/// Errors starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding the listener failed.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Other I/O error.
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}
