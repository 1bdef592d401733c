//! Game-data channel: connection registry, broadcast hub, lifecycle
//! coordination and the per-socket session loop.

pub mod admission;
pub mod broadcast;
pub mod connection;
pub mod lifecycle;
pub mod registry;
pub mod session;
