//! # planetoid-server
//!
//! Axum HTTP + `WebSocket` server for planetoid.
//!
//! - Game-data channel at `/gamedata/{username}`: every inbound text frame is
//!   fanned out to all connected clients, sender included
//! - Connection registry keyed by the username taken from the path
//! - Join/error notices (`User {name} joined`, `User {name} left on error: …`)
//! - `/games` and `/players` endpoints backed by `planetoid-store`
//! - Health, Prometheus metrics, graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod routes;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use errors::{DeliveryError, ServerError, TransportError};
pub use server::{AppState, PlanetoidServer};
pub use websocket::admission::{AdmissionControl, AdmissionTicket};
pub use websocket::broadcast::{BroadcastHub, BroadcastReport};
pub use websocket::connection::ClientConnection;
pub use websocket::lifecycle::LifecycleCoordinator;
pub use websocket::registry::ConnectionRegistry;
