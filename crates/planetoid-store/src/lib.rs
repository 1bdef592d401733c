//! # planetoid-store
//!
//! `SQLite` persistence for games and players.
//!
//! - **[`sqlite`]**: `r2d2` connection pool and versioned schema migrations.
//! - **[`repositories`]**: stateless repositories. Every method takes a
//!   `&Connection`, so callers decide transaction boundaries.
//! - **[`models`]**: serializable records returned to the HTTP layer.

#![deny(unsafe_code)]

pub mod errors;
pub mod models;
pub mod repositories;
pub mod sqlite;

pub use errors::{Result, StoreError};
pub use models::{Game, Player};
pub use repositories::{GameRepo, PlayerRepo};
pub use sqlite::{
    new_file, new_in_memory, run_migrations, ConnectionConfig, ConnectionPool, PooledConnection,
};
