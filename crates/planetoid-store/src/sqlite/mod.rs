//! `SQLite` backend: connection pooling and schema migrations.

pub mod connection;
pub mod migrations;

pub use connection::{new_file, new_in_memory, ConnectionConfig, ConnectionPool, PooledConnection};
pub use migrations::{current_version, latest_version, run_migrations};
