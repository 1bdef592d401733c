//! Error types for the game/player store.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Which migration failed and why.
        message: String,
    },

    /// Player names must contain a non-whitespace character.
    #[error("player name must not be blank")]
    InvalidName,

    /// A player with this name already exists.
    #[error("player already exists: {0}")]
    AlreadyExists(String),

    /// Requested game was not found.
    #[error("game not found: {0}")]
    GameNotFound(i64),

    /// Requested player was not found.
    #[error("player not found: {0}")]
    PlayerNotFound(String),
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_error_display() {
        let err = StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows);
        assert!(err.to_string().contains("sqlite error"));
    }

    #[test]
    fn not_found_display() {
        assert_eq!(StoreError::GameNotFound(7).to_string(), "game not found: 7");
        assert_eq!(
            StoreError::PlayerNotFound("titi".into()).to_string(),
            "player not found: titi"
        );
    }

    #[test]
    fn from_rusqlite() {
        let err: StoreError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, StoreError::Sqlite(_)));
    }
}
