//! Player repository: CRUD for the `players` table.

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use crate::errors::{Result, StoreError};
use crate::models::Player;

/// Player repository.
pub struct PlayerRepo;

impl PlayerRepo {
    /// Insert a player. Names are trimmed, must be non-blank and unique.
    pub fn create(conn: &Connection, name: &str) -> Result<Player> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidName);
        }
        let now = chrono::Utc::now().to_rfc3339();
        match conn.execute(
            "INSERT INTO players (name, created_at) VALUES (?1, ?2)",
            params![name, now],
        ) {
            Ok(_) => Ok(Player {
                id: conn.last_insert_rowid(),
                name: name.to_string(),
            }),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(StoreError::AlreadyExists(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// All players in insertion order.
    pub fn list(conn: &Connection) -> Result<Vec<Player>> {
        let mut stmt = conn.prepare("SELECT id, name FROM players ORDER BY id")?;
        let rows = stmt
            .query_map([], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Distinct player names, sorted.
    pub fn names(conn: &Connection) -> Result<Vec<String>> {
        let mut stmt = conn.prepare("SELECT DISTINCT name FROM players ORDER BY name")?;
        let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(rows)
    }

    /// Look a player up by exact name.
    pub fn get_by_name(conn: &Connection, name: &str) -> Result<Option<Player>> {
        let row = conn
            .query_row(
                "SELECT id, name FROM players WHERE name = ?1",
                params![name],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    pub(crate) fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Player> {
        Ok(Player {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    }
}
