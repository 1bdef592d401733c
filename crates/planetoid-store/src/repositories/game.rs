//! Game repository: `games` plus the `game_players` association.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::{Result, StoreError};
use crate::models::{Game, Player};
use crate::repositories::PlayerRepo;

/// Game repository.
pub struct GameRepo;

impl GameRepo {
    /// Insert a game with no players.
    pub fn create(conn: &Connection, gamedate: DateTime<Utc>) -> Result<Game> {
        let gamedate = gamedate.to_rfc3339_opts(SecondsFormat::Millis, true);
        let _ = conn.execute("INSERT INTO games (gamedate) VALUES (?1)", params![gamedate])?;
        Ok(Game {
            id: conn.last_insert_rowid(),
            gamedate,
            players: Vec::new(),
        })
    }

    /// Insert a game and associate the named players in one transaction.
    ///
    /// Fails with [`StoreError::PlayerNotFound`] (and writes nothing) if any
    /// name is unknown.
    pub fn create_with_players(
        conn: &Connection,
        gamedate: DateTime<Utc>,
        player_names: &[String],
    ) -> Result<Game> {
        let tx = conn.unchecked_transaction()?;
        let game = Self::create(&tx, gamedate)?;
        for name in player_names {
            let player = PlayerRepo::get_by_name(&tx, name)?
                .ok_or_else(|| StoreError::PlayerNotFound(name.clone()))?;
            let _ = Self::add_player(&tx, game.id, player.id)?;
        }
        let players = Self::players(&tx, game.id)?;
        tx.commit()?;
        Ok(Game { players, ..game })
    }

    /// Fetch a game with its players.
    pub fn get(conn: &Connection, id: i64) -> Result<Option<Game>> {
        let row = conn
            .query_row(
                "SELECT id, gamedate FROM games WHERE id = ?1",
                params![id],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        match row {
            Some((id, gamedate)) => Ok(Some(Game {
                id,
                gamedate,
                players: Self::players(conn, id)?,
            })),
            None => Ok(None),
        }
    }

    /// All games with their players, oldest first.
    pub fn list(conn: &Connection) -> Result<Vec<Game>> {
        let mut stmt = conn.prepare("SELECT id, gamedate FROM games ORDER BY id")?;
        let heads = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        heads
            .into_iter()
            .map(|(id, gamedate)| {
                Ok(Game {
                    id,
                    gamedate,
                    players: Self::players(conn, id)?,
                })
            })
            .collect()
    }

    /// Distinct game dates, sorted.
    pub fn dates(conn: &Connection) -> Result<Vec<String>> {
        let mut stmt = conn.prepare("SELECT DISTINCT gamedate FROM games ORDER BY gamedate")?;
        let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(rows)
    }

    /// Associate a player with a game. Returns `false` if already associated.
    pub fn add_player(conn: &Connection, game_id: i64, player_id: i64) -> Result<bool> {
        if !Self::exists(conn, game_id)? {
            return Err(StoreError::GameNotFound(game_id));
        }
        let changed = conn.execute(
            "INSERT OR IGNORE INTO game_players (game_id, player_id) VALUES (?1, ?2)",
            params![game_id, player_id],
        )?;
        Ok(changed > 0)
    }

    /// Associate a player, by name, with a game and return the updated game.
    pub fn add_player_by_name(conn: &Connection, game_id: i64, name: &str) -> Result<Game> {
        let player = PlayerRepo::get_by_name(conn, name)?
            .ok_or_else(|| StoreError::PlayerNotFound(name.to_string()))?;
        let _ = Self::add_player(conn, game_id, player.id)?;
        Self::get(conn, game_id)?.ok_or(StoreError::GameNotFound(game_id))
    }

    /// Players associated with a game, in join order.
    pub fn players(conn: &Connection, game_id: i64) -> Result<Vec<Player>> {
        let mut stmt = conn.prepare(
            "SELECT p.id, p.name
             FROM game_players gp JOIN players p ON p.id = gp.player_id
             WHERE gp.game_id = ?1
             ORDER BY gp.rowid",
        )?;
        let rows = stmt
            .query_map(params![game_id], PlayerRepo::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn exists(conn: &Connection, game_id: i64) -> Result<bool> {
        let found: Option<i64> = conn
            .query_row(
                "SELECT id FROM games WHERE id = ?1",
                params![game_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}
