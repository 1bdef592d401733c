//! Records returned by the repositories.

use serde::{Deserialize, Serialize};

/// A registered player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Row ID.
    pub id: i64,
    /// Unique display name.
    pub name: String,
}

/// A played game and the players who took part.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    /// Row ID.
    pub id: i64,
    /// When the game was created (RFC 3339, UTC).
    pub gamedate: String,
    /// Participating players.
    pub players: Vec<Player>,
}
