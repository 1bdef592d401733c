//! `/games` handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use planetoid_store::{Game, GameRepo, StoreError};
use serde::Deserialize;
use tracing::info;

use super::{ApiError, with_conn};
use crate::server::AppState;

/// `POST /games` body.
#[derive(Debug, Default, Deserialize)]
pub struct NewGame {
    /// Names of existing players to attach to the game.
    #[serde(default)]
    pub players: Vec<String>,
}

/// `POST /games/{id}/players` body.
#[derive(Debug, Deserialize)]
pub struct JoinGame {
    /// Existing player name.
    pub name: String,
}

/// GET /games: distinct game dates.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let dates = with_conn(&state.pool, |conn| GameRepo::dates(conn)).await?;
    Ok(Json(dates))
}

/// GET /games/{id}
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Game>, ApiError> {
    let game = with_conn(&state.pool, move |conn| {
        GameRepo::get(conn, id)?.ok_or(StoreError::GameNotFound(id))
    })
    .await?;
    Ok(Json(game))
}

/// POST /games: new game dated now.
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<NewGame>,
) -> Result<(StatusCode, Json<Game>), ApiError> {
    let game = with_conn(&state.pool, move |conn| {
        GameRepo::create_with_players(conn, Utc::now(), &body.players)
    })
    .await?;
    info!(game_id = game.id, players = game.players.len(), "game created");
    Ok((StatusCode::CREATED, Json(game)))
}

/// POST /games/{id}/players
pub async fn add_player(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<JoinGame>,
) -> Result<Json<Game>, ApiError> {
    let game = with_conn(&state.pool, move |conn| {
        GameRepo::add_player_by_name(conn, id, &body.name)
    })
    .await?;
    Ok(Json(game))
}
