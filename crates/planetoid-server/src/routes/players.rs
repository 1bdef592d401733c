//! `/players` handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use planetoid_store::{Player, PlayerRepo};
use serde::Deserialize;
use tracing::info;

use super::{ApiError, with_conn};
use crate::server::AppState;

/// `POST /players` body.
#[derive(Debug, Deserialize)]
pub struct NewPlayer {
    /// Unique player name.
    pub name: String,
}

/// GET /players: distinct player names, sorted.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let names = with_conn(&state.pool, |conn| PlayerRepo::names(conn)).await?;
    Ok(Json(names))
}

/// POST /players
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<NewPlayer>,
) -> Result<(StatusCode, Json<Player>), ApiError> {
    let player = with_conn(&state.pool, move |conn| PlayerRepo::create(conn, &body.name)).await?;
    info!(player_id = player.id, name = %player.name, "player created");
    Ok((StatusCode::CREATED, Json(player)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::routes::test_support::{app, call};

    #[tokio::test]
    async fn create_then_list() {
        let app = app();
        let (status, body) = call(&app, "POST", "/players", Some(json!({"name": "toto"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["name"], "toto");
        assert!(body["id"].is_number());

        let _ = call(&app, "POST", "/players", Some(json!({"name": "abby"}))).await;
        let (status, body) = call(&app, "GET", "/players", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(["abby", "toto"]));
    }

    #[tokio::test]
    async fn empty_list() {
        let app = app();
        let (status, body) = call(&app, "GET", "/players", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn blank_name_is_bad_request() {
        let app = app();
        let (status, body) = call(&app, "POST", "/players", Some(json!({"name": "   "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_name");
    }

    #[tokio::test]
    async fn duplicate_name_conflicts() {
        let app = app();
        let _ = call(&app, "POST", "/players", Some(json!({"name": "titi"}))).await;
        let (status, body) = call(&app, "POST", "/players", Some(json!({"name": "titi"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "already_exists");
    }
}
