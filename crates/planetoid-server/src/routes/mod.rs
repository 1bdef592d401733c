//! REST endpoints for players and games.

pub mod error;
pub mod games;
pub mod players;

use axum::Router;
use axum::routing::{get, post};
use planetoid_store::{ConnectionPool, PooledConnection};

pub use error::ApiError;

use crate::server::AppState;

/// `/players` and `/games` routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/players", get(players::list).post(players::create))
        .route("/games", get(games::list).post(games::create))
        .route("/games/{id}", get(games::get))
        .route("/games/{id}/players", post(games::add_player))
}

/// Run a store operation on the blocking pool with a pooled connection.
pub(crate) async fn with_conn<T, F>(pool: &ConnectionPool, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&PooledConnection) -> planetoid_store::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    let result = tokio::task::spawn_blocking(move || {
        let conn = pool.get()?;
        f(&conn)
    })
    .await?;
    Ok(result?)
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use planetoid_store::{ConnectionConfig, new_in_memory, run_migrations};
    use tower::ServiceExt;

    use crate::config::ServerConfig;
    use crate::server::PlanetoidServer;

    /// Router over a fresh, migrated in-memory database.
    pub(crate) fn app() -> Router {
        let pool = new_in_memory(&ConnectionConfig::default()).unwrap();
        let _ = run_migrations(&pool.get().unwrap()).unwrap();
        PlanetoidServer::new(ServerConfig::default(), pool).router()
    }

    /// Send a request and decode the JSON response.
    pub(crate) async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                req = req.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}
