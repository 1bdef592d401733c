//! `PlanetoidServer`: Axum HTTP + `WebSocket` server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use planetoid_store::ConnectionPool;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::errors::ServerError;
use crate::health::{self, HealthResponse};
use crate::metrics::WS_REJECTED_TOTAL;
use crate::routes;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::admission::AdmissionControl;
use crate::websocket::lifecycle::LifecycleCoordinator;
use crate::websocket::session::{SessionConfig, run_ws_session};

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Registry + broadcast for the game-data channel.
    pub coordinator: Arc<LifecycleCoordinator>,
    /// Connection limit gate for `/gamedata` upgrades.
    pub admission: Arc<AdmissionControl>,
    /// Game/player database pool.
    pub pool: ConnectionPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle, if a recorder was installed.
    pub metrics: Option<PrometheusHandle>,
}

/// The planetoid server.
pub struct PlanetoidServer {
    config: Arc<ServerConfig>,
    coordinator: Arc<LifecycleCoordinator>,
    admission: Arc<AdmissionControl>,
    pool: ConnectionPool,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    metrics: Option<PrometheusHandle>,
}

impl PlanetoidServer {
    /// Create a new server over a migrated database pool.
    pub fn new(config: ServerConfig, pool: ConnectionPool) -> Self {
        let coordinator = Arc::new(LifecycleCoordinator::new());
        let admission = Arc::new(AdmissionControl::new(
            Arc::clone(coordinator.registry()),
            config.max_connections,
        ));
        Self {
            config: Arc::new(config),
            coordinator,
            admission,
            pool,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
            metrics: None,
        }
    }

    /// Serve `/metrics` from this Prometheus handle.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            coordinator: Arc::clone(&self.coordinator),
            admission: Arc::clone(&self.admission),
            pool: self.pool.clone(),
            config: Arc::clone(&self.config),
            shutdown: Arc::clone(&self.shutdown),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/gamedata/{username}", get(gamedata_handler))
            .merge(routes::router())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind the configured address and serve in a background task.
    ///
    /// Returns the bound address (useful with port `0`) and the serve task,
    /// which finishes after [`ShutdownCoordinator::shutdown`].
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        let app = self.router();
        let token = self.shutdown.token();

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                error!(error = %e, "server error");
            }
            info!("server stopped");
        });

        info!(addr = %local_addr, "planetoid server listening");
        Ok((local_addr, handle))
    }

    /// The game-data lifecycle coordinator.
    pub fn coordinator(&self) -> &Arc<LifecycleCoordinator> {
        &self.coordinator
    }

    /// Connection limit gate for `/gamedata` upgrades.
    pub fn admission(&self) -> &Arc<AdmissionControl> {
        &self.admission
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Database pool.
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.coordinator.registry().len();
    Json(health::health_check(state.start_time, connections))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => crate::metrics::render(handle).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// GET /gamedata/{username}: upgrade into the game-data channel.
///
/// Refused with 503 once `max_connections` identities are registered or
/// mid-upgrade, unless `username` is one of them (a reconnect replaces its
/// entry).
async fn gamedata_handler(
    ws: WebSocketUpgrade,
    Path(username): Path<String>,
    State(state): State<AppState>,
) -> Response {
    let Some(ticket) = state.admission.try_admit(&username) else {
        counter!(WS_REJECTED_TOTAL).increment(1);
        warn!(
            identity = %username,
            max = state.config.max_connections,
            "connection limit reached, refusing upgrade"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "too many connections").into_response();
    };

    let session = SessionConfig::from(state.config.as_ref());
    let token = state.shutdown.token();
    let coordinator = Arc::clone(&state.coordinator);
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| {
            run_ws_session(socket, ticket, coordinator, session, token)
        })
        .into_response()
}
