//! Leaderboard HTTP Server
//!
//! axum router over a [`RankingService`]. Storage calls run on the
//! blocking pool; shutdown is signalled through a broadcast channel.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::compression::predicate::{DefaultPredicate, Predicate, SizeAbove};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument};

use crate::leaderboard::model::{GameSession, GameStats, HighScore, HIGH_SCORE_SLOTS};
use crate::leaderboard::service::{LeaderboardError, RankingService};
use crate::leaderboard::store::StorageError;
use crate::network::protocol::{ErrorBody, HealthResponse, HighScoreQuery, SessionRequest};

/// Responses smaller than this are sent uncompressed.
pub const GZIP_MIN_BYTES: u16 = 1000;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Prefix for API routes.
    pub api_prefix: String,
    /// Entries returned when no limit is given.
    pub default_high_score_limit: usize,
    /// Upper bound on the requested limit.
    pub max_high_score_limit: usize,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            api_prefix: "/api".to_string(),
            default_high_score_limit: HIGH_SCORE_SLOTS,
            max_high_score_limit: 100,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind or serve.
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared handler state.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Ranking service
    pub service: RankingService,
    /// Server configuration
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Bundle a service with its configuration.
    pub fn new(service: RankingService, config: ServerConfig) -> Self {
        Self {
            service,
            config: Arc::new(config),
        }
    }
}

// =============================================================================
// ROUTES
// =============================================================================

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let game = Router::new()
        .route("/session", post(create_session))
        .route("/high-scores", get(high_scores))
        .route("/stats", get(stats));

    let prefix = format!("{}/game", state.config.api_prefix.trim_end_matches('/'));

    Router::new()
        .route("/health", get(health))
        .nest(&prefix, game)
        .layer(
            CompressionLayer::new()
                .gzip(true)
                .compress_when(DefaultPredicate::new().and(SizeAbove::new(GZIP_MIN_BYTES))),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[instrument(skip_all)]
async fn create_session(
    State(state): State<AppState>,
    body: Result<Json<SessionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<GameSession>), ApiError> {
    const DETAIL: &str = "Failed to save game session";

    let Json(request) = body.map_err(|rejection| ApiError::Unprocessable(rejection.body_text()))?;
    let run = request
        .into_run_result()
        .map_err(|e| ApiError::Unprocessable(e.to_string()))?;

    let service = state.service.clone();
    let submitted = blocking(move || service.submit_run(run))
        .await
        .map_err(|e| ApiError::from_leaderboard(e, DETAIL))?;

    Ok((StatusCode::CREATED, Json(submitted.session)))
}

async fn high_scores(
    State(state): State<AppState>,
    query: Result<Query<HighScoreQuery>, QueryRejection>,
) -> Result<Json<Vec<HighScore>>, ApiError> {
    const DETAIL: &str = "Failed to get high scores";

    let Query(query) = query.map_err(|rejection| ApiError::Unprocessable(rejection.body_text()))?;
    let limit = query
        .limit
        .map_or(state.config.default_high_score_limit, |limit| limit as usize)
        .min(state.config.max_high_score_limit);

    let service = state.service.clone();
    let entries = blocking(move || service.top_high_scores(limit))
        .await
        .map_err(|e| ApiError::from_leaderboard(e, DETAIL))?;

    Ok(Json(entries))
}

async fn stats(State(state): State<AppState>) -> Result<Json<GameStats>, ApiError> {
    const DETAIL: &str = "Failed to get game statistics";

    let service = state.service.clone();
    let stats = blocking(move || service.aggregate_stats())
        .await
        .map_err(|e| ApiError::from_leaderboard(e, DETAIL))?;

    Ok(Json(stats))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now().timestamp(),
        service: "lane_runner".to_string(),
        version: state.config.version.clone(),
    })
}

/// Run a service call on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, LeaderboardError>
where
    F: FnOnce() -> Result<T, LeaderboardError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StorageError::Unavailable(e.to_string()))?
}

// =============================================================================
// ERRORS
// =============================================================================

/// Handler failure rendered as `{"detail": ...}`.
#[derive(Debug)]
pub enum ApiError {
    /// Rejected input (422)
    Unprocessable(String),
    /// Storage failure (500) with a fixed detail
    Internal(&'static str),
}

impl ApiError {
    fn from_leaderboard(err: LeaderboardError, detail: &'static str) -> Self {
        match err {
            LeaderboardError::Validation(e) => ApiError::Unprocessable(e.to_string()),
            LeaderboardError::Storage(e) => {
                error!(error = %e, "{}", detail);
                ApiError::Internal(detail)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Unprocessable(detail) => (StatusCode::UNPROCESSABLE_ENTITY, detail),
            ApiError::Internal(detail) => (StatusCode::INTERNAL_SERVER_ERROR, detail.to_string()),
        };
        (status, Json(ErrorBody::new(detail))).into_response()
    }
}

// =============================================================================
// SERVER
// =============================================================================

/// The leaderboard server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Handler state.
    state: AppState,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new server.
    pub fn new(config: ServerConfig, service: RankingService) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let state = AppState::new(service, config.clone());

        Self {
            config,
            state,
            shutdown_tx,
        }
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until shutdown.
    #[instrument(skip_all)]
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        info!("Leaderboard server listening on {}", listener.local_addr()?);

        axum::serve(listener, router(self.state.clone()))
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("Shutdown signal received");
            })
            .await?;

        info!("Leaderboard server stopped");
        Ok(())
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Sender that triggers shutdown from another task.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Handler state (for building routers in tests or embedding).
    pub fn state(&self) -> &AppState {
        &self.state
    }
}
