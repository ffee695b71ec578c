//! High-score API — axum REST surface over the repository.
//!
//! All endpoints speak JSON. A malformed serialized history is the
//! caller's fault and comes back as 400 with the validation message;
//! everything else that fails is a 500.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use super::repo::HighScoreRepo;
use super::HighScore;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// State shared by all route handlers.
pub struct ServiceState {
    pub repo: HighScoreRepo,
}

pub type AppState = Arc<ServiceState>;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighScoreResponse {
    pub id: Option<String>,
    pub username: String,
    pub score: i64,
    pub date: String,
    pub serialized_history: String,
}

impl From<HighScore> for HighScoreResponse {
    fn from(hs: HighScore) -> Self {
        HighScoreResponse {
            date: hs.date.to_rfc3339(),
            serialized_history: hs.serialized_history().to_string(),
            id: hs.id,
            username: hs.username,
            score: hs.score,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveHighScoreRequest {
    pub username: String,
    pub serialized_history: String,
}

#[derive(Debug, Serialize)]
pub struct SavedHighScoreResponse {
    pub id: String,
    pub date: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { message: message.into() }))
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/highscores
pub async fn list_high_scores(
    State(state): State<AppState>,
) -> Result<Json<Vec<HighScoreResponse>>, ApiError> {
    match state.repo.list().await {
        Ok(scores) => Ok(Json(scores.into_iter().map(Into::into).collect())),
        Err(e) => {
            error!(error = %e, "Failed to fetch high scores");
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch high scores",
            ))
        }
    }
}

/// POST /api/highscores
pub async fn save_high_score(
    State(state): State<AppState>,
    Json(request): Json<SaveHighScoreRequest>,
) -> Result<(StatusCode, Json<SavedHighScoreResponse>), ApiError> {
    let high_score = HighScore::from_serialized(
        request.serialized_history,
        request.username,
        None,
        None,
    )
    .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    match state.repo.save(&high_score).await {
        Ok(saved) => Ok((
            StatusCode::CREATED,
            Json(SavedHighScoreResponse {
                id: saved.id,
                date: saved.date.to_rfc3339(),
            }),
        )),
        Err(e) => {
            error!(error = %e, "Failed to save high score");
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to save high score",
            ))
        }
    }
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin("*".parse::<HeaderValue>().expect("static origin"))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/highscores", get(list_high_scores).post(save_high_score))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

/// Start the high-score server on a background task — does not block.
pub fn spawn_server(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = build_router(state);

    tokio::spawn(async move {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        info!(port, "High-score server starting on http://localhost:{port}");

        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                if let Err(e) = axum::serve(listener, app).await {
                    error!(error = %e, "High-score server error");
                }
            }
            Err(e) => error!(error = %e, port, "Failed to bind high-score port"),
        }
    });

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
