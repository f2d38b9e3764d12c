pub mod openai_compat;

use axum::extract::State;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
///
/// The turn endpoint is mounted both bare and under `/v1`, since platforms
/// differ in whether they append the version segment to the base URL.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/chat/completions", post(openai_compat::chat_completions))
        .route("/v1/chat/completions", post(openai_compat::chat_completions))
}

/// Liveness probe.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "sessions": state.sessions.len(),
    }))
}
