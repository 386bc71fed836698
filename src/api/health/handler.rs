// Start of file: /src/api/health/handler.rs

// Liveness and status endpoints for container platforms

use axum::{extract::State, http::StatusCode};
use serde_json::json;
use tracing::{debug, instrument};

use crate::config::state::AppState;
use crate::utils::response_handler::HandlerResponse;

// Answers the platform's liveness probe
pub async fn alive_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "Bot is alive")
}

// Reports what the bot has been doing since it started
#[instrument(skip(state))]
pub async fn status_handler(State(state): State<AppState>) -> HandlerResponse {
    debug!("Status endpoint called");

    let stats = &state.stats;
    let hostname: String = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string());

    HandlerResponse::new(StatusCode::OK)
        .data(json!({
            "version": env!("CARGO_PKG_VERSION"),
            "status": "healthy",
            "environment": &*state.environment.environment,
            "hostname": hostname,
            "bot_username": stats.username(),
            "started_at": stats.started_at().to_rfc3339(),
            "uptime_seconds": stats.uptime_seconds(),
            "pending_videos": state.pending.len(),
            "pending_evicted": state.pending.evicted(),
            "videos_received": stats.videos_received(),
            "thumbnails_applied": stats.thumbnails_applied(),
            "failures": stats.failures(),
        }))
        .message("Bot is running")
}

// Any route that does not exist
pub async fn fallback_handler() -> HandlerResponse {
    HandlerResponse::new(StatusCode::NOT_FOUND).message("The requested route does not exist")
}

// End of file: /src/api/health/handler.rs
