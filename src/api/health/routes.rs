// Start of file: /src/api/health/routes.rs

// Routes for liveness and status endpoints

use axum::{routing::get, Router};

use crate::api::health::handler::{alive_handler, status_handler};
use crate::config::state::AppState;

// Plain-text liveness probe, kept outside the JSON envelope
pub fn alive_routes() -> Router<AppState> {
    Router::new().route("/", get(alive_handler))
}

// Routes whose responses go through the JSON envelope
pub fn status_routes() -> Router<AppState> {
    Router::new().route("/status", get(status_handler))
}

// End of file: /src/api/health/routes.rs
