//! tests/common/mod.rs
//! Shared helpers to spawn the health server (or a fake Bot API) on an ephemeral port.

#![allow(dead_code)]

use std::collections::HashMap;

use axum::{serve, Router};
use blaze_thumb_bot::config::{environment::EnvironmentVariables, state::AppState};
use blaze_thumb_bot::core::server::{create_app, with_envelope};
use tokio::net::TcpListener as TokioTcpListener;

/// Test configuration: a dummy token plus any overrides.
pub fn test_env(overrides: &[(&str, &str)]) -> EnvironmentVariables {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("BOT_TOKEN".to_string(), "TEST".to_string()),
        ("ENVIRONMENT".to_string(), "test".to_string()),
    ]);
    for (k, v) in overrides {
        vars.insert(k.to_string(), v.to_string());
    }

    EnvironmentVariables::from_lookup(|key: &str| vars.get(key).cloned())
        .expect("test configuration should load")
}

/// Serves `app` on a random unused port and returns its base URL.
pub fn spawn_router(app: Router) -> String {
    // * Bind an ephemeral port using std::net::TcpListener.
    let std_listener: std::net::TcpListener = std::net::TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind random port");
    std_listener.set_nonblocking(true).unwrap();

    // * Convert std::net::TcpListener to tokio::net::TcpListener.
    let tokio_listener: TokioTcpListener = TokioTcpListener::from_std(std_listener)
        .expect("Failed to convert to tokio listener");

    let addr: std::net::SocketAddr = tokio_listener.local_addr().unwrap();

    // * Spawn the server in a background task.
    tokio::spawn(async move {
        serve(tokio_listener, app).await.expect("Server failed");
    });

    format!("http://{}", addr)
}

/// Spawns the health server with the given state and returns its base URL.
pub fn spawn_app_with(state: AppState) -> String {
    spawn_router(create_app(state))
}

/// Spawns the health server with a default state and returns its base URL.
pub fn spawn_app() -> String {
    spawn_app_with(AppState::new(test_env(&[])))
}

/// Serves extra `routes` behind the health server's envelope and limits.
pub fn spawn_enveloped(routes: Router<AppState>, overrides: &[(&str, &str)]) -> String {
    let state: AppState = AppState::new(test_env(overrides));
    let app: Router = with_envelope(routes, &state.environment).with_state(state);
    spawn_router(app)
}
