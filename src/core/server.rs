// Health server configuration and setup

use std::time::Duration;

use anyhow::Result;
use axum::{error_handling::HandleErrorLayer, extract::DefaultBodyLimit, middleware::from_fn, Router};
use listenfd::ListenFd;
use tokio::{net::TcpListener, signal};
use tower::{timeout::TimeoutLayer, ServiceBuilder};

use crate::api::health::handler::fallback_handler;
use crate::api::health::routes::{alive_routes, status_routes};
use crate::config::environment::EnvironmentVariables;
use crate::config::state::AppState;
use crate::utils::{error_handler::handle_global_error, response_handler::response_wrapper};

/// Creates the health router: `/` as plain text, everything else in the JSON envelope
pub fn create_app(state: AppState) -> Router {
    let enveloped: Router<AppState> = with_envelope(
        Router::new().merge(status_routes()),
        &state.environment,
    );

    Router::new()
        .merge(alive_routes())
        .merge(enveloped)
        .with_state(state)
}

/// Wraps `routes` in the JSON envelope, timeout and body limit, and adds the 404 fallback
pub fn with_envelope(routes: Router<AppState>, env: &EnvironmentVariables) -> Router<AppState> {
    routes.fallback(fallback_handler).layer(
        ServiceBuilder::new()
            .layer(from_fn(response_wrapper))
            .layer(HandleErrorLayer::new(handle_global_error))
            .layer(TimeoutLayer::new(Duration::from_secs(env.default_timeout_seconds)))
            .layer(DefaultBodyLimit::max(env.max_request_body_size)),
    )
}

/// Sets up the TCP listener from environment or binds to new address
pub async fn setup_listener(env: &EnvironmentVariables) -> Result<TcpListener> {
    let mut listenfd: ListenFd = ListenFd::from_env();

    let listener: TcpListener = match listenfd.take_tcp_listener(0)? {
        Some(std_listener) => {
            std_listener.set_nonblocking(true)?;
            TcpListener::from_std(std_listener)?
        }
        None => {
            let addr: String = format!("{}:{}", env.host, env.port);
            TcpListener::bind(&addr).await?
        }
    };

    Ok(listener)
}

/// Resolves on Ctrl+C or TERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Ctrl+C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Terminate signal handler unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Shutting down via Ctrl+C"),
        _ = terminate => tracing::info!("Shutting down via TERM signal"),
    }
}
