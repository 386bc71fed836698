// Start of file: /src/core/logging.rs

use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "blaze_thumb_bot=info,tower_http=debug,axum=info";

// Initialize the tracing subscriber; RUST_LOG overrides the default filter
pub fn init_tracing() {
    let env_filter: EnvFilter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // ? try_init so tests and embedders that already installed a subscriber keep theirs
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

// End of file: /src/core/logging.rs
