//! tests/health_server.rs
//! Integration test crate aggregating the health server tests.

mod common;

mod health_server {
    #[path = "alive.rs"]
    mod alive;

    #[path = "status.rs"]
    mod status;

    #[path = "not_found.rs"]
    mod not_found;

    #[path = "timeout.rs"]
    mod timeout;

    #[path = "body_limit.rs"]
    mod body_limit;
}
