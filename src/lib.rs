// Library root for the Blaze thumbnail bot

pub mod api;
pub mod bot;
pub mod config;
pub mod core;
pub mod telegram;
pub mod thumbnail;
pub mod utils;

pub use crate::config::environment::EnvironmentVariables;
pub use crate::config::state::AppState;
