// Start of file: /src/bot/mod.rs

/*
    * The bot itself: per-chat pending videos, message handlers,
    * the polling runner and the session it persists.
*/

pub mod handlers;
pub mod pending;
pub mod runner;
pub mod session;
pub mod stats;

pub use handlers::BotContext;
pub use runner::BotRunner;

// End of file: /src/bot/mod.rs
