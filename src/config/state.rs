// Application state shared by the bot and the health server

use std::sync::Arc;
use std::time::Duration;

use crate::bot::pending::PendingStore;
use crate::bot::stats::BotStats;
use crate::config::environment::EnvironmentVariables;

#[derive(Debug, Clone)]
pub struct AppState {
    pub environment: Arc<EnvironmentVariables>,
    pub pending: PendingStore,
    pub stats: Arc<BotStats>,
}

impl AppState {
    /// Creates a fresh state around the given configuration
    pub fn new(environment: EnvironmentVariables) -> Self {
        let pending: PendingStore = PendingStore::new(
            Duration::from_secs(environment.pending_ttl_seconds),
            environment.max_pending_videos,
        );

        Self {
            environment: Arc::new(environment),
            pending,
            stats: Arc::new(BotStats::new()),
        }
    }

    /// Builds the state from the process environment singleton
    pub fn from_env() -> anyhow::Result<Self> {
        let environment: &'static EnvironmentVariables = EnvironmentVariables::instance()?;
        Ok(Self::new(environment.clone()))
    }
}
