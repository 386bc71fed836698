// Counters reported on /status

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

#[derive(Debug)]
pub struct BotStats {
    started_at: DateTime<Utc>,
    username: RwLock<Option<String>>,
    videos_received: AtomicU64,
    thumbnails_applied: AtomicU64,
    failures: AtomicU64,
}

impl BotStats {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            username: RwLock::new(None),
            videos_received: AtomicU64::new(0),
            thumbnails_applied: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds().max(0)
    }

    pub fn set_username(&self, username: Option<String>) {
        if let Ok(mut slot) = self.username.write() {
            *slot = username;
        }
    }

    pub fn username(&self) -> Option<String> {
        self.username.read().ok().and_then(|u| u.clone())
    }

    pub fn record_video(&self) {
        self.videos_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_applied(&self) {
        self.thumbnails_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn videos_received(&self) -> u64 {
        self.videos_received.load(Ordering::Relaxed)
    }

    pub fn thumbnails_applied(&self) -> u64 {
        self.thumbnails_applied.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

impl Default for BotStats {
    fn default() -> Self {
        Self::new()
    }
}
