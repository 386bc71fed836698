// Videos waiting for their new thumbnail, keyed by chat

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::telegram::types::{Message, Video};

pub const DEFAULT_PENDING_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_MAX_PENDING: usize = 10_000;

/// What is needed to re-send a video once the thumbnail is ready
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVideo {
    pub message_id: i64,
    pub file_id: String,
    pub file_size: Option<u64>,
    pub duration: u32,
    pub width: u32,
    pub height: u32,
    pub caption: String,
}

impl PendingVideo {
    pub fn from_message(message: &Message, video: &Video) -> Self {
        Self {
            message_id: message.message_id,
            file_id: video.file_id.clone(),
            file_size: video.file_size,
            duration: video.duration,
            width: video.width,
            height: video.height,
            caption: message.caption.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug)]
struct Entry {
    video: PendingVideo,
    stored_at: Instant,
}

/// One pending video per chat; the latest video wins.
///
/// Entries older than `ttl` are dropped, and once `capacity` chats are waiting
/// the oldest entry makes room for a new one. Both count as evictions.
#[derive(Debug, Clone)]
pub struct PendingStore {
    inner: Arc<Mutex<HashMap<i64, Entry>>>,
    evicted: Arc<AtomicU64>,
    ttl: Duration,
    capacity: usize,
}

impl Default for PendingStore {
    fn default() -> Self {
        Self::new(DEFAULT_PENDING_TTL, DEFAULT_MAX_PENDING)
    }
}

impl PendingStore {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            evicted: Arc::new(AtomicU64::new(0)),
            ttl,
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<i64, Entry>> {
        // ! A poisoned map still holds valid entries
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn expire(&self, map: &mut HashMap<i64, Entry>, now: Instant) {
        let before: usize = map.len();
        map.retain(|_, e: &mut Entry| now.saturating_duration_since(e.stored_at) <= self.ttl);
        let expired: usize = before - map.len();
        if expired > 0 {
            debug!(expired, "Dropped stale pending videos");
            self.evicted.fetch_add(expired as u64, Ordering::Relaxed);
        }
    }

    /// Stores the video for `chat_id`, returning the one it replaced
    pub fn insert(&self, chat_id: i64, video: PendingVideo) -> Option<PendingVideo> {
        self.insert_at(chat_id, video, Instant::now())
    }

    fn insert_at(&self, chat_id: i64, video: PendingVideo, now: Instant) -> Option<PendingVideo> {
        let mut map = self.lock();
        self.expire(&mut map, now);

        if !map.contains_key(&chat_id) && map.len() >= self.capacity {
            let oldest: Option<i64> = map
                .iter()
                .min_by_key(|(_, e): &(&i64, &Entry)| e.stored_at)
                .map(|(id, _)| *id);
            if let Some(id) = oldest {
                map.remove(&id);
                self.evicted.fetch_add(1, Ordering::Relaxed);
                debug!(chat_id = id, "Pending store full, evicted oldest video");
            }
        }

        map.insert(chat_id, Entry { video, stored_at: now })
            .map(|e: Entry| e.video)
    }

    /// Removes and returns the pending video for `chat_id`
    pub fn take(&self, chat_id: i64) -> Option<PendingVideo> {
        self.take_at(chat_id, Instant::now())
    }

    fn take_at(&self, chat_id: i64, now: Instant) -> Option<PendingVideo> {
        let mut map = self.lock();
        self.expire(&mut map, now);
        map.remove(&chat_id).map(|e: Entry| e.video)
    }

    pub fn contains(&self, chat_id: i64) -> bool {
        self.lock().contains_key(&chat_id)
    }

    pub fn len(&self) -> usize {
        let mut map = self.lock();
        self.expire(&mut map, Instant::now());
        map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries dropped for age or to make room
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(id: &str) -> PendingVideo {
        PendingVideo {
            message_id: 1,
            file_id: id.to_string(),
            file_size: None,
            duration: 3,
            width: 640,
            height: 360,
            caption: String::new(),
        }
    }

    #[test]
    fn latest_video_replaces_previous() {
        let store: PendingStore = PendingStore::default();

        assert!(store.insert(7, video("first")).is_none());
        let replaced: Option<PendingVideo> = store.insert(7, video("second"));

        assert_eq!(replaced.map(|v| v.file_id), Some("first".to_string()));
        assert_eq!(store.len(), 1);
        assert_eq!(store.take(7).map(|v| v.file_id), Some("second".to_string()));
    }

    #[test]
    fn take_consumes_the_entry() {
        let store: PendingStore = PendingStore::default();
        store.insert(1, video("a"));
        store.insert(2, video("b"));

        assert!(store.take(1).is_some());
        assert!(store.take(1).is_none());
        assert!(store.contains(2));
        assert!(!store.is_empty());
    }

    #[test]
    fn clones_share_entries() {
        let store: PendingStore = PendingStore::default();
        let other: PendingStore = store.clone();

        store.insert(9, video("shared"));
        assert!(other.contains(9));
    }

    #[test]
    fn stale_videos_expire() {
        let store: PendingStore = PendingStore::new(Duration::from_secs(60), 10);
        let now: Instant = Instant::now();
        store.insert_at(4, video("old"), now);

        assert!(store.take_at(4, now + Duration::from_secs(61)).is_none());
        assert_eq!(store.evicted(), 1);
    }

    #[test]
    fn full_store_evicts_the_oldest_chat() {
        let store: PendingStore = PendingStore::new(Duration::from_secs(3600), 2);
        let now: Instant = Instant::now();
        store.insert_at(1, video("a"), now);
        store.insert_at(2, video("b"), now + Duration::from_secs(1));

        // * replacing an existing chat never evicts
        store.insert_at(2, video("b2"), now + Duration::from_secs(2));
        assert_eq!(store.evicted(), 0);

        store.insert_at(3, video("c"), now + Duration::from_secs(3));

        assert_eq!(store.evicted(), 1);
        assert!(!store.contains(1));
        assert!(store.contains(2));
        assert!(store.contains(3));
    }
}
