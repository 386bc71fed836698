// Start of file: /src/telegram/mod.rs

/*
    * Telegram Bot API: wire types, the `BotApi` seam used by the handlers,
    * and the reqwest-backed client.
*/

pub mod client;
pub mod error;
pub mod types;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

pub use client::TelegramClient;
pub use error::TelegramError;
pub use types::{Message, Update, User};

/// Where the video bytes of a `sendVideo` call come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoInput {
    /// Re-send a file Telegram already stores
    FileId(String),
    /// Upload a local file
    Upload(PathBuf),
}

/// Parameters of a `sendVideo` call
#[derive(Debug, Clone)]
pub struct SendVideo {
    pub chat_id: i64,
    pub video: VideoInput,
    pub thumbnail: PathBuf,
    pub caption: String,
    pub duration: u32,
    pub width: u32,
    pub height: u32,
    pub supports_streaming: bool,
}

/// The Bot API operations the bot relies on
#[async_trait]
pub trait BotApi: Send + Sync {
    async fn get_me(&self) -> Result<User, TelegramError>;

    /// Drops any webhook so `getUpdates` is allowed
    async fn delete_webhook(&self) -> Result<(), TelegramError>;

    async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>, TelegramError>;

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<Message, TelegramError>;

    async fn edit_message_text(&self, chat_id: i64, message_id: i64, text: &str) -> Result<(), TelegramError>;

    /// Downloads a file to `dest_stem`, keeping the extension Telegram reports.
    /// Returns the path actually written.
    async fn download_file(&self, file_id: &str, dest_stem: &Path) -> Result<PathBuf, TelegramError>;

    async fn send_video(&self, request: SendVideo) -> Result<Message, TelegramError>;

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), TelegramError>;
}

// End of file: /src/telegram/mod.rs
