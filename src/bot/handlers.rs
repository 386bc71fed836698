// Message handlers: /start, incoming videos, and the thumbnail replacement flow

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tracing::{debug, error, info, instrument, warn};

use crate::bot::pending::PendingVideo;
use crate::config::environment::UPLOAD_THUMB_CAP_KB;
use crate::config::state::AppState;
use crate::telegram::types::{Message, Update};
use crate::telegram::{BotApi, SendVideo, TelegramError, VideoInput};
use crate::thumbnail::{prepare_thumbnail, Thumbnail, ThumbnailError, Transcoder};

pub const START_TEXT: &str = "👋 Send a *video*, then send an *image*.\n\
    I will instantly change the thumbnail (using server file_id).\n\
    Recommended: JPG ≤ 200 KB.";
pub const VIDEO_RECEIVED_TEXT: &str = "✅ Video received.\nNow send the new thumbnail image.";
pub const SEND_VIDEO_FIRST_TEXT: &str = "❌ Send video first.";
pub const PREPARING_TEXT: &str = "⚙️ Preparing thumbnail...";
pub const DOWNLOAD_FAILED_TEXT: &str = "❌ Could not download your image.";
pub const SUCCESS_TEXT: &str = "✅ Thumbnail updated successfully!";

/// Everything a handler needs, shared across update tasks
#[derive(Clone)]
pub struct BotContext {
    pub api: Arc<dyn BotApi>,
    pub transcoder: Arc<dyn Transcoder>,
    pub state: AppState,
}

impl BotContext {
    pub fn new(api: Arc<dyn BotApi>, transcoder: Arc<dyn Transcoder>, state: AppState) -> Self {
        Self { api, transcoder, state }
    }
}

/// Which handler a message goes to; the first match wins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Start,
    Video,
    Image,
    Ignore,
}

pub fn route(message: &Message) -> Route {
    if message.command() == Some("start") {
        Route::Start
    } else if message.video.is_some() {
        Route::Video
    } else if message.photo.is_some() || message.document.is_some() {
        Route::Image
    } else {
        Route::Ignore
    }
}

/// Why a thumbnail replacement stopped short
#[derive(Debug, thiserror::Error)]
pub enum ReplaceError {
    #[error("image download failed: {0}")]
    Download(#[source] TelegramError),

    #[error("scratch directory unavailable: {0}")]
    Scratch(#[from] std::io::Error),

    #[error(transparent)]
    Thumbnail(#[from] ThumbnailError),

    #[error("sending video failed: {0}")]
    Send(#[source] TelegramError),
}

impl ReplaceError {
    /// The text the status message is edited to
    pub fn user_message(&self) -> String {
        match self {
            Self::Download(_) => DOWNLOAD_FAILED_TEXT.to_string(),
            Self::Thumbnail(ThumbnailError::TooLarge { kb }) => format!(
                "❌ Thumbnail too large ({kb:.1} KB).\nSend JPG ≤ {UPLOAD_THUMB_CAP_KB} KB."
            ),
            Self::Scratch(_) | Self::Thumbnail(_) => format!(
                "❌ Couldn't convert image to JPEG ≤{UPLOAD_THUMB_CAP_KB} KB.\n\
                 Please send a small JPG/PNG (not HEIC/WEBP)."
            ),
            Self::Send(e) => format!("❌ Thumbnail apply failed: {e}\nTry a smaller JPG."),
        }
    }
}

/// Entry point for every polled update
pub async fn handle_update(ctx: &BotContext, update: Update) {
    let Some(message) = update.message else {
        debug!(update_id = update.update_id, "Ignoring non-message update");
        return;
    };

    if let Err(e) = handle_message(ctx, &message).await {
        error!(chat_id = message.chat.id, "Failed to reply: {}", e);
    }
}

pub async fn handle_message(ctx: &BotContext, message: &Message) -> Result<(), TelegramError> {
    match route(message) {
        Route::Start => start_cmd(ctx, message).await,
        Route::Video => video_handler(ctx, message).await,
        Route::Image => thumb_handler(ctx, message).await,
        Route::Ignore => Ok(()),
    }
}

#[instrument(skip_all, fields(chat_id = message.chat.id))]
async fn start_cmd(ctx: &BotContext, message: &Message) -> Result<(), TelegramError> {
    ctx.api.send_message(message.chat.id, START_TEXT).await?;
    Ok(())
}

#[instrument(skip_all, fields(chat_id = message.chat.id))]
async fn video_handler(ctx: &BotContext, message: &Message) -> Result<(), TelegramError> {
    let Some(video) = message.video.as_ref() else {
        return Ok(());
    };

    let pending: PendingVideo = PendingVideo::from_message(message, video);
    if ctx.state.pending.insert(message.chat.id, pending).is_some() {
        debug!("Replaced an earlier pending video");
    }
    ctx.state.stats.record_video();
    info!(duration = video.duration, "Video received");

    ctx.api.send_message(message.chat.id, VIDEO_RECEIVED_TEXT).await?;
    Ok(())
}

#[instrument(skip_all, fields(chat_id = message.chat.id))]
async fn thumb_handler(ctx: &BotContext, message: &Message) -> Result<(), TelegramError> {
    let chat_id: i64 = message.chat.id;

    let Some(video) = ctx.state.pending.take(chat_id) else {
        ctx.api.send_message(chat_id, SEND_VIDEO_FIRST_TEXT).await?;
        return Ok(());
    };

    let status: Message = ctx.api.send_message(chat_id, PREPARING_TEXT).await?;

    let text: String = match replace_thumbnail(ctx, message, &video).await {
        Ok(thumb) => {
            ctx.state.stats.record_applied();
            info!(size_kb = thumb.size_kb(), "Thumbnail updated");
            SUCCESS_TEXT.to_string()
        }
        Err(e) => {
            ctx.state.stats.record_failure();
            match &e {
                ReplaceError::Send(_) => error!("Video send failed: {}", e),
                _ => warn!("Thumbnail replacement failed: {}", e),
            }
            e.user_message()
        }
    };

    ctx.api.edit_message_text(chat_id, status.message_id, &text).await
}

/// Downloads the image, prepares the JPEG, and re-sends the pending video with it.
/// The scratch directory is removed when this returns.
async fn replace_thumbnail(
    ctx: &BotContext,
    message: &Message,
    video: &PendingVideo,
) -> Result<Thumbnail, ReplaceError> {
    let env = &ctx.state.environment;
    let chat_id: i64 = message.chat.id;

    let scratch: TempDir = tempfile::Builder::new().prefix("thumb-").tempdir()?;

    let image_id: &str = message
        .image_file_id()
        .ok_or_else(|| ReplaceError::Download(TelegramError::Decode("message has no image".to_string())))?;

    let input: PathBuf = ctx
        .api
        .download_file(image_id, &scratch.path().join("thumb_in"))
        .await
        .map_err(ReplaceError::Download)?;

    let output: PathBuf = scratch.path().join("thumb.jpg");
    let thumb: Thumbnail = prepare_thumbnail(
        ctx.transcoder.as_ref(),
        &input,
        &output,
        env.effective_target_kb(),
        env.aggressive_compression,
    )
    .await?;

    let source: VideoInput = video_source(ctx, video, scratch.path()).await;

    ctx.api
        .send_video(SendVideo {
            chat_id,
            video: source,
            thumbnail: thumb.path.clone(),
            caption: video.caption.clone(),
            duration: video.duration,
            width: video.width,
            height: video.height,
            supports_streaming: true,
        })
        .await
        .map_err(ReplaceError::Send)?;

    if env.auto_delete {
        if let Err(e) = ctx.api.delete_message(chat_id, video.message_id).await {
            debug!("Could not delete original video: {}", e);
        }
    }

    Ok(thumb)
}

/// Telegram only honors a new thumbnail when the video itself is uploaded,
/// so videos small enough to download are re-uploaded; larger ones go by file_id.
async fn video_source(ctx: &BotContext, video: &PendingVideo, scratch: &Path) -> VideoInput {
    let limit: u64 = ctx.state.environment.reupload_limit_bytes();
    let fits: bool = video.file_size.is_some_and(|size: u64| size <= limit);

    if limit == 0 || !fits {
        return VideoInput::FileId(video.file_id.clone());
    }

    match ctx.api.download_file(&video.file_id, &scratch.join("video")).await {
        Ok(path) => VideoInput::Upload(path),
        Err(e) => {
            warn!("Video download failed, re-sending by file_id: {}", e);
            VideoInput::FileId(video.file_id.clone())
        }
    }
}
