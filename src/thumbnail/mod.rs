// Start of file: /src/thumbnail/mod.rs

/*
    * Thumbnail preparation: turn whatever image the user sent into a JPEG
    * Telegram accepts as a video thumbnail.
*/

pub mod compress;
pub mod transcoder;

use std::path::{Path, PathBuf};

use tracing::{instrument, warn};

use crate::config::environment::UPLOAD_THUMB_CAP_KB;
pub use compress::make_jpeg_under;
pub use transcoder::{FfmpegTranscoder, Transcoder};

// * Last-resort re-encode at the original dimensions
const FORCED_SCALE: &str = "iw:ih";
const FORCED_QUALITY: u32 = 25;

#[derive(Debug, thiserror::Error)]
pub enum ThumbnailError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ffmpeg did not finish within {0}s")]
    Timeout(u64),

    #[error("Could not produce JPEG")]
    NoOutput,

    #[error("Couldn't convert image to JPEG under {target_kb} KB")]
    ConversionFailed { target_kb: u64 },

    #[error("Thumbnail too large ({kb:.1} KB)")]
    TooLarge { kb: f64 },
}

/// A JPEG ready to be attached to a video
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    pub path: PathBuf,
    pub size_bytes: u64,
}

impl Thumbnail {
    pub fn size_kb(&self) -> f64 {
        self.size_bytes as f64 / 1024.0
    }
}

pub(crate) async fn file_size(path: &Path) -> Option<u64> {
    tokio::fs::metadata(path).await.ok().map(|m| m.len())
}

async fn forced_reencode(
    transcoder: &dyn Transcoder,
    input: &Path,
    output: &Path,
    target_kb: u64,
) -> Result<(), ThumbnailError> {
    transcoder.convert(input, output, FORCED_SCALE, FORCED_QUALITY).await?;

    match file_size(output).await {
        None => Err(ThumbnailError::NoOutput),
        Some(size) if size <= target_kb.saturating_mul(1024) => Ok(()),
        Some(_) => make_jpeg_under(transcoder, output, output, target_kb, true)
            .await
            .map(|_| ()),
    }
}

/// Converts `input` into a JPEG at `output` that fits Telegram's thumbnail cap.
///
/// The regular compression loop runs first; if it fails, a forced full-size
/// re-encode followed by aggressive compression is attempted.
#[instrument(skip(transcoder, input, output), fields(input = %input.display()))]
pub async fn prepare_thumbnail(
    transcoder: &dyn Transcoder,
    input: &Path,
    output: &Path,
    target_kb: u64,
    aggressive: bool,
) -> Result<Thumbnail, ThumbnailError> {
    let mut converted: bool = match make_jpeg_under(transcoder, input, output, target_kb, aggressive).await {
        Ok(_) => true,
        Err(e) => {
            warn!("Regular conversion failed: {}", e);
            false
        }
    };

    if !converted {
        converted = match forced_reencode(transcoder, input, output, target_kb).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Forced re-encode failed: {}", e);
                false
            }
        };
    }

    if !converted {
        return Err(ThumbnailError::ConversionFailed { target_kb });
    }

    let size_bytes: u64 = file_size(output)
        .await
        .ok_or(ThumbnailError::ConversionFailed { target_kb })?;

    let thumbnail: Thumbnail = Thumbnail {
        path: output.to_path_buf(),
        size_bytes,
    };

    if thumbnail.size_kb() > UPLOAD_THUMB_CAP_KB as f64 {
        return Err(ThumbnailError::TooLarge { kb: thumbnail.size_kb() });
    }

    Ok(thumbnail)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::{ThumbnailError, Transcoder};

    #[derive(Debug, Clone)]
    pub struct Call {
        pub src: std::path::PathBuf,
        pub dst: std::path::PathBuf,
        pub scale: String,
        pub quality: u32,
    }

    /// Writes outputs of scripted sizes; `None` simulates a failed encode
    pub struct ScriptedTranscoder {
        sizes: Mutex<VecDeque<Option<usize>>>,
        fallback: Option<Option<usize>>,
        calls: Mutex<Vec<Call>>,
    }

    impl ScriptedTranscoder {
        pub fn new<I: IntoIterator<Item = Option<usize>>>(sizes: I) -> Self {
            Self {
                sizes: Mutex::new(sizes.into_iter().collect()),
                fallback: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn repeating(size: Option<usize>) -> Self {
            Self {
                sizes: Mutex::new(VecDeque::new()),
                fallback: Some(size),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transcoder for ScriptedTranscoder {
        async fn convert(&self, src: &Path, dst: &Path, scale: &str, quality: u32) -> Result<(), ThumbnailError> {
            self.calls.lock().unwrap().push(Call {
                src: src.to_path_buf(),
                dst: dst.to_path_buf(),
                scale: scale.to_string(),
                quality,
            });

            let next: Option<usize> = {
                let mut sizes = self.sizes.lock().unwrap();
                sizes.pop_front().or(self.fallback).flatten()
            };

            if let Some(size) = next {
                std::fs::write(dst, vec![0u8; size])?;
            }
            Ok(())
        }
    }
}


// End of file: /src/thumbnail/mod.rs
