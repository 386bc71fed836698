// ffmpeg invocation behind a trait so the compression loop can be exercised without ffmpeg

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::thumbnail::ThumbnailError;

// ! mjpeg only understands qscale values in this range
const MIN_QSCALE: u32 = 2;
const MAX_QSCALE: u32 = 31;
const CONVERT_TIMEOUT: Duration = Duration::from_secs(60);

/// Re-encodes an image to JPEG.
///
/// A failed encode is not an error: callers judge success by whether `dst`
/// exists afterwards. Errors are reserved for not being able to run the tool.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn convert(&self, src: &Path, dst: &Path, scale: &str, quality: u32) -> Result<(), ThumbnailError>;
}

#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    bin: String,
}

impl FfmpegTranscoder {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    fn command(&self, src: &Path, dst: &Path, scale: &str, quality: u32) -> Command {
        let mut cmd: Command = Command::new(&self.bin);
        cmd.arg("-y")
            .arg("-i")
            .arg(src)
            .arg("-vf")
            .arg(format!("scale={scale}:force_original_aspect_ratio=decrease"))
            .arg("-qscale:v")
            .arg(quality.clamp(MIN_QSCALE, MAX_QSCALE).to_string())
            .arg(dst)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn convert(&self, src: &Path, dst: &Path, scale: &str, quality: u32) -> Result<(), ThumbnailError> {
        let status: ExitStatus = tokio::time::timeout(CONVERT_TIMEOUT, self.command(src, dst, scale, quality).status())
            .await
            .map_err(|_| ThumbnailError::Timeout(CONVERT_TIMEOUT.as_secs()))??;

        if !status.success() {
            debug!(?status, scale, quality, "ffmpeg exited unsuccessfully");
        }

        Ok(())
    }
}
