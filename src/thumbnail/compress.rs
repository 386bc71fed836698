// Squeezes an image into a JPEG under a byte budget

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::thumbnail::transcoder::Transcoder;
use crate::thumbnail::{file_size, ThumbnailError};

// * Bounding boxes handed to ffmpeg's scale filter
pub const SCALE_NORMAL: &str = "min(1280,iw):min(720,ih)";
pub const SCALE_AGGRESSIVE: &str = "min(854,iw):min(480,ih)";
pub const SCALE_SMALL: &str = "min(640,iw):min(360,ih)";
pub const SCALE_TINY: &str = "min(480,iw):min(270,ih)";

const QUALITY_NORMAL: u32 = 3;
const QUALITY_AGGRESSIVE: u32 = 5;
const QUALITY_STEP: u32 = 3;
const QUALITY_LIMIT: u32 = 40;

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e: &str| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
}

/// `<dst>.tmp.jpg`, the scratch file re-encode passes ping-pong through
fn scratch_path(dst: &Path) -> PathBuf {
    let mut name: OsString = dst.as_os_str().to_owned();
    name.push(".tmp.jpg");
    PathBuf::from(name)
}

/// Produces a JPEG at `dst` no larger than `target_kb`, if the passes allow.
///
/// An already-small JPEG is copied as is. Otherwise the image is re-encoded,
/// raising the quantizer by 3 each pass and shrinking the bounding box on
/// passes 3 and 5, until the output fits or the quantizer passes 40. The
/// result may still be over budget when every pass fails to fit; callers
/// check the final size. `src` and `dst` may be the same path.
#[instrument(skip(transcoder, src, dst), fields(src = %src.display(), dst = %dst.display()))]
pub async fn make_jpeg_under(
    transcoder: &dyn Transcoder,
    src: &Path,
    dst: &Path,
    target_kb: u64,
    aggressive: bool,
) -> Result<PathBuf, ThumbnailError> {
    let target_bytes: u64 = target_kb.saturating_mul(1024);

    if is_jpeg(src) && file_size(src).await.is_some_and(|size: u64| size <= target_bytes) {
        if src != dst {
            tokio::fs::copy(src, dst).await?;
        }
        debug!("Source is already a small JPEG");
        return Ok(dst.to_path_buf());
    }

    let (mut scale, mut quality): (&str, u32) = if aggressive {
        (SCALE_AGGRESSIVE, QUALITY_AGGRESSIVE)
    } else {
        (SCALE_NORMAL, QUALITY_NORMAL)
    };

    let tmp: PathBuf = scratch_path(dst);
    transcoder.convert(src, &tmp, scale, quality).await?;

    let mut pass: u32 = 0;
    while quality <= QUALITY_LIMIT {
        match file_size(&tmp).await {
            Some(size) if size > target_bytes => {}
            _ => break,
        }

        quality += QUALITY_STEP;
        pass += 1;

        if pass == 3 {
            scale = SCALE_SMALL;
        } else if pass >= 5 {
            scale = SCALE_TINY;
        }

        transcoder.convert(&tmp, dst, scale, quality).await?;
        debug!(pass, quality, scale, "Re-encode pass");

        if let Some(size) = file_size(dst).await {
            if size <= target_bytes {
                break;
            }
            tokio::fs::rename(dst, &tmp).await?;
        }
    }

    if file_size(&tmp).await.is_some() {
        let dst_fits: bool = file_size(dst)
            .await
            .is_some_and(|size: u64| size <= target_bytes);

        if dst_fits {
            let _ = tokio::fs::remove_file(&tmp).await;
        } else {
            tokio::fs::rename(&tmp, dst).await?;
        }
    }

    if file_size(dst).await.is_none() {
        return Err(ThumbnailError::NoOutput);
    }

    Ok(dst.to_path_buf())
}
