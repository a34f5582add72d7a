//! ffprobe integration: extracting duration and frame size from a source
//! before it is compiled and processed.

use crate::error::{CoreError, CoreResult};
use ffprobe::{ffprobe, FfProbeError};
use std::path::Path;

/// Probed facts about a media file. Fields are individually optional:
/// a file that ffprobe can open but whose duration it cannot determine
/// still processes, with indeterminate progress.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct MediaInfo {
    /// Duration in seconds.
    pub duration: Option<f64>,
    /// Width of the first video stream.
    pub width: Option<u32>,
    /// Height of the first video stream.
    pub height: Option<u32>,
}

impl MediaInfo {
    /// Frame size when both dimensions were reported.
    #[must_use]
    pub fn resolution(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => None,
        }
    }
}

/// Probes a media file with ffprobe. Fails only when ffprobe itself cannot
/// run or cannot open the file; missing individual fields degrade to None.
pub fn probe_media(input_path: &Path) -> CoreResult<MediaInfo> {
    log::debug!("Running ffprobe on: {}", input_path.display());

    let metadata = ffprobe(input_path).map_err(|err| {
        log::error!("ffprobe failed for {}: {err:?}", input_path.display());
        map_ffprobe_error(err, input_path)
    })?;

    let duration = metadata
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0);
    if duration.is_none() {
        log::warn!(
            "Could not determine duration for {}; progress will be indeterminate",
            input_path.display()
        );
    }

    let video_stream = metadata
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let width = video_stream
        .and_then(|s| s.width)
        .and_then(|w| u32::try_from(w).ok());
    let height = video_stream
        .and_then(|s| s.height)
        .and_then(|h| u32::try_from(h).ok());

    Ok(MediaInfo {
        duration,
        width,
        height,
    })
}

fn map_ffprobe_error(err: FfProbeError, input_path: &Path) -> CoreError {
    match err {
        FfProbeError::Io(e) => CoreError::CommandStart("ffprobe".to_string(), e),
        other => CoreError::FfprobeParse(format!(
            "ffprobe failed for {}: {other:?}",
            input_path.display()
        )),
    }
}
