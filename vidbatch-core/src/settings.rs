//! The immutable settings snapshot and its validation rules.
//!
//! A [`Snapshot`] is captured once per task and passed by value into the
//! command compiler and the queue. Nothing reads live UI or CLI state after
//! capture; the only way task settings change afterwards is the explicit
//! queue-level bulk re-apply operation.

use crate::error::{validation_error, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Supported video codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodec {
    #[default]
    H264,
    Hevc,
    H264Nvenc,
    HevcNvenc,
}

impl VideoCodec {
    /// The ffmpeg encoder name for this codec.
    #[must_use]
    pub fn encoder_name(self) -> &'static str {
        match self {
            Self::H264 => "libx264",
            Self::Hevc => "libx265",
            Self::H264Nvenc => "h264_nvenc",
            Self::HevcNvenc => "hevc_nvenc",
        }
    }

    /// NVENC codecs decode/encode on the GPU and take `-cq` instead of `-crf`.
    #[must_use]
    pub fn is_gpu(self) -> bool {
        matches!(self, Self::H264Nvenc | Self::HevcNvenc)
    }
}

/// Encoding speed presets understood by the x264/x265/nvenc encoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderPreset {
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Fast,
    #[default]
    Medium,
    Slow,
    Slower,
    Veryslow,
}

impl EncoderPreset {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ultrafast => "ultrafast",
            Self::Superfast => "superfast",
            Self::Veryfast => "veryfast",
            Self::Faster => "faster",
            Self::Fast => "fast",
            Self::Medium => "medium",
            Self::Slow => "slow",
            Self::Slower => "slower",
            Self::Veryslow => "veryslow",
        }
    }
}

/// Quality control mode: constant rate factor or target bitrate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Crf(u8),
    Bitrate(String),
}

impl Default for Quality {
    fn default() -> Self {
        Self::Crf(23)
    }
}

/// Optional trim window. Offsets are seconds from the start of the source.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrimRange {
    pub start: Option<f64>,
    pub end: Option<f64>,
}

/// Crop rectangle in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Target output resolution. Absent means "keep original".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleTarget {
    pub width: u32,
    pub height: u32,
}

/// Placement of an overlay (watermark or text) on the frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
    Custom {
        x: i64,
        y: i64,
    },
}

/// Watermark content: a short text string or an image file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkKind {
    Text(String),
    Image(PathBuf),
}

/// Watermark applied on top of the video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Watermark {
    pub enabled: bool,
    pub kind: WatermarkKind,
    pub position: Position,
}

impl Watermark {
    /// A watermark contributes a filter only when enabled and its content
    /// is non-empty after trimming whitespace.
    #[must_use]
    pub fn is_active(&self) -> bool {
        if !self.enabled {
            return false;
        }
        match &self.kind {
            WatermarkKind::Text(text) => !text.trim().is_empty(),
            WatermarkKind::Image(path) => !path.as_os_str().is_empty(),
        }
    }
}

/// Optional background box behind overlay text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBox {
    pub color: String,
    /// 0.0 (invisible) to 1.0 (opaque).
    pub opacity: f64,
}

/// Advanced text overlay settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOverlay {
    pub enabled: bool,
    pub text: String,
    pub font_path: Option<PathBuf>,
    pub font_size: u32,
    pub font_color: String,
    pub outline_color: String,
    pub outline_width: u32,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub position: Position,
    pub text_box: Option<TextBox>,
}

impl Default for TextOverlay {
    fn default() -> Self {
        Self {
            enabled: false,
            text: String::new(),
            font_path: None,
            font_size: 48,
            font_color: "#FFFFFF".to_string(),
            outline_color: "#000000".to_string(),
            outline_width: 2,
            bold: false,
            italic: false,
            underline: false,
            position: Position::TopLeft,
            text_box: None,
        }
    }
}

impl TextOverlay {
    /// Enabled-but-empty text must compile to no filter at all.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.enabled && !self.text.trim().is_empty()
    }
}

/// Video splitting mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    /// Split into N equal parts.
    ByCount(u32),
    /// Split into fixed-length parts of this many seconds.
    ByDuration(f64),
}

/// Split settings: how to partition the source, and whether each part is
/// then processed with the rest of the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitSpec {
    pub mode: SplitMode,
    pub process_parts: bool,
}

/// Immutable capture of every user-chosen processing option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub speed: f64,
    pub volume: f64,
    pub trim: Option<TrimRange>,
    pub crop: Option<CropRect>,
    pub scale: Option<ScaleTarget>,
    pub codec: VideoCodec,
    pub quality: Quality,
    pub preset: EncoderPreset,
    pub watermark: Option<Watermark>,
    pub text_overlay: Option<TextOverlay>,
    pub subtitles: Option<PathBuf>,
    pub split: Option<SplitSpec>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            speed: 1.0,
            volume: 1.0,
            trim: None,
            crop: None,
            scale: None,
            codec: VideoCodec::default(),
            quality: Quality::default(),
            preset: EncoderPreset::default(),
            watermark: None,
            text_overlay: None,
            subtitles: None,
            split: None,
        }
    }
}

/// Bounds accepted by [`Snapshot::validate`].
pub const SPEED_RANGE: (f64, f64) = (0.25, 4.0);
pub const VOLUME_RANGE: (f64, f64) = (0.0, 4.0);
pub const FONT_SIZE_RANGE: (u32, u32) = (8, 512);
pub const SPLIT_COUNT_RANGE: (u32, u32) = (2, 100);
pub const MIN_SPLIT_DURATION: f64 = 1.0;
pub const MAX_DIMENSION: (u32, u32) = (7680, 4320); // 8K

impl Snapshot {
    /// Returns a copy with the split fields removed, for compiling the
    /// per-part invocations of a split-then-process pipeline.
    #[must_use]
    pub fn without_split(&self) -> Self {
        let mut snapshot = self.clone();
        snapshot.split = None;
        snapshot
    }

    /// Validates every field against its declared range and checks that
    /// referenced files exist. All violations are structured errors; the
    /// compiler refuses to run on an invalid snapshot.
    pub fn validate(&self) -> CoreResult<()> {
        if !(SPEED_RANGE.0..=SPEED_RANGE.1).contains(&self.speed) {
            return Err(validation_error(format!(
                "speed must be between {} and {}, got {}",
                SPEED_RANGE.0, SPEED_RANGE.1, self.speed
            )));
        }

        if !(VOLUME_RANGE.0..=VOLUME_RANGE.1).contains(&self.volume) {
            return Err(validation_error(format!(
                "volume must be between {} and {}, got {}",
                VOLUME_RANGE.0, VOLUME_RANGE.1, self.volume
            )));
        }

        if let Some(trim) = &self.trim {
            if let (Some(start), Some(end)) = (trim.start, trim.end) {
                if end <= start {
                    return Err(validation_error(format!(
                        "trim end ({end}) must be after trim start ({start})"
                    )));
                }
            }
            if trim.start.is_some_and(|s| s < 0.0) || trim.end.is_some_and(|e| e < 0.0) {
                return Err(validation_error("trim offsets must be non-negative"));
            }
        }

        if let Some(crop) = &self.crop {
            if crop.width == 0 || crop.height == 0 {
                return Err(validation_error("crop dimensions must be positive"));
            }
            if crop.width % 2 != 0 || crop.height % 2 != 0 {
                return Err(validation_error(format!(
                    "crop dimensions must be even, got {}x{}",
                    crop.width, crop.height
                )));
            }
        }

        if let Some(scale) = &self.scale {
            if scale.width < 2
                || scale.height < 2
                || scale.width > MAX_DIMENSION.0
                || scale.height > MAX_DIMENSION.1
            {
                return Err(validation_error(format!(
                    "scale target {}x{} out of supported bounds",
                    scale.width, scale.height
                )));
            }
            if scale.width % 2 != 0 || scale.height % 2 != 0 {
                return Err(validation_error(format!(
                    "scale dimensions must be even, got {}x{}",
                    scale.width, scale.height
                )));
            }
        }

        if let Quality::Crf(crf) = self.quality {
            if crf > 51 {
                return Err(validation_error(format!(
                    "CRF must be between 0 and 51, got {crf}"
                )));
            }
        }
        if let Quality::Bitrate(rate) = &self.quality {
            if normalize_bitrate(rate).is_none() {
                return Err(validation_error(format!("invalid bitrate: '{rate}'")));
            }
        }

        if let Some(watermark) = &self.watermark {
            if watermark.is_active() {
                if let WatermarkKind::Image(path) = &watermark.kind {
                    if !path.is_file() {
                        return Err(validation_error(format!(
                            "watermark image not found: {}",
                            path.display()
                        )));
                    }
                }
            }
        }

        if let Some(overlay) = &self.text_overlay {
            if overlay.is_active() {
                if !(FONT_SIZE_RANGE.0..=FONT_SIZE_RANGE.1).contains(&overlay.font_size) {
                    return Err(validation_error(format!(
                        "font size must be between {} and {}, got {}",
                        FONT_SIZE_RANGE.0, FONT_SIZE_RANGE.1, overlay.font_size
                    )));
                }
                if let Some(font) = &overlay.font_path {
                    if !font.is_file() {
                        return Err(validation_error(format!(
                            "font file not found: {}",
                            font.display()
                        )));
                    }
                }
                if let Some(text_box) = &overlay.text_box {
                    if !(0.0..=1.0).contains(&text_box.opacity) {
                        return Err(validation_error(format!(
                            "box opacity must be between 0.0 and 1.0, got {}",
                            text_box.opacity
                        )));
                    }
                }
            }
        }

        if let Some(subtitles) = &self.subtitles {
            if !subtitles.is_file() {
                return Err(validation_error(format!(
                    "subtitle file not found: {}",
                    subtitles.display()
                )));
            }
        }

        if let Some(split) = &self.split {
            match split.mode {
                SplitMode::ByCount(n) => {
                    if !(SPLIT_COUNT_RANGE.0..=SPLIT_COUNT_RANGE.1).contains(&n) {
                        return Err(validation_error(format!(
                            "split part count must be between {} and {}, got {n}",
                            SPLIT_COUNT_RANGE.0, SPLIT_COUNT_RANGE.1
                        )));
                    }
                }
                SplitMode::ByDuration(secs) => {
                    if !secs.is_finite() || secs < MIN_SPLIT_DURATION {
                        return Err(validation_error(format!(
                            "split duration must be at least {MIN_SPLIT_DURATION} second, got {secs}"
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Validates and normalizes a bitrate string ("5M", "1000k", "500000").
/// Bare numbers are whole bits per second, at least 1000, and are kept
/// exact: whole kilobits render as K, anything else stays in bits.
#[must_use]
pub fn normalize_bitrate(bitrate: &str) -> Option<String> {
    let trimmed = bitrate.trim().to_uppercase();
    if trimmed.is_empty() {
        return None;
    }

    let (digits, unit) = match trimmed.strip_suffix(['K', 'M']) {
        Some(value) => (value, &trimmed[trimmed.len() - 1..]),
        None => (trimmed.as_str(), ""),
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }

    if unit.is_empty() {
        let bits: u64 = digits.parse().ok()?;
        if bits < 1000 {
            return None;
        }
        if bits % 1000 == 0 {
            Some(format!("{}K", bits / 1000))
        } else {
            Some(bits.to_string())
        }
    } else {
        let value: f64 = digits.parse().ok()?;
        if value <= 0.0 {
            return None;
        }
        Some(format!("{digits}{unit}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_snapshot_is_valid() {
        assert!(Snapshot::default().validate().is_ok());
    }

    #[test]
    fn test_speed_out_of_range() {
        let snapshot = Snapshot {
            speed: 10.0,
            ..Default::default()
        };
        assert!(snapshot.validate().is_err());
    }

    #[test]
    fn test_trim_end_before_start() {
        let snapshot = Snapshot {
            trim: Some(TrimRange {
                start: Some(60.0),
                end: Some(30.0),
            }),
            ..Default::default()
        };
        assert!(snapshot.validate().is_err());
    }

    #[test]
    fn test_odd_scale_rejected() {
        let snapshot = Snapshot {
            scale: Some(ScaleTarget {
                width: 1921,
                height: 1080,
            }),
            ..Default::default()
        };
        assert!(snapshot.validate().is_err());
    }

    #[test]
    fn test_missing_subtitle_file_rejected() {
        let snapshot = Snapshot {
            subtitles: Some(PathBuf::from("/nonexistent/subs.srt")),
            ..Default::default()
        };
        assert!(snapshot.validate().is_err());
    }

    #[test]
    fn test_disabled_overlay_skips_file_checks() {
        // An inactive overlay referencing a missing font must not fail
        // validation; the feature compiles to nothing.
        let snapshot = Snapshot {
            text_overlay: Some(TextOverlay {
                enabled: false,
                text: "hello".to_string(),
                font_path: Some(PathBuf::from("/nonexistent/font.ttf")),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(snapshot.validate().is_ok());
    }

    #[test]
    fn test_enabled_but_empty_overlay_is_inactive() {
        let overlay = TextOverlay {
            enabled: true,
            text: "   \n  ".to_string(),
            ..Default::default()
        };
        assert!(!overlay.is_active());
    }

    #[test]
    fn test_without_split_strips_only_split() {
        let snapshot = Snapshot {
            speed: 1.5,
            split: Some(SplitSpec {
                mode: SplitMode::ByCount(3),
                process_parts: true,
            }),
            ..Default::default()
        };
        let stripped = snapshot.without_split();
        assert!(stripped.split.is_none());
        assert_eq!(stripped.speed, 1.5);
    }

    #[test]
    fn test_normalize_bitrate() {
        assert_eq!(normalize_bitrate("5M"), Some("5M".to_string()));
        assert_eq!(normalize_bitrate("1000k"), Some("1000K".to_string()));
        assert_eq!(normalize_bitrate("500000"), Some("500K".to_string()));
        assert_eq!(normalize_bitrate(""), None);
        assert_eq!(normalize_bitrate("fast"), None);
        assert_eq!(normalize_bitrate("0"), None);
    }

    #[test]
    fn test_normalize_bitrate_keeps_bare_values_exact() {
        // Bits-per-second inputs are never truncated to a smaller rate.
        assert_eq!(normalize_bitrate("1500"), Some("1500".to_string()));
        assert_eq!(normalize_bitrate("2000"), Some("2K".to_string()));
        assert_eq!(normalize_bitrate("500"), None);
        assert_eq!(normalize_bitrate("999"), None);
    }
}
