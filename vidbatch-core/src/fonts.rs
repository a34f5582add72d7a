//! Default font lookup for text overlays.
//!
//! When an overlay has no usable explicit font, the compiler falls back to
//! the first font found in a fixed per-OS candidate table; if none exists,
//! `fontfile` is simply omitted and ffmpeg picks its own default.

use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};

#[cfg(target_os = "linux")]
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
];

#[cfg(target_os = "macos")]
const FONT_CANDIDATES: &[&str] = &[
    "/System/Library/Fonts/Helvetica.ttc",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
];

#[cfg(target_os = "windows")]
const FONT_CANDIDATES: &[&str] = &[
    "C:/Windows/Fonts/arial.ttf",
    "C:/Windows/Fonts/calibri.ttf",
    "C:/Windows/Fonts/segoeui.ttf",
];

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const FONT_CANDIDATES: &[&str] = &[];

static DEFAULT_FONT: Lazy<Option<PathBuf>> = Lazy::new(|| {
    let found = FONT_CANDIDATES
        .iter()
        .map(Path::new)
        .find(|p| p.is_file())
        .map(Path::to_path_buf);
    match &found {
        Some(path) => log::debug!("Default overlay font: {}", path.display()),
        None => log::debug!("No default overlay font found; fontfile will be omitted"),
    }
    found
});

/// The first existing font from the platform candidate table, probed once.
#[must_use]
pub fn resolve_default_font() -> Option<PathBuf> {
    DEFAULT_FONT.clone()
}
