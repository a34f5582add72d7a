//! Filter-graph construction: escaping, colors, positions, and the
//! clause builders that the command compiler assembles into `-vf` /
//! `-filter_complex` expressions.
//!
//! Escaping follows ffmpeg's own filter grammar: inside a drawtext value,
//! literal backslash, quote, colon, percent, and newline characters must be
//! backslash-escaped so the filter parser reproduces the original text.

use crate::error::{validation_error, CoreResult};
use crate::settings::{Position, TextOverlay};
use std::path::Path;

/// Escapes free text for use inside a drawtext `text='...'` value.
#[must_use]
pub fn escape_drawtext_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '\'' | ':' | '%' | '\n' => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Normalizes a font path for the drawtext `fontfile` option: path
/// separators become forward slashes and a Windows drive-letter colon is
/// escaped, distinctly from content colons which never appear in paths here.
#[must_use]
pub fn escape_font_path(path: &Path) -> String {
    let mut s = path.to_string_lossy().replace('\\', "/");
    let bytes = s.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b':' {
        s = format!("{}\\:{}", &s[..1], &s[2..]);
    }
    s
}

/// Normalizes a subtitle path for the `subtitles` filter. Every colon is
/// escaped since the filter argument is colon-delimited.
#[must_use]
pub fn escape_subtitle_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace(':', "\\:")
}

/// Normalizes a `#RGB`/`#RRGGBB` hex color (leading `#` optional) to
/// ffmpeg's native `0xRRGGBB` token.
pub fn hex_to_ffmpeg_color(color: &str) -> CoreResult<String> {
    let hex = color.trim().trim_start_matches('#');
    let expanded = match hex.len() {
        3 => hex
            .chars()
            .flat_map(|c| [c, c])
            .collect::<String>(),
        6 => hex.to_string(),
        _ => {
            return Err(validation_error(format!("invalid hex color: '{color}'")));
        }
    };
    if !expanded.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(validation_error(format!("invalid hex color: '{color}'")));
    }
    Ok(format!("0x{}", expanded.to_uppercase()))
}

/// As [`hex_to_ffmpeg_color`], with an `@opacity` suffix for translucent
/// fills (the drawtext box syntax).
pub fn hex_to_ffmpeg_color_alpha(color: &str, opacity: f64) -> CoreResult<String> {
    Ok(format!("{}@{opacity}", hex_to_ffmpeg_color(color)?))
}

const OVERLAY_MARGIN: i64 = 10;

/// Resolves a position preset to concrete drawtext coordinates, keeping the
/// estimated text footprint inside the frame. The footprint estimate
/// (0.6 x fontsize per character of the widest line, fontsize per line) is
/// deliberately rough; exact layout happens inside ffmpeg.
#[must_use]
pub fn resolve_text_position(
    position: Position,
    text: &str,
    font_size: u32,
    frame: (u32, u32),
) -> (i64, i64) {
    if let Position::Custom { x, y } = position {
        return (x, y);
    }

    let first_line_len = text.lines().next().map_or(0, str::len) as f64;
    let line_count = text.lines().count().max(1) as i64;
    let text_width = (first_line_len * f64::from(font_size) * 0.6) as i64;
    let text_height = i64::from(font_size) * line_count;
    let (frame_w, frame_h) = (i64::from(frame.0), i64::from(frame.1));

    match position {
        Position::TopLeft => (OVERLAY_MARGIN, OVERLAY_MARGIN),
        Position::TopRight => ((frame_w - text_width - OVERLAY_MARGIN).max(0), OVERLAY_MARGIN),
        Position::BottomLeft => (OVERLAY_MARGIN, (frame_h - text_height - OVERLAY_MARGIN).max(0)),
        Position::BottomRight => (
            (frame_w - text_width - OVERLAY_MARGIN).max(0),
            (frame_h - text_height - OVERLAY_MARGIN).max(0),
        ),
        Position::Center => (
            ((frame_w - text_width) / 2).max(0),
            ((frame_h - text_height) / 2).max(0),
        ),
        Position::Custom { x, y } => (x, y),
    }
}

/// Resolves a position preset to overlay-filter coordinate expressions,
/// which may reference the frame (`W`/`H`) and overlay (`w`/`h`) sizes.
#[must_use]
pub fn resolve_overlay_position(position: Position) -> (String, String) {
    match position {
        Position::TopLeft => ("10".to_string(), "10".to_string()),
        Position::TopRight => ("W-w-10".to_string(), "10".to_string()),
        Position::BottomLeft => ("10".to_string(), "H-h-10".to_string()),
        Position::BottomRight => ("W-w-10".to_string(), "H-h-10".to_string()),
        Position::Center => ("(W-w)/2".to_string(), "(H-h)/2".to_string()),
        Position::Custom { x, y } => (x.to_string(), y.to_string()),
    }
}

/// Builder for constructing a comma-joined video or audio filter chain.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<String>,
}

impl FilterChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter clause to the chain; empty clauses are ignored.
    #[must_use]
    pub fn add(mut self, filter: impl Into<String>) -> Self {
        let filter = filter.into();
        if !filter.is_empty() {
            self.filters.push(filter);
        }
        self
    }

    /// Builds the chain into a single filter string, None when empty.
    #[must_use]
    pub fn build(self) -> Option<String> {
        if self.filters.is_empty() {
            None
        } else {
            Some(self.filters.join(","))
        }
    }
}

/// Builds the drawtext clause for an active text overlay. Returns None when
/// the overlay is inactive (disabled, or whitespace-only content).
pub fn build_drawtext(
    overlay: &TextOverlay,
    frame: (u32, u32),
    default_font: Option<&Path>,
) -> CoreResult<Option<String>> {
    if !overlay.is_active() {
        return Ok(None);
    }

    let mut parts = vec![format!("text='{}'", escape_drawtext_text(&overlay.text))];

    let font = overlay
        .font_path
        .as_deref()
        .filter(|p| p.is_file())
        .or(default_font);
    if let Some(font) = font {
        parts.push(format!("fontfile={}", escape_font_path(font)));
    }

    parts.push(format!("fontsize={}", overlay.font_size));
    parts.push(format!(
        "fontcolor={}",
        hex_to_ffmpeg_color(&overlay.font_color)?
    ));

    let (x, y) = resolve_text_position(overlay.position, &overlay.text, overlay.font_size, frame);
    parts.push(format!("x={x}"));
    parts.push(format!("y={y}"));

    if overlay.outline_width > 0 {
        parts.push(format!(
            "bordercolor={}",
            hex_to_ffmpeg_color(&overlay.outline_color)?
        ));
        parts.push(format!("borderw={}", overlay.outline_width));
    }

    if let Some(text_box) = &overlay.text_box {
        parts.push("box=1".to_string());
        parts.push(format!(
            "boxcolor={}",
            hex_to_ffmpeg_color_alpha(&text_box.color, text_box.opacity)?
        ));
    }

    Ok(Some(format!("drawtext={}", parts.join(":"))))
}

/// Builds the drawtext clause for a simple text watermark: fixed small
/// white text with a black border, placed by preset.
#[must_use]
pub fn build_text_watermark(text: &str, position: Position, frame: (u32, u32)) -> String {
    let (x, y) = resolve_text_position(position, text, 24, frame);
    format!(
        "drawtext=text='{}':x={x}:y={y}:fontsize=24:fontcolor=white:borderw=2:bordercolor=black",
        escape_drawtext_text(text)
    )
}

/// Decomposes a speed factor into a chain of atempo clauses, each within
/// the filter's supported 0.5-2.0 range.
#[must_use]
pub fn atempo_chain(speed: f64) -> Vec<String> {
    let mut filters = Vec::new();
    let mut remaining = speed;
    while remaining > 2.0 {
        filters.push("atempo=2.0".to_string());
        remaining /= 2.0;
    }
    while remaining < 0.5 {
        filters.push("atempo=0.5".to_string());
        remaining /= 0.5;
    }
    if (remaining - 1.0).abs() > f64::EPSILON {
        filters.push(format!("atempo={remaining}"));
    }
    filters
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_escape_drawtext_text() {
        assert_eq!(escape_drawtext_text("plain"), "plain");
        assert_eq!(escape_drawtext_text("a:b"), "a\\:b");
        assert_eq!(escape_drawtext_text("it's"), "it\\'s");
        assert_eq!(escape_drawtext_text("100%"), "100\\%");
        assert_eq!(escape_drawtext_text("a\\b"), "a\\\\b");
        assert_eq!(escape_drawtext_text("two\nlines"), "two\\\nlines");
    }

    #[test]
    fn test_escape_font_path_windows_drive() {
        let path = PathBuf::from(r"C:\Fonts\arial.ttf");
        assert_eq!(escape_font_path(&path), "C\\:/Fonts/arial.ttf");
    }

    #[test]
    fn test_escape_font_path_unix() {
        let path = PathBuf::from("/usr/share/fonts/DejaVuSans.ttf");
        assert_eq!(escape_font_path(&path), "/usr/share/fonts/DejaVuSans.ttf");
    }

    #[test]
    fn test_hex_color_normalization() {
        assert_eq!(hex_to_ffmpeg_color("#FFFFFF").unwrap(), "0xFFFFFF");
        assert_eq!(hex_to_ffmpeg_color("#fff").unwrap(), "0xFFFFFF");
        assert_eq!(hex_to_ffmpeg_color("1a2b3c").unwrap(), "0x1A2B3C");
        assert!(hex_to_ffmpeg_color("#12345").is_err());
        assert!(hex_to_ffmpeg_color("#gggggg").is_err());
    }

    #[test]
    fn test_hex_color_with_alpha() {
        assert_eq!(
            hex_to_ffmpeg_color_alpha("#000000", 0.5).unwrap(),
            "0x000000@0.5"
        );
    }

    #[test]
    fn test_position_presets_stay_in_frame() {
        let frame = (1920, 1080);
        let (x, y) = resolve_text_position(Position::BottomRight, "HELLO", 48, frame);
        assert!(x >= 0 && x < 1920);
        assert!(y >= 0 && y < 1080);

        let (x, y) = resolve_text_position(Position::TopLeft, "HELLO", 48, frame);
        assert_eq!((x, y), (10, 10));
    }

    #[test]
    fn test_custom_position_passes_through() {
        let (x, y) = resolve_text_position(Position::Custom { x: 123, y: 456 }, "T", 48, (640, 480));
        assert_eq!((x, y), (123, 456));
    }

    #[test]
    fn test_overlay_position_expressions() {
        assert_eq!(
            resolve_overlay_position(Position::TopRight),
            ("W-w-10".to_string(), "10".to_string())
        );
        assert_eq!(
            resolve_overlay_position(Position::Center),
            ("(W-w)/2".to_string(), "(H-h)/2".to_string())
        );
    }

    #[test]
    fn test_filter_chain() {
        assert_eq!(FilterChain::new().build(), None);
        assert_eq!(
            FilterChain::new()
                .add("crop=1280:720:0:0")
                .add("")
                .add("scale=640:360")
                .build(),
            Some("crop=1280:720:0:0,scale=640:360".to_string())
        );
    }

    #[test]
    fn test_atempo_chain_decomposition() {
        assert!(atempo_chain(1.0).is_empty());
        assert_eq!(atempo_chain(1.5), vec!["atempo=1.5"]);
        assert_eq!(atempo_chain(4.0), vec!["atempo=2.0", "atempo=2.0"]);
        assert_eq!(atempo_chain(0.25), vec!["atempo=0.5", "atempo=0.5"]);
    }

    #[test]
    fn test_inactive_overlay_builds_nothing() {
        let overlay = TextOverlay {
            enabled: true,
            text: "   ".to_string(),
            ..Default::default()
        };
        assert_eq!(build_drawtext(&overlay, (1920, 1080), None).unwrap(), None);
    }

    #[test]
    fn test_drawtext_example_clause() {
        let overlay = TextOverlay {
            enabled: true,
            text: "TEST".to_string(),
            font_size: 48,
            font_color: "#FFFFFF".to_string(),
            outline_width: 0,
            position: Position::Custom { x: 10, y: 10 },
            ..Default::default()
        };
        let clause = build_drawtext(&overlay, (1920, 1080), None).unwrap().unwrap();
        assert_eq!(
            clause,
            "drawtext=text='TEST':fontsize=48:fontcolor=0xFFFFFF:x=10:y=10"
        );
    }
}
