// vidbatch-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "vidbatch: batch video processing with ffmpeg",
    long_about = "Compiles processing settings into ffmpeg commands and runs them \
                  through a pausable task queue via the vidbatch-core library."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Processes video files from an input file or directory
    Process(ProcessArgs),
}

#[derive(Parser, Debug)]
pub struct ProcessArgs {
    /// Input video file or directory of video files
    #[arg(short = 'i', long = "input", required = true, value_name = "INPUT_PATH")]
    pub input_path: PathBuf,

    /// Directory where processed files will be saved
    #[arg(short = 'o', long = "output", required = true, value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Optional: directory for log files (defaults to OUTPUT_DIR/logs)
    #[arg(long, value_name = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Optional: JSON settings file applied before any flag overrides
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    // --- Timing ---
    /// Playback speed factor (0.25 to 4.0)
    #[arg(long, value_name = "FACTOR")]
    pub speed: Option<f64>,

    /// Audio volume factor (0.0 to 4.0)
    #[arg(long, value_name = "FACTOR")]
    pub volume: Option<f64>,

    /// Trim start offset in seconds
    #[arg(long, value_name = "SECONDS")]
    pub trim_start: Option<f64>,

    /// Trim end offset in seconds
    #[arg(long, value_name = "SECONDS")]
    pub trim_end: Option<f64>,

    // --- Geometry ---
    /// Crop region as X:Y:WxH (e.g. 0:0:1280x720)
    #[arg(long, value_name = "X:Y:WxH")]
    pub crop: Option<String>,

    /// Output resolution as WxH (e.g. 1280x720)
    #[arg(long, value_name = "WxH")]
    pub scale: Option<String>,

    // --- Encoding ---
    /// Video codec: h264, hevc, h264-nvenc, hevc-nvenc
    #[arg(long, value_name = "CODEC")]
    pub codec: Option<String>,

    /// Constant rate factor (0-51)
    #[arg(long, value_name = "CRF", conflicts_with = "bitrate")]
    pub crf: Option<u8>,

    /// Target video bitrate (e.g. 5M, 2500k)
    #[arg(long, value_name = "RATE")]
    pub bitrate: Option<String>,

    /// Encoder preset (ultrafast .. veryslow)
    #[arg(long, value_name = "PRESET")]
    pub preset: Option<String>,

    // --- Watermark ---
    /// Text watermark content
    #[arg(long, value_name = "TEXT", conflicts_with = "watermark_image")]
    pub watermark_text: Option<String>,

    /// Image watermark file
    #[arg(long, value_name = "IMAGE")]
    pub watermark_image: Option<PathBuf>,

    /// Watermark position: top-left, top-right, bottom-left, bottom-right, center
    #[arg(long, value_name = "POSITION")]
    pub watermark_position: Option<String>,

    // --- Text overlay ---
    /// Text overlay content
    #[arg(long, value_name = "TEXT")]
    pub text: Option<String>,

    /// Font file for the text overlay
    #[arg(long, value_name = "FONT_FILE")]
    pub font: Option<PathBuf>,

    /// Font size in points (8-512)
    #[arg(long, value_name = "SIZE")]
    pub font_size: Option<u32>,

    /// Font color as a hex value (e.g. #FFFFFF)
    #[arg(long, value_name = "COLOR")]
    pub font_color: Option<String>,

    /// Outline color as a hex value
    #[arg(long, value_name = "COLOR")]
    pub outline_color: Option<String>,

    /// Outline width in pixels (0 disables the outline)
    #[arg(long, value_name = "WIDTH")]
    pub outline_width: Option<u32>,

    /// Draw a background box behind the overlay text
    #[arg(long = "box", default_value_t = false)]
    pub text_box: bool,

    /// Background box color as a hex value
    #[arg(long, value_name = "COLOR")]
    pub box_color: Option<String>,

    /// Background box opacity (0.0-1.0)
    #[arg(long, value_name = "OPACITY")]
    pub box_opacity: Option<f64>,

    /// Text position preset: top-left, top-right, bottom-left, bottom-right, center
    #[arg(long, value_name = "POSITION", conflicts_with_all = ["text_x", "text_y"])]
    pub text_position: Option<String>,

    /// Custom text X coordinate
    #[arg(long, value_name = "PIXELS", requires = "text_y")]
    pub text_x: Option<i64>,

    /// Custom text Y coordinate
    #[arg(long, value_name = "PIXELS", requires = "text_x")]
    pub text_y: Option<i64>,

    // --- Subtitles ---
    /// Burn in subtitles from this file
    #[arg(long, value_name = "SUBTITLE_FILE")]
    pub subtitles: Option<PathBuf>,

    // --- Splitting ---
    /// Split each source into this many equal parts (2-100)
    #[arg(long, value_name = "COUNT", conflicts_with = "split_duration")]
    pub split_count: Option<u32>,

    /// Split each source into parts of this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub split_duration: Option<f64>,

    /// Re-encode each split part with the remaining settings
    #[arg(long, default_value_t = false)]
    pub process_parts: bool,

    // --- Queue ---
    /// Number of files to process concurrently
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub jobs: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_minimal_invocation() {
        let cli = Cli::parse_from(["vidbatch", "process", "-i", "/in", "-o", "/out"]);
        let Commands::Process(args) = cli.command;
        assert_eq!(args.input_path, PathBuf::from("/in"));
        assert_eq!(args.output_dir, PathBuf::from("/out"));
        assert_eq!(args.jobs, 1);
        assert!(args.speed.is_none());
    }

    #[test]
    fn test_crf_conflicts_with_bitrate() {
        let result = Cli::try_parse_from([
            "vidbatch", "process", "-i", "/in", "-o", "/out", "--crf", "20", "--bitrate", "5M",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_split_modes_are_mutually_exclusive() {
        let result = Cli::try_parse_from([
            "vidbatch",
            "process",
            "-i",
            "/in",
            "-o",
            "/out",
            "--split-count",
            "3",
            "--split-duration",
            "60",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_custom_text_coordinates_require_each_other() {
        let result = Cli::try_parse_from([
            "vidbatch", "process", "-i", "/in", "-o", "/out", "--text-x", "10",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_full_flag_surface_parses() {
        let cli = Cli::parse_from([
            "vidbatch",
            "process",
            "-i",
            "/in/clip.mp4",
            "-o",
            "/out",
            "--speed",
            "1.5",
            "--volume",
            "0.8",
            "--trim-start",
            "5",
            "--crop",
            "0:0:1280x720",
            "--scale",
            "640x360",
            "--codec",
            "hevc",
            "--crf",
            "20",
            "--preset",
            "slow",
            "--text",
            "DRAFT",
            "--font-size",
            "32",
            "--box",
            "--split-count",
            "3",
            "--process-parts",
            "--jobs",
            "2",
        ]);
        let Commands::Process(args) = cli.command;
        assert_eq!(args.speed, Some(1.5));
        assert_eq!(args.crop.as_deref(), Some("0:0:1280x720"));
        assert_eq!(args.codec.as_deref(), Some("hevc"));
        assert!(args.text_box);
        assert!(args.process_parts);
        assert_eq!(args.jobs, 2);
    }
}
