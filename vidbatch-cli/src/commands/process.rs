//! Implementation of the 'process' subcommand: snapshot assembly from the
//! settings file and flag overrides, file discovery, and queue execution.

use crate::cli::ProcessArgs;
use crate::progress::ProgressReporter;
use console::style;
use log::{debug, info};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use vidbatch_core::settings::{
    CropRect, EncoderPreset, Position, Quality, ScaleTarget, Snapshot, SplitMode, SplitSpec,
    TextBox, VideoCodec, Watermark, WatermarkKind,
};
use vidbatch_core::{
    discovery, CoreError, CoreResult, EventDispatcher, TaskQueue, TaskStatus,
};

/// Runs the process command. Returns true when every task completed.
pub fn run_process(args: &ProcessArgs) -> CoreResult<bool> {
    vidbatch_core::check_required_tools()?;
    info!("External dependency check passed");

    let files = discover_input_files(args)?;
    info!("Found {} file(s) to process", files.len());

    fs::create_dir_all(&args.output_dir)?;
    let snapshot = build_snapshot(args)?;
    snapshot.validate()?;
    debug!("Settings snapshot: {snapshot:?}");

    let mut events = EventDispatcher::new();
    events.add_handler(Arc::new(ProgressReporter::new()));
    let mut queue = TaskQueue::new(args.jobs, events);

    for source in &files {
        let dest = output_path_for(args, source)?;
        queue.enqueue(source.clone(), dest, snapshot.clone());
    }

    queue.start()?;
    let summary = queue.wait()?;
    print_summary(&queue);

    Ok(summary.completed == files.len())
}

/// Resolves the input path to the list of files to process: a directory is
/// scanned for video files, a single file is taken as-is.
fn discover_input_files(args: &ProcessArgs) -> CoreResult<Vec<PathBuf>> {
    let input_path = args.input_path.canonicalize().map_err(|e| {
        CoreError::PathError(format!(
            "Invalid input path '{}': {e}",
            args.input_path.display()
        ))
    })?;

    if input_path.is_dir() {
        return discovery::find_processable_files(&input_path);
    }
    if input_path.is_file() {
        let recognized = input_path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                discovery::VIDEO_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });
        if !recognized {
            return Err(CoreError::PathError(format!(
                "Input file '{}' is not a recognized video container",
                input_path.display()
            )));
        }
        return Ok(vec![input_path]);
    }
    Err(CoreError::PathError(format!(
        "Input path '{}' is neither a file nor a directory",
        input_path.display()
    )))
}

fn output_path_for(args: &ProcessArgs, source: &PathBuf) -> CoreResult<PathBuf> {
    let name = source.file_name().ok_or_else(|| {
        CoreError::PathError(format!("Cannot determine file name of '{}'", source.display()))
    })?;
    let dest = args.output_dir.join(name);
    if fs::canonicalize(&dest).is_ok_and(|d| {
        fs::canonicalize(source).is_ok_and(|s| d == s)
    }) {
        return Err(CoreError::Validation(format!(
            "output would overwrite input: {}",
            source.display()
        )));
    }
    Ok(dest)
}

/// Builds the settings snapshot: the --settings file (when given) provides
/// the base, then every explicit flag overrides its field.
pub fn build_snapshot(args: &ProcessArgs) -> CoreResult<Snapshot> {
    let mut snapshot = match &args.settings {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            serde_json::from_str(&text).map_err(|e| {
                CoreError::Validation(format!(
                    "invalid settings file '{}': {e}",
                    path.display()
                ))
            })?
        }
        None => Snapshot::default(),
    };

    if let Some(speed) = args.speed {
        snapshot.speed = speed;
    }
    if let Some(volume) = args.volume {
        snapshot.volume = volume;
    }

    if args.trim_start.is_some() || args.trim_end.is_some() {
        let mut trim = snapshot.trim.unwrap_or_default();
        if args.trim_start.is_some() {
            trim.start = args.trim_start;
        }
        if args.trim_end.is_some() {
            trim.end = args.trim_end;
        }
        snapshot.trim = Some(trim);
    }

    if let Some(crop) = &args.crop {
        snapshot.crop = Some(parse_crop(crop)?);
    }
    if let Some(scale) = &args.scale {
        let (width, height) = parse_dimensions(scale)?;
        snapshot.scale = Some(ScaleTarget { width, height });
    }

    if let Some(codec) = &args.codec {
        snapshot.codec = parse_codec(codec)?;
    }
    if let Some(crf) = args.crf {
        snapshot.quality = Quality::Crf(crf);
    } else if let Some(bitrate) = &args.bitrate {
        snapshot.quality = Quality::Bitrate(bitrate.clone());
    }
    if let Some(preset) = &args.preset {
        snapshot.preset = parse_preset(preset)?;
    }

    if args.watermark_text.is_some() || args.watermark_image.is_some() {
        let kind = match (&args.watermark_text, &args.watermark_image) {
            (Some(text), _) => WatermarkKind::Text(text.clone()),
            (None, Some(image)) => WatermarkKind::Image(image.clone()),
            (None, None) => unreachable!(),
        };
        let position = match &args.watermark_position {
            Some(p) => parse_position(p)?,
            None => Position::TopLeft,
        };
        snapshot.watermark = Some(Watermark {
            enabled: true,
            kind,
            position,
        });
    }

    if args.text.is_some() {
        let mut overlay = snapshot.text_overlay.take().unwrap_or_default();
        if let Some(text) = &args.text {
            overlay.enabled = true;
            overlay.text = text.clone();
        }
        if args.font.is_some() {
            overlay.font_path = args.font.clone();
        }
        if let Some(size) = args.font_size {
            overlay.font_size = size;
        }
        if let Some(color) = &args.font_color {
            overlay.font_color = color.clone();
        }
        if let Some(color) = &args.outline_color {
            overlay.outline_color = color.clone();
        }
        if let Some(width) = args.outline_width {
            overlay.outline_width = width;
        }
        if args.text_box {
            overlay.text_box = Some(TextBox {
                color: args
                    .box_color
                    .clone()
                    .unwrap_or_else(|| "#000000".to_string()),
                opacity: args.box_opacity.unwrap_or(0.5),
            });
        }
        if let Some(position) = &args.text_position {
            overlay.position = parse_position(position)?;
        } else if let (Some(x), Some(y)) = (args.text_x, args.text_y) {
            overlay.position = Position::Custom { x, y };
        }
        snapshot.text_overlay = Some(overlay);
    }

    if let Some(subtitles) = &args.subtitles {
        snapshot.subtitles = Some(subtitles.clone());
    }

    let split_mode = match (args.split_count, args.split_duration) {
        (Some(count), _) => Some(SplitMode::ByCount(count)),
        (None, Some(duration)) => Some(SplitMode::ByDuration(duration)),
        (None, None) => None,
    };
    if let Some(mode) = split_mode {
        snapshot.split = Some(SplitSpec {
            mode,
            process_parts: args.process_parts,
        });
    }

    Ok(snapshot)
}

fn parse_position(value: &str) -> CoreResult<Position> {
    match value.to_lowercase().replace('_', "-").as_str() {
        "top-left" => Ok(Position::TopLeft),
        "top-right" => Ok(Position::TopRight),
        "bottom-left" => Ok(Position::BottomLeft),
        "bottom-right" => Ok(Position::BottomRight),
        "center" => Ok(Position::Center),
        other => Err(CoreError::Validation(format!(
            "unknown position '{other}' (expected top-left, top-right, bottom-left, bottom-right or center)"
        ))),
    }
}

fn parse_codec(value: &str) -> CoreResult<VideoCodec> {
    match value.to_lowercase().replace('_', "-").as_str() {
        "h264" | "x264" => Ok(VideoCodec::H264),
        "hevc" | "h265" | "x265" => Ok(VideoCodec::Hevc),
        "h264-nvenc" => Ok(VideoCodec::H264Nvenc),
        "hevc-nvenc" => Ok(VideoCodec::HevcNvenc),
        other => Err(CoreError::Validation(format!("unknown codec '{other}'"))),
    }
}

fn parse_preset(value: &str) -> CoreResult<EncoderPreset> {
    match value.to_lowercase().as_str() {
        "ultrafast" => Ok(EncoderPreset::Ultrafast),
        "superfast" => Ok(EncoderPreset::Superfast),
        "veryfast" => Ok(EncoderPreset::Veryfast),
        "faster" => Ok(EncoderPreset::Faster),
        "fast" => Ok(EncoderPreset::Fast),
        "medium" => Ok(EncoderPreset::Medium),
        "slow" => Ok(EncoderPreset::Slow),
        "slower" => Ok(EncoderPreset::Slower),
        "veryslow" => Ok(EncoderPreset::Veryslow),
        other => Err(CoreError::Validation(format!("unknown preset '{other}'"))),
    }
}

/// Parses "WxH" into a dimension pair.
fn parse_dimensions(value: &str) -> CoreResult<(u32, u32)> {
    let invalid = || {
        CoreError::Validation(format!(
            "invalid dimensions '{value}' (expected WxH, e.g. 1280x720)"
        ))
    };
    let (w, h) = value.split_once(['x', 'X']).ok_or_else(invalid)?;
    Ok((
        w.trim().parse().map_err(|_| invalid())?,
        h.trim().parse().map_err(|_| invalid())?,
    ))
}

/// Parses "X:Y:WxH" into a crop rectangle.
fn parse_crop(value: &str) -> CoreResult<CropRect> {
    let invalid = || {
        CoreError::Validation(format!(
            "invalid crop '{value}' (expected X:Y:WxH, e.g. 0:0:1280x720)"
        ))
    };
    let mut parts = value.splitn(3, ':');
    let x = parts
        .next()
        .and_then(|p| p.trim().parse().ok())
        .ok_or_else(invalid)?;
    let y = parts
        .next()
        .and_then(|p| p.trim().parse().ok())
        .ok_or_else(invalid)?;
    let (width, height) = parse_dimensions(parts.next().ok_or_else(invalid)?)?;
    Ok(CropRect {
        x,
        y,
        width,
        height,
    })
}

fn print_summary(queue: &TaskQueue) {
    let tasks = queue.tasks();
    println!("\n{}", style("Processing summary").bold());
    for task in &tasks {
        let name = task
            .source
            .file_name()
            .map_or_else(|| task.source.display().to_string(), |n| {
                n.to_string_lossy().to_string()
            });
        let status = match task.status {
            TaskStatus::Completed => style("completed").green().to_string(),
            TaskStatus::Failed => style("failed").red().to_string(),
            TaskStatus::Cancelled => style("cancelled").yellow().to_string(),
            other => format!("{other:?}").to_lowercase(),
        };
        match &task.detail {
            Some(detail) => println!("  {name:<40} {status}  ({detail})"),
            None => println!("  {name:<40} {status}"),
        }
    }
    let completed = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count();
    println!(
        "{} of {} file(s) processed successfully",
        completed,
        tasks.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn args_from(argv: &[&str]) -> ProcessArgs {
        let mut full = vec!["vidbatch", "process", "-i", "/in", "-o", "/out"];
        full.extend_from_slice(argv);
        let Commands::Process(args) = Cli::parse_from(full).command;
        args
    }

    #[test]
    fn test_parse_crop() {
        let crop = parse_crop("10:20:1280x720").unwrap();
        assert_eq!(
            crop,
            CropRect {
                x: 10,
                y: 20,
                width: 1280,
                height: 720
            }
        );
        assert!(parse_crop("1280x720").is_err());
        assert!(parse_crop("a:b:cxd").is_err());
    }

    #[test]
    fn test_parse_dimensions() {
        assert_eq!(parse_dimensions("1280x720").unwrap(), (1280, 720));
        assert_eq!(parse_dimensions("640X360").unwrap(), (640, 360));
        assert!(parse_dimensions("1280").is_err());
    }

    #[test]
    fn test_parse_position_aliases() {
        assert_eq!(parse_position("bottom-right").unwrap(), Position::BottomRight);
        assert_eq!(parse_position("TOP_LEFT").unwrap(), Position::TopLeft);
        assert!(parse_position("middle").is_err());
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = args_from(&["--speed", "2.0", "--codec", "hevc-nvenc", "--crf", "28"]);
        let snapshot = build_snapshot(&args).unwrap();
        assert_eq!(snapshot.speed, 2.0);
        assert_eq!(snapshot.codec, VideoCodec::HevcNvenc);
        assert_eq!(snapshot.quality, Quality::Crf(28));
    }

    #[test]
    fn test_text_overlay_assembly() {
        let args = args_from(&[
            "--text",
            "DRAFT",
            "--font-size",
            "64",
            "--box",
            "--box-opacity",
            "0.8",
            "--text-x",
            "15",
            "--text-y",
            "25",
        ]);
        let snapshot = build_snapshot(&args).unwrap();
        let overlay = snapshot.text_overlay.unwrap();
        assert!(overlay.enabled);
        assert_eq!(overlay.text, "DRAFT");
        assert_eq!(overlay.font_size, 64);
        assert_eq!(overlay.position, Position::Custom { x: 15, y: 25 });
        assert_eq!(overlay.text_box.unwrap().opacity, 0.8);
    }

    #[test]
    fn test_settings_file_provides_base_for_flag_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"speed": 1.5, "volume": 0.5}"#).unwrap();

        let mut args = args_from(&["--volume", "2.0"]);
        args.settings = Some(path);
        let snapshot = build_snapshot(&args).unwrap();
        assert_eq!(snapshot.speed, 1.5);
        assert_eq!(snapshot.volume, 2.0);
    }

    #[test]
    fn test_split_flags() {
        let args = args_from(&["--split-count", "4", "--process-parts"]);
        let snapshot = build_snapshot(&args).unwrap();
        assert_eq!(
            snapshot.split,
            Some(SplitSpec {
                mode: SplitMode::ByCount(4),
                process_parts: true
            })
        );
    }
}
