//! The command compiler: deterministically maps a settings [`Snapshot`]
//! plus a source/destination pair to the ffmpeg argument lists that
//! implement it.
//!
//! Compilation is pure string assembly over the snapshot and the probed
//! [`MediaContext`]; it spawns nothing. A snapshot with a split spec
//! compiles to an ordered plan of stream-copy slices and (optionally)
//! per-part re-encode invocations instead of a single command.

pub mod filter;
pub mod split;

use crate::error::{validation_error, CoreError, CoreResult};
use crate::settings::{Quality, Snapshot, Watermark, WatermarkKind};
use crate::utils::format_seconds_arg;
use filter::FilterChain;
use split::{SplitRange, part_intermediate_path, part_output_path, stream_copy_args};
use std::path::{Path, PathBuf};

/// Frame size assumed when the source was not (or could not be) probed.
pub const DEFAULT_FRAME: (u32, u32) = (1920, 1080);

/// Probed facts about the source the compiler may rely on.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaContext {
    /// Total source duration in seconds, when known.
    pub duration: Option<f64>,
    /// Source frame size, when known.
    pub resolution: Option<(u32, u32)>,
}

/// One ffmpeg invocation: the full argument list (program name excluded)
/// and the file it produces.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub args: Vec<String>,
    pub output: PathBuf,
}

/// One part of a split pipeline: the lossless slice, and the re-encode of
/// that slice when the snapshot asks for parts to be processed.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitPart {
    pub range: SplitRange,
    pub copy: Invocation,
    pub encode: Option<Invocation>,
}

/// Ordered split pipeline: every slice completes before any part is
/// re-encoded; `cleanup` lists the intermediate files to delete afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitPlan {
    pub parts: Vec<SplitPart>,
    pub cleanup: Vec<PathBuf>,
}

/// The compiler's output: one invocation, or an ordered split plan.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledCommand {
    Single(Invocation),
    Split(SplitPlan),
}

/// Compiles a snapshot into the command(s) that process `source` into
/// `dest`. Fails with a structured validation error when any snapshot
/// field is out of range or a referenced file is missing; never coerces.
pub fn compile(
    snapshot: &Snapshot,
    source: &Path,
    dest: &Path,
    ctx: &MediaContext,
    default_font: Option<&Path>,
) -> CoreResult<CompiledCommand> {
    snapshot.validate()?;

    if !source.is_file() {
        return Err(CoreError::FileNotFound(source.to_path_buf()));
    }
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            return Err(validation_error(format!(
                "output directory not found: {}",
                parent.display()
            )));
        }
    }
    if let (Some(crop), Some((width, height))) = (snapshot.crop, ctx.resolution) {
        if crop.x + crop.width > width || crop.y + crop.height > height {
            return Err(validation_error(format!(
                "crop region {}x{}+{}+{} exceeds source bounds {width}x{height}",
                crop.width, crop.height, crop.x, crop.y
            )));
        }
    }

    let Some(split_spec) = snapshot.split else {
        let invocation = compile_single(snapshot, source, dest, ctx, default_font)?;
        return Ok(CompiledCommand::Single(invocation));
    };

    // Splitting needs the real duration to plan ranges.
    let duration = ctx.duration.ok_or_else(|| {
        validation_error("source duration is required for splitting but could not be determined")
    })?;

    // A trim window narrows the span being split; the slices carry the
    // offset, so per-part snapshots must not re-apply the trim.
    let trim_start = snapshot.trim.and_then(|t| t.start).unwrap_or(0.0);
    let trim_end = snapshot
        .trim
        .and_then(|t| t.end)
        .unwrap_or(duration)
        .min(duration);
    let mut ranges = split::plan_ranges(split_spec.mode, trim_end - trim_start)?;
    for range in &mut ranges {
        range.start += trim_start;
    }

    let mut part_snapshot = snapshot.without_split();
    part_snapshot.trim = None;
    let mut parts = Vec::with_capacity(ranges.len());
    let mut cleanup = Vec::new();

    for (i, range) in ranges.iter().enumerate() {
        let index = i + 1;
        if split_spec.process_parts {
            let intermediate = part_intermediate_path(dest, index);
            let final_output = part_output_path(dest, index);
            let part_ctx = MediaContext {
                duration: Some(range.length),
                resolution: ctx.resolution,
            };
            let encode =
                compile_single(&part_snapshot, &intermediate, &final_output, &part_ctx, default_font)?;
            parts.push(SplitPart {
                range: *range,
                copy: Invocation {
                    args: stream_copy_args(source, *range, &intermediate),
                    output: intermediate.clone(),
                },
                encode: Some(encode),
            });
            cleanup.push(intermediate);
        } else {
            let output = part_output_path(dest, index);
            parts.push(SplitPart {
                range: *range,
                copy: Invocation {
                    args: stream_copy_args(source, *range, &output),
                    output,
                },
                encode: None,
            });
        }
    }

    Ok(CompiledCommand::Split(SplitPlan { parts, cleanup }))
}

/// Compiles the single-invocation form of a snapshot (no split fields).
fn compile_single(
    snapshot: &Snapshot,
    source: &Path,
    dest: &Path,
    ctx: &MediaContext,
    default_font: Option<&Path>,
) -> CoreResult<Invocation> {
    let frame = ctx.resolution.unwrap_or(DEFAULT_FRAME);
    let mut args: Vec<String> = Vec::new();

    // Input options: trim seeks before -i, hardware decode for NVENC.
    if let Some(trim) = &snapshot.trim {
        if let Some(start) = trim.start {
            args.push("-ss".to_string());
            args.push(format_seconds_arg(start));
        }
        if let Some(end) = trim.end {
            args.push("-to".to_string());
            args.push(format_seconds_arg(end));
        }
    }
    if snapshot.codec.is_gpu() {
        args.push("-hwaccel".to_string());
        args.push("cuda".to_string());
    }
    args.push("-i".to_string());
    args.push(source.to_string_lossy().to_string());

    let image_watermark = snapshot
        .watermark
        .as_ref()
        .filter(|w| w.is_active())
        .and_then(|w| match &w.kind {
            WatermarkKind::Image(path) => Some((path.clone(), w.position)),
            WatermarkKind::Text(_) => None,
        });

    // Fixed clause order: crop -> scale -> setpts -> watermark -> text -> subtitles.
    let pre_overlay = build_pre_overlay_chain(snapshot).build();
    let post_overlay = post_overlay_clauses(snapshot, frame, default_font)?;

    if let Some((image, position)) = image_watermark {
        args.push("-i".to_string());
        args.push(image.to_string_lossy().to_string());

        let mut graphs = Vec::new();
        let mut current = "[0:v]".to_string();
        if let Some(chain) = pre_overlay {
            graphs.push(format!("{current}{chain}[base]"));
            current = "[base]".to_string();
        }
        let (x, y) = filter::resolve_overlay_position(position);
        graphs.push(format!("{current}[1:v]overlay={x}:{y}[wm]"));
        current = "[wm]".to_string();
        if !post_overlay.is_empty() {
            graphs.push(format!("{current}{}[vout]", post_overlay.join(",")));
            current = "[vout]".to_string();
        }

        args.push("-filter_complex".to_string());
        args.push(graphs.join(";"));
        args.push("-map".to_string());
        args.push(current);
        // "0:a?" so audio-less sources still encode.
        args.push("-map".to_string());
        args.push("0:a?".to_string());
    } else {
        let mut chain = FilterChain::new();
        if let Some(pre) = pre_overlay {
            chain = chain.add(pre);
        }
        if let Some(watermark) = &snapshot.watermark {
            if let Some(clause) = build_watermark_clause(watermark, frame) {
                chain = chain.add(clause);
            }
        }
        for clause in post_overlay {
            chain = chain.add(clause);
        }
        if let Some(vf) = chain.build() {
            args.push("-vf".to_string());
            args.push(vf);
        }
    }

    // Audio filters: volume, then the atempo decomposition of speed.
    let audio_chain = build_audio_chain(snapshot);
    let audio_filtered = audio_chain.is_some();
    if let Some(af) = audio_chain {
        args.push("-af".to_string());
        args.push(af);
    }

    args.push("-c:v".to_string());
    args.push(snapshot.codec.encoder_name().to_string());
    match &snapshot.quality {
        Quality::Crf(crf) => {
            // NVENC takes -cq; the software encoders take -crf.
            args.push(if snapshot.codec.is_gpu() { "-cq" } else { "-crf" }.to_string());
            args.push(crf.to_string());
        }
        Quality::Bitrate(rate) => {
            let normalized = crate::settings::normalize_bitrate(rate)
                .ok_or_else(|| validation_error(format!("invalid bitrate: '{rate}'")))?;
            args.push("-b:v".to_string());
            args.push(normalized);
        }
    }
    args.push("-preset".to_string());
    args.push(snapshot.preset.as_str().to_string());

    if audio_filtered {
        args.push("-c:a".to_string());
        args.push("aac".to_string());
        args.push("-b:a".to_string());
        args.push("192k".to_string());
    } else {
        args.push("-c:a".to_string());
        args.push("copy".to_string());
    }

    args.push("-y".to_string());
    args.push(dest.to_string_lossy().to_string());

    Ok(Invocation {
        args,
        output: dest.to_path_buf(),
    })
}

/// Clauses that precede any watermark/overlay: crop, scale, setpts.
fn build_pre_overlay_chain(snapshot: &Snapshot) -> FilterChain {
    let mut chain = FilterChain::new();
    if let Some(crop) = &snapshot.crop {
        chain = chain.add(format!(
            "crop={}:{}:{}:{}",
            crop.width, crop.height, crop.x, crop.y
        ));
    }
    if let Some(scale) = &snapshot.scale {
        let name = if snapshot.codec.is_gpu() { "scale_cuda" } else { "scale" };
        chain = chain.add(format!("{name}={}:{}", scale.width, scale.height));
    }
    if snapshot.speed != 1.0 {
        chain = chain.add(format!("setpts={}*PTS", 1.0 / snapshot.speed));
    }
    chain
}

/// Clauses that follow the watermark: text overlay, then subtitles.
fn post_overlay_clauses(
    snapshot: &Snapshot,
    frame: (u32, u32),
    default_font: Option<&Path>,
) -> CoreResult<Vec<String>> {
    let mut clauses = Vec::new();
    if let Some(overlay) = &snapshot.text_overlay {
        if let Some(clause) = filter::build_drawtext(overlay, frame, default_font)? {
            clauses.push(clause);
        }
    }
    if let Some(subtitles) = &snapshot.subtitles {
        clauses.push(format!(
            "subtitles={}",
            filter::escape_subtitle_path(subtitles)
        ));
    }
    Ok(clauses)
}

fn build_watermark_clause(watermark: &Watermark, frame: (u32, u32)) -> Option<String> {
    if !watermark.is_active() {
        return None;
    }
    match &watermark.kind {
        WatermarkKind::Text(text) => {
            Some(filter::build_text_watermark(text, watermark.position, frame))
        }
        // Image watermarks go through the filter_complex path.
        WatermarkKind::Image(_) => None,
    }
}

fn build_audio_chain(snapshot: &Snapshot) -> Option<String> {
    let mut chain = FilterChain::new();
    if snapshot.volume != 1.0 {
        chain = chain.add(format!("volume={}", snapshot.volume));
    }
    for clause in filter::atempo_chain(snapshot.speed) {
        chain = chain.add(clause);
    }
    chain.build()
}
