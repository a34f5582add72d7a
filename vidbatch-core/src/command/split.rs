//! Split planning: partitioning a source into contiguous time ranges and
//! naming the per-part output files.
//!
//! Parts are cut with a lossless stream copy (`-c copy`) using fast input
//! seeking; re-encoding of parts, when requested, happens as a separate
//! per-part invocation compiled from the snapshot without its split fields.

use crate::error::{validation_error, CoreResult};
use crate::settings::SplitMode;
use crate::utils::format_seconds_arg;
use std::path::{Path, PathBuf};

/// One contiguous slice of the source timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitRange {
    /// Start offset in seconds.
    pub start: f64,
    /// Slice length in seconds, always > 0.
    pub length: f64,
}

/// Computes the ordered, contiguous, non-overlapping ranges covering the
/// whole source for the given split mode.
///
/// By-count folds the rounding remainder into the last part; by-duration
/// gives ceil(T/D) parts with a shorter (but never zero-length) final part.
pub fn plan_ranges(mode: SplitMode, total_duration: f64) -> CoreResult<Vec<SplitRange>> {
    if !total_duration.is_finite() || total_duration <= 0.0 {
        return Err(validation_error(format!(
            "cannot split source with duration {total_duration}"
        )));
    }

    match mode {
        SplitMode::ByCount(n) => {
            let count = n as usize;
            let part_len = total_duration / n as f64;
            let mut ranges = Vec::with_capacity(count);
            for i in 0..count {
                let start = i as f64 * part_len;
                let end = if i == count - 1 {
                    total_duration
                } else {
                    (i + 1) as f64 * part_len
                };
                ranges.push(SplitRange {
                    start,
                    length: end - start,
                });
            }
            Ok(ranges)
        }
        SplitMode::ByDuration(part_len) => {
            if !part_len.is_finite() || part_len <= 0.0 {
                return Err(validation_error(format!(
                    "split part duration must be positive, got {part_len}"
                )));
            }
            let mut ranges = Vec::new();
            let mut start = 0.0;
            while start < total_duration {
                let length = (total_duration - start).min(part_len);
                ranges.push(SplitRange { start, length });
                start += part_len;
            }
            Ok(ranges)
        }
    }
}

/// Deterministic name for a final split part, placed next to `dest`:
/// `{stem}_part{NNN}{ext}` with a 1-based, zero-padded index.
#[must_use]
pub fn part_output_path(dest: &Path, index: usize) -> PathBuf {
    part_path_with_infix(dest, index, "")
}

/// Deterministic name for an intermediate stream-copy part that will be
/// re-encoded and then deleted: `{stem}_part{NNN}.tmp{ext}`.
#[must_use]
pub fn part_intermediate_path(dest: &Path, index: usize) -> PathBuf {
    part_path_with_infix(dest, index, ".tmp")
}

fn part_path_with_infix(dest: &Path, index: usize, infix: &str) -> PathBuf {
    let stem = dest
        .file_stem()
        .map_or_else(|| "output".to_string(), |s| s.to_string_lossy().to_string());
    let ext = dest
        .extension()
        .map_or_else(String::new, |e| format!(".{}", e.to_string_lossy()));
    let name = format!("{stem}_part{index:03}{infix}{ext}");
    dest.with_file_name(name)
}

/// Builds the argument list for one lossless stream-copy slice.
/// `-ss` precedes `-i` for fast input seeking.
#[must_use]
pub fn stream_copy_args(source: &Path, range: SplitRange, output: &Path) -> Vec<String> {
    vec![
        "-ss".to_string(),
        format_seconds_arg(range.start),
        "-i".to_string(),
        source.to_string_lossy().to_string(),
        "-t".to_string(),
        format_seconds_arg(range.length),
        "-c".to_string(),
        "copy".to_string(),
        "-avoid_negative_ts".to_string(),
        "1".to_string(),
        "-y".to_string(),
        output.to_string_lossy().to_string(),
    ]
}
