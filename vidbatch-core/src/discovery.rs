//! File discovery: finding video files eligible for processing.
//!
//! Scans the top level of a directory for common video container
//! extensions (case-insensitive). Subdirectories are not searched.

use crate::error::{CoreError, CoreResult};
use std::path::{Path, PathBuf};

/// Extensions recognized as processable video containers.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "avi", "webm", "m4v"];

/// Finds video files eligible for processing in the specified directory,
/// sorted by path for deterministic ordering.
///
/// # Returns
///
/// * `Ok(Vec<PathBuf>)` - paths of the discovered video files
/// * `Err(CoreError::NoFilesFound)` - when the directory holds none
pub fn find_processable_files(input_dir: &Path) -> CoreResult<Vec<PathBuf>> {
    let read_dir = std::fs::read_dir(input_dir)?;
    let mut files: Vec<PathBuf> = read_dir
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let path = entry.path();

            if !path.is_file() {
                return None;
            }

            path.extension()
                .and_then(|ext| ext.to_str())
                .filter(|ext| {
                    VIDEO_EXTENSIONS
                        .iter()
                        .any(|known| ext.eq_ignore_ascii_case(known))
                })
                .map(|_| path.clone())
        })
        .collect();

    if files.is_empty() {
        return Err(CoreError::NoFilesFound);
    }
    files.sort();
    Ok(files)
}
