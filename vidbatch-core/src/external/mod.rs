//! Interactions with the external ffmpeg and ffprobe binaries.
//!
//! Everything that spawns a process lives under this module; the rest of
//! the crate deals in argument lists and parsed results only.

use crate::error::{CoreError, CoreResult};
use std::io;
use std::process::{Command, Stdio};

pub mod ffmpeg;
pub mod ffprobe;

pub use ffmpeg::{run_invocation, CancelToken, RunOutcome};
pub use ffprobe::{probe_media, MediaInfo};

/// Checks that a required external command is present and executable by
/// probing it with `-version`.
pub fn check_dependency(cmd_name: &str) -> CoreResult<()> {
    let result = Command::new(cmd_name)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match result {
        Ok(_) => {
            log::debug!("Found dependency: {cmd_name}");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Dependency '{cmd_name}' not found");
            Err(CoreError::DependencyNotFound(cmd_name.to_string()))
        }
        Err(e) => {
            log::error!("Failed to start dependency check for '{cmd_name}': {e}");
            Err(CoreError::CommandStart(cmd_name.to_string(), e))
        }
    }
}

/// Verifies the full external toolchain before any processing starts.
pub fn check_required_tools() -> CoreResult<()> {
    check_dependency("ffmpeg")?;
    check_dependency("ffprobe")?;
    Ok(())
}
