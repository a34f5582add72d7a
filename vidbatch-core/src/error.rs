//! Error types shared across the vidbatch core library.

use std::path::PathBuf;
use thiserror::Error;

/// Custom error types for vidbatch operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Required external tool not found: {0}")]
    DependencyNotFound(String),

    #[error("Failed to start command '{0}': {1}")]
    CommandStart(String, std::io::Error),

    #[error("Command '{cmd}' failed (status {status}): {stderr}")]
    CommandFailed {
        cmd: String,
        status: String,
        stderr: String,
    },

    #[error("ffprobe parse error: {0}")]
    FfprobeParse(String),

    #[error("No video stream information: {0}")]
    VideoInfoError(String),

    #[error("No processable video files found")]
    NoFilesFound,

    #[error("Invalid path: {0}")]
    PathError(String),

    #[error("Referenced file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Queue error: {0}")]
    Queue(String),
}

/// Result type for vidbatch operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Builds a `CommandFailed` error from an exit status and captured stderr.
pub fn command_failed_error(
    cmd: impl Into<String>,
    status: std::process::ExitStatus,
    stderr: impl Into<String>,
) -> CoreError {
    CoreError::CommandFailed {
        cmd: cmd.into(),
        status: status
            .code()
            .map_or_else(|| "signal".to_string(), |c| c.to_string()),
        stderr: stderr.into(),
    }
}

/// Builds a `CommandStart` error for a spawn failure.
pub fn command_start_error(cmd: impl Into<String>, err: std::io::Error) -> CoreError {
    CoreError::CommandStart(cmd.into(), err)
}

/// Convenience constructor for validation errors.
pub fn validation_error(msg: impl Into<String>) -> CoreError {
    CoreError::Validation(msg.into())
}
