//! Running compiled ffmpeg invocations: spawning, progress event handling,
//! stderr capture, and cooperative cancellation.

use crate::command::Invocation;
use crate::error::{command_failed_error, command_start_error, CoreResult};
use crate::progress::ProgressUpdate;
use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::FfmpegEvent;
use std::collections::VecDeque;
use std::process::ExitStatus;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How many stderr lines are retained while a command runs.
const STDERR_RING_CAPACITY: usize = 50;
/// How many of the retained lines are attached to a failure report.
const STDERR_REPORT_LINES: usize = 20;
/// How long a stopped process gets to exit after `q` before being killed.
const STOP_GRACE: Duration = Duration::from_secs(2);

/// Shared cancellation flag checked between ffmpeg events.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The process ran to completion and exited successfully.
    Finished,
    /// The process was stopped via the cancel token before finishing.
    Cancelled,
}

/// Runs one compiled invocation to completion, reporting progress through
/// the callback and honoring the cancel token between events.
///
/// A cancelled process is first asked to stop gracefully (ffmpeg's `q`
/// command), then killed after a short grace period. If the process had
/// already exited successfully by the time the stop landed, the run counts
/// as [`RunOutcome::Finished`].
pub fn run_invocation<F>(
    invocation: &Invocation,
    total_duration: Option<f64>,
    cancel: &CancelToken,
    mut on_progress: F,
) -> CoreResult<RunOutcome>
where
    F: FnMut(ProgressUpdate),
{
    let mut cmd = FfmpegCommand::new();
    cmd.args(invocation.args.iter().map(String::as_str));
    log::debug!("Running ffmpeg command: {cmd:?}");

    let mut child = cmd
        .spawn()
        .map_err(|e| command_start_error("ffmpeg", e))?;

    let mut stderr_ring: VecDeque<String> = VecDeque::with_capacity(STDERR_RING_CAPACITY);
    let mut push_line = |ring: &mut VecDeque<String>, line: String| {
        if ring.len() == STDERR_RING_CAPACITY {
            ring.pop_front();
        }
        ring.push_back(line);
    };

    let iterator = child.iter().map_err(|e| {
        log::error!("Failed to get ffmpeg event iterator: {e}");
        command_failed_error("ffmpeg", ExitStatus::default(), e.to_string())
    })?;

    for event in iterator {
        if cancel.is_cancelled() {
            break;
        }
        match event {
            FfmpegEvent::Progress(progress) => {
                on_progress(ProgressUpdate::from_out_time(
                    &progress.time,
                    total_duration,
                    progress.speed,
                ));
            }
            FfmpegEvent::Log(_, line) | FfmpegEvent::Error(line) => {
                if !is_non_critical_message(&line) {
                    push_line(&mut stderr_ring, line);
                }
            }
            _ => {}
        }
    }

    let status = if cancel.is_cancelled() {
        stop_child(&mut child)?
    } else {
        child.wait()?
    };

    if status.success() {
        return Ok(RunOutcome::Finished);
    }
    if cancel.is_cancelled() {
        return Ok(RunOutcome::Cancelled);
    }

    let tail: Vec<&str> = stderr_ring
        .iter()
        .rev()
        .take(STDERR_REPORT_LINES)
        .map(String::as_str)
        .collect();
    let stderr_tail: Vec<&str> = tail.into_iter().rev().collect();
    log::error!("ffmpeg failed with status {status}");
    Err(command_failed_error(
        "ffmpeg",
        status,
        stderr_tail.join("\n"),
    ))
}

/// Stops a running child: graceful `q` first, then a hard kill after the
/// grace period. Returns the final exit status.
fn stop_child(child: &mut FfmpegChild) -> CoreResult<ExitStatus> {
    if let Err(e) = child.quit() {
        log::debug!("Failed to send quit to ffmpeg: {e}");
    }

    let deadline = Instant::now() + STOP_GRACE;
    loop {
        if let Some(status) = child.as_inner_mut().try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    log::warn!("ffmpeg did not exit within the stop grace period, killing");
    child.kill()?;
    Ok(child.wait()?)
}

/// ffmpeg messages that appear in stderr but don't indicate actual problems.
fn is_non_critical_message(message: &str) -> bool {
    message.contains("deprecated pixel format")
        || message.contains("No accelerated colorspace conversion")
        || message.contains("automatically inserted filter")
        || message.contains("Timestamps are unset")
        || message.contains("Queue input is backward")
        || message.contains("Past duration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_round_trip() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        let shared = token.clone();
        shared.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_noise_filter() {
        assert!(is_non_critical_message(
            "deprecated pixel format used, make sure you did set range correctly"
        ));
        assert!(!is_non_critical_message("No such file or directory"));
    }
}
