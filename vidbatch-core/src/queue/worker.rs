//! Worker execution of one task: probe, compile, run, and report the
//! terminal transition back through the queue lock.

use super::{lock_state, QueueInner, TaskStatus};
use crate::command::{self, CompiledCommand, MediaContext, SplitPlan};
use crate::error::{CoreError, CoreResult};
use crate::events::Event;
use crate::external::ffmpeg::{run_invocation, CancelToken, RunOutcome};
use crate::external::ffprobe::probe_media;
use crate::fonts;
use crate::progress::ProgressUpdate;
use crate::settings::Snapshot;
use std::path::Path;
use std::sync::Arc;

enum TaskOutcome {
    Completed,
    Cancelled,
}

pub(crate) fn run_task(inner: &Arc<QueueInner>, index: usize, cancel: &CancelToken) {
    let (source, dest, snapshot) = {
        let state = lock_state(inner);
        let task = &state.tasks[index];
        (task.source.clone(), task.dest.clone(), task.snapshot.clone())
    };
    inner.events.emit(Event::TaskStarted {
        index,
        source: source.clone(),
        dest: dest.clone(),
    });
    log::info!("Task {index}: processing {}", source.display());

    let result = process_task(inner, index, &source, &dest, &snapshot, cancel);

    let event = {
        let mut state = lock_state(inner);
        state.active -= 1;
        match result {
            Ok(TaskOutcome::Completed) => {
                state.transition(index, TaskStatus::Completed);
                state.tasks[index].progress = Some(100.0);
                Event::TaskCompleted {
                    index,
                    output: state.tasks[index].dest.clone(),
                }
            }
            Ok(TaskOutcome::Cancelled) => {
                state.transition(index, TaskStatus::Cancelled);
                Event::TaskCancelled { index }
            }
            Err(error) => {
                state.transition(index, TaskStatus::Failed);
                let message = error.to_string();
                state.tasks[index].detail = Some(message.clone());
                let stderr_tail = match &error {
                    CoreError::CommandFailed { stderr, .. } => {
                        stderr.lines().map(str::to_string).collect()
                    }
                    _ => Vec::new(),
                };
                Event::TaskFailed {
                    index,
                    message,
                    stderr_tail,
                }
            }
        }
    };
    inner.condvar.notify_all();
    inner.events.emit(event);
}

fn process_task(
    inner: &Arc<QueueInner>,
    index: usize,
    source: &Path,
    dest: &Path,
    snapshot: &Snapshot,
    cancel: &CancelToken,
) -> CoreResult<TaskOutcome> {
    let media = match probe_media(source) {
        Ok(info) => MediaContext {
            duration: info.duration,
            resolution: info.resolution(),
        },
        Err(error) => {
            inner.events.emit(Event::Warning {
                message: format!("could not probe {}: {error}", source.display()),
            });
            MediaContext::default()
        }
    };

    let default_font = fonts::resolve_default_font();
    let compiled = command::compile(snapshot, source, dest, &media, default_font.as_deref())?;

    match compiled {
        CompiledCommand::Single(invocation) => {
            let outcome = run_invocation(&invocation, media.duration, cancel, |update| {
                report_progress(inner, index, update);
            })?;
            Ok(match outcome {
                RunOutcome::Finished => TaskOutcome::Completed,
                RunOutcome::Cancelled => TaskOutcome::Cancelled,
            })
        }
        CompiledCommand::Split(plan) => run_split_plan(inner, index, &plan, cancel),
    }
}

fn report_progress(inner: &Arc<QueueInner>, index: usize, update: ProgressUpdate) {
    {
        let mut state = lock_state(inner);
        state.tasks[index].progress = update.percent;
    }
    inner.events.emit(Event::TaskProgress {
        index,
        percent: update.percent,
        out_time_secs: update.out_time_secs,
        speed: update.speed,
    });
}

/// Runs a split pipeline: all stream-copy slices first, then every part's
/// re-encode, then cleanup of intermediates. Cleanup always runs; a
/// cleanup failure is a warning, never a task failure.
fn run_split_plan(
    inner: &Arc<QueueInner>,
    index: usize,
    plan: &SplitPlan,
    cancel: &CancelToken,
) -> CoreResult<TaskOutcome> {
    let result = execute_split(inner, index, plan, cancel);
    for path in &plan.cleanup {
        if !path.exists() {
            continue;
        }
        if let Err(error) = std::fs::remove_file(path) {
            log::warn!("Failed to remove intermediate {}: {error}", path.display());
            inner.events.emit(Event::Warning {
                message: format!(
                    "could not remove intermediate file {}: {error}",
                    path.display()
                ),
            });
        }
    }
    result
}

fn execute_split(
    inner: &Arc<QueueInner>,
    index: usize,
    plan: &SplitPlan,
    cancel: &CancelToken,
) -> CoreResult<TaskOutcome> {
    for part in &plan.parts {
        match run_invocation(&part.copy, Some(part.range.length), cancel, |_| {})? {
            RunOutcome::Finished => {}
            RunOutcome::Cancelled => return Ok(TaskOutcome::Cancelled),
        }
    }

    let total_encodes = plan.parts.iter().filter(|p| p.encode.is_some()).count();
    let mut done = 0usize;
    for part in &plan.parts {
        let Some(encode) = &part.encode else { continue };
        let outcome = run_invocation(encode, Some(part.range.length), cancel, |update| {
            // fold per-part percent into overall task percent
            let percent = update
                .percent
                .map(|p| (done as f32).mul_add(100.0, p) / total_encodes as f32);
            report_progress(
                inner,
                index,
                ProgressUpdate {
                    percent,
                    out_time_secs: update.out_time_secs,
                    speed: update.speed,
                },
            );
        })?;
        match outcome {
            RunOutcome::Finished => done += 1,
            RunOutcome::Cancelled => return Ok(TaskOutcome::Cancelled),
        }
    }
    Ok(TaskOutcome::Completed)
}
