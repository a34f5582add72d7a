// vidbatch-cli/src/progress.rs
//
// Terminal progress display: one indicatif bar per running task, driven by
// core queue events.

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use vidbatch_core::{format_bytes, format_duration, Event, EventHandler};

pub struct ProgressReporter {
    multi: MultiProgress,
    bars: Mutex<HashMap<usize, ProgressBar>>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{prefix:>24} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ")
    }

    fn println(&self, line: String) {
        let _ = self.multi.println(line);
    }

    fn bars(&self) -> MutexGuard<'_, HashMap<usize, ProgressBar>> {
        self.bars.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventHandler for ProgressReporter {
    fn handle(&self, event: &Event) {
        match event {
            Event::TaskStarted { index, source, .. } => {
                let bar = self.multi.add(ProgressBar::new(100));
                bar.set_style(Self::bar_style());
                bar.set_prefix(
                    source
                        .file_name()
                        .map_or_else(|| source.display().to_string(), |n| {
                            n.to_string_lossy().to_string()
                        }),
                );
                self.bars().insert(*index, bar);
            }
            Event::TaskProgress {
                index,
                percent,
                out_time_secs,
                speed,
            } => {
                if let Some(bar) = self.bars().get(index) {
                    bar.set_message(progress_message(*out_time_secs, *speed));
                    match percent {
                        Some(p) => bar.set_position(u64::from(*p as u32)),
                        None => bar.tick(),
                    }
                }
            }
            Event::TaskCompleted { index, output } => {
                if let Some(bar) = self.bars().remove(index) {
                    bar.set_position(100);
                    bar.finish_with_message(completion_message(output));
                }
            }
            Event::TaskFailed { index, message, .. } => {
                if let Some(bar) = self.bars().remove(index) {
                    bar.abandon_with_message(style("failed").red().to_string());
                }
                self.println(format!(
                    "{} task {index}: {message}",
                    style("error:").red().bold()
                ));
            }
            Event::TaskCancelled { index } => {
                if let Some(bar) = self.bars().remove(index) {
                    bar.abandon_with_message(style("cancelled").yellow().to_string());
                }
            }
            Event::Warning { message } => {
                self.println(format!("{} {message}", style("warning:").yellow()));
            }
            Event::QueuePaused => self.println(style("Queue paused").yellow().to_string()),
            Event::QueueResumed => self.println("Queue resumed".to_string()),
            _ => {}
        }
    }
}

/// Bar message while encoding: media time written so far, plus speed.
fn progress_message(out_time_secs: Option<f64>, speed: f32) -> String {
    match out_time_secs {
        Some(secs) => format!("{} {speed:.1}x", format_duration(secs)),
        None => format!("{speed:.1}x"),
    }
}

/// Bar message on completion: output size when the file is readable.
fn completion_message(output: &Path) -> String {
    let done = style("done").green().to_string();
    match std::fs::metadata(output) {
        Ok(meta) => format!("{done} ({})", format_bytes(meta.len())),
        Err(_) => done,
    }
}
