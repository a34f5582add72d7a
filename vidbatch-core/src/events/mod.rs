//! Queue and task lifecycle events.
//!
//! The queue emits these through an [`EventDispatcher`] so that frontends
//! (the CLI progress display, log files) can observe processing without the
//! core knowing anything about presentation.

use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum Event {
    /// Queue processing was started with this many runnable tasks.
    QueueStarted {
        total_tasks: usize,
    },

    /// Dispatch of new tasks was suspended; running tasks continue.
    QueuePaused,

    /// Dispatch of new tasks resumed.
    QueueResumed,

    /// A task's ffmpeg pipeline began executing.
    TaskStarted {
        index: usize,
        source: PathBuf,
        dest: PathBuf,
    },

    /// Periodic progress for a running task. `percent` is None when the
    /// source duration is unknown (indeterminate progress).
    TaskProgress {
        index: usize,
        percent: Option<f32>,
        out_time_secs: Option<f64>,
        speed: f32,
    },

    /// A task finished and produced its output file(s).
    TaskCompleted {
        index: usize,
        output: PathBuf,
    },

    /// A task failed; `stderr_tail` carries the last captured ffmpeg
    /// stderr lines for diagnosis.
    TaskFailed {
        index: usize,
        message: String,
        stderr_tail: Vec<String>,
    },

    /// A task was stopped by the user before completion.
    TaskCancelled {
        index: usize,
    },

    /// All tasks reached a terminal state.
    QueueCompleted {
        completed: usize,
        failed: usize,
        cancelled: usize,
    },

    /// Non-fatal condition worth surfacing (e.g. intermediate cleanup
    /// failure after a successful split).
    Warning {
        message: String,
    },
}

pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &Event);
}

/// Fans one event out to every registered handler, in registration order.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn emit(&self, event: Event) {
        for handler in &self.handlers {
            handler.handle(&event);
        }
    }
}
