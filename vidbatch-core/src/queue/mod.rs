//! The task queue: ordered tasks, a dispatcher thread, and up to
//! `max_concurrent` worker threads running ffmpeg pipelines.
//!
//! All task state lives behind one `Mutex<QueueState>`; every lifecycle
//! transition goes through that lock, so observers always see a consistent
//! status and progress pair. Pausing withholds dispatch of further tasks;
//! tasks already running continue to completion.

pub mod task;
mod worker;

pub use task::{Task, TaskStatus};

use crate::error::{CoreError, CoreResult};
use crate::events::{Event, EventDispatcher};
use crate::external::ffmpeg::CancelToken;
use crate::settings::Snapshot;
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueueStatus {
    Idle,
    Running,
    Paused,
    Stopping,
}

pub(crate) struct QueueState {
    pub(crate) tasks: Vec<Task>,
    status: QueueStatus,
    /// Number of worker threads currently executing a task.
    pub(crate) active: usize,
    cancel: CancelToken,
}

impl QueueState {
    /// Applies a task status transition, refusing moves the state machine
    /// does not allow. Every status change goes through here.
    pub(crate) fn transition(&mut self, index: usize, next: TaskStatus) -> bool {
        let task = &mut self.tasks[index];
        if !task.status.can_transition_to(next) {
            log::warn!(
                "Task {index}: ignoring invalid transition {:?} -> {next:?}",
                task.status
            );
            return false;
        }
        task.status = next;
        true
    }
}

pub(crate) struct QueueInner {
    pub(crate) state: Mutex<QueueState>,
    pub(crate) condvar: Condvar,
    pub(crate) events: EventDispatcher,
    max_concurrent: usize,
}

pub(crate) fn lock_state(inner: &QueueInner) -> MutexGuard<'_, QueueState> {
    inner.state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Terminal counts reported when the queue drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueSummary {
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

/// Ordered batch of processing tasks with start/pause/resume/stop control.
pub struct TaskQueue {
    inner: Arc<QueueInner>,
    dispatcher: Option<JoinHandle<()>>,
}

impl TaskQueue {
    /// Creates an empty queue. `max_concurrent` caps simultaneous workers
    /// and is clamped to at least 1.
    #[must_use]
    pub fn new(max_concurrent: usize, events: EventDispatcher) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState {
                    tasks: Vec::new(),
                    status: QueueStatus::Idle,
                    active: 0,
                    cancel: CancelToken::new(),
                }),
                condvar: Condvar::new(),
                events,
                max_concurrent: max_concurrent.max(1),
            }),
            dispatcher: None,
        }
    }

    /// Appends a new pending task and returns its index. Tasks added while
    /// the queue is running are picked up by the dispatcher.
    pub fn enqueue(&self, source: PathBuf, dest: PathBuf, snapshot: Snapshot) -> usize {
        let index = {
            let mut state = lock_state(&self.inner);
            state.tasks.push(Task::new(source, dest, snapshot));
            state.tasks.len() - 1
        };
        self.inner.condvar.notify_all();
        index
    }

    /// Removes all tasks. Refused while the queue is running.
    pub fn clear(&self) -> CoreResult<()> {
        let mut state = lock_state(&self.inner);
        if state.status != QueueStatus::Idle {
            return Err(CoreError::Queue(
                "cannot clear tasks while the queue is running".to_string(),
            ));
        }
        state.tasks.clear();
        Ok(())
    }

    /// Replaces the snapshot of every non-terminal task. Refused while any
    /// task is running; this is the only way task settings change after
    /// enqueue.
    pub fn apply_snapshot_all(&self, snapshot: &Snapshot) -> CoreResult<()> {
        let mut state = lock_state(&self.inner);
        if state.tasks.iter().any(|t| t.status == TaskStatus::Running) {
            return Err(CoreError::Queue(
                "cannot re-apply settings while a task is running".to_string(),
            ));
        }
        for task in state
            .tasks
            .iter_mut()
            .filter(|t| !t.status.is_terminal())
        {
            task.snapshot = snapshot.clone();
        }
        Ok(())
    }

    /// Starts the dispatcher. No-op when already running; an error when
    /// there is nothing pending to do.
    pub fn start(&mut self) -> CoreResult<()> {
        let total_tasks = {
            let mut state = lock_state(&self.inner);
            if state.status != QueueStatus::Idle {
                return Ok(());
            }
            let pending = state
                .tasks
                .iter()
                .filter(|t| t.status == TaskStatus::Pending)
                .count();
            if pending == 0 {
                return Err(CoreError::Queue("no pending tasks to process".to_string()));
            }
            state.status = QueueStatus::Running;
            state.cancel = CancelToken::new();
            pending
        };

        // Reap a dispatcher left over from a previous drained run.
        if let Some(handle) = self.dispatcher.take() {
            let _ = handle.join();
        }

        self.inner.events.emit(Event::QueueStarted { total_tasks });
        let inner = Arc::clone(&self.inner);
        self.dispatcher = Some(std::thread::spawn(move || dispatch_loop(&inner)));
        Ok(())
    }

    /// Suspends dispatch of further tasks. Running tasks continue.
    pub fn pause(&self) -> CoreResult<()> {
        {
            let mut state = lock_state(&self.inner);
            if state.status != QueueStatus::Running {
                return Err(CoreError::Queue("queue is not running".to_string()));
            }
            state.status = QueueStatus::Paused;
            for index in 0..state.tasks.len() {
                if state.tasks[index].status == TaskStatus::Pending {
                    state.transition(index, TaskStatus::Paused);
                }
            }
        }
        self.inner.events.emit(Event::QueuePaused);
        Ok(())
    }

    /// Re-opens dispatch after a pause.
    pub fn resume(&self) -> CoreResult<()> {
        {
            let mut state = lock_state(&self.inner);
            if state.status != QueueStatus::Paused {
                return Err(CoreError::Queue("queue is not paused".to_string()));
            }
            state.status = QueueStatus::Running;
            for index in 0..state.tasks.len() {
                if state.tasks[index].status == TaskStatus::Paused {
                    state.transition(index, TaskStatus::Pending);
                }
            }
        }
        self.inner.condvar.notify_all();
        self.inner.events.emit(Event::QueueResumed);
        Ok(())
    }

    /// Stops processing: pending tasks become cancelled immediately, the
    /// running process is asked to quit and killed after a grace period.
    /// Partial output files are left in place.
    pub fn stop(&self) {
        let cancelled: Vec<usize> = {
            let mut state = lock_state(&self.inner);
            if state.status == QueueStatus::Idle {
                return;
            }
            state.status = QueueStatus::Stopping;
            state.cancel.cancel();
            let mut cancelled = Vec::new();
            for index in 0..state.tasks.len() {
                let waiting = matches!(
                    state.tasks[index].status,
                    TaskStatus::Pending | TaskStatus::Paused
                );
                if waiting && state.transition(index, TaskStatus::Cancelled) {
                    cancelled.push(index);
                }
            }
            cancelled
        };
        self.inner.condvar.notify_all();
        for index in cancelled {
            self.inner.events.emit(Event::TaskCancelled { index });
        }
    }

    /// Blocks until the dispatcher drains and returns the terminal counts.
    pub fn wait(&mut self) -> CoreResult<QueueSummary> {
        if let Some(handle) = self.dispatcher.take() {
            handle
                .join()
                .map_err(|_| CoreError::Queue("dispatcher thread panicked".to_string()))?;
        }
        Ok(summarize(&lock_state(&self.inner).tasks))
    }

    /// A consistent copy of all tasks, for display.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        lock_state(&self.inner).tasks.clone()
    }
}

fn summarize(tasks: &[Task]) -> QueueSummary {
    let mut summary = QueueSummary::default();
    for task in tasks {
        match task.status {
            TaskStatus::Completed => summary.completed += 1,
            TaskStatus::Failed => summary.failed += 1,
            TaskStatus::Cancelled => summary.cancelled += 1,
            _ => {}
        }
    }
    summary
}

enum Dispatch {
    Run(usize, CancelToken),
    Done,
}

fn next_dispatch(inner: &QueueInner) -> Dispatch {
    let mut state = lock_state(inner);
    loop {
        let stopping = state.status == QueueStatus::Stopping;
        let paused = state.status == QueueStatus::Paused;
        if !stopping && !paused && state.active < inner.max_concurrent {
            if let Some(index) = state
                .tasks
                .iter()
                .position(|t| t.status == TaskStatus::Pending)
            {
                state.transition(index, TaskStatus::Running);
                state.active += 1;
                return Dispatch::Run(index, state.cancel.clone());
            }
        }
        let runnable_left = state
            .tasks
            .iter()
            .any(|t| matches!(t.status, TaskStatus::Pending | TaskStatus::Paused));
        if state.active == 0 && (stopping || !runnable_left) {
            return Dispatch::Done;
        }
        state = inner
            .condvar
            .wait(state)
            .unwrap_or_else(PoisonError::into_inner);
    }
}

fn dispatch_loop(inner: &Arc<QueueInner>) {
    let mut workers = Vec::new();
    loop {
        match next_dispatch(inner) {
            Dispatch::Run(index, cancel) => {
                let worker_inner = Arc::clone(inner);
                workers.push(std::thread::spawn(move || {
                    worker::run_task(&worker_inner, index, &cancel);
                }));
            }
            Dispatch::Done => break,
        }
    }
    for handle in workers {
        let _ = handle.join();
    }

    let summary = {
        let mut state = lock_state(inner);
        state.status = QueueStatus::Idle;
        summarize(&state.tasks)
    };
    inner.events.emit(Event::QueueCompleted {
        completed: summary.completed,
        failed: summary.failed,
        cancelled: summary.cancelled,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn queue() -> TaskQueue {
        TaskQueue::new(1, EventDispatcher::new())
    }

    fn enqueue_missing(queue: &TaskQueue, name: &str) -> usize {
        queue.enqueue(
            Path::new("/nonexistent").join(name),
            Path::new("/nonexistent/out").join(name),
            Snapshot::default(),
        )
    }

    #[test]
    fn test_start_with_empty_queue_is_an_error() {
        let mut queue = queue();
        assert!(queue.start().is_err());
    }

    #[test]
    fn test_pause_and_resume_require_a_running_queue() {
        let queue = queue();
        assert!(queue.pause().is_err());
        assert!(queue.resume().is_err());
    }

    #[test]
    fn test_clear_on_idle_queue() {
        let queue = queue();
        enqueue_missing(&queue, "a.mp4");
        assert_eq!(queue.tasks().len(), 1);
        queue.clear().unwrap();
        assert!(queue.tasks().is_empty());
    }

    #[test]
    fn test_apply_snapshot_all_updates_pending_tasks() {
        let queue = queue();
        enqueue_missing(&queue, "a.mp4");
        enqueue_missing(&queue, "b.mp4");
        let snapshot = Snapshot {
            speed: 2.0,
            ..Default::default()
        };
        queue.apply_snapshot_all(&snapshot).unwrap();
        assert!(queue.tasks().iter().all(|t| t.snapshot.speed == 2.0));
    }

    #[test]
    fn test_missing_sources_fail_without_halting_the_queue() {
        // Compilation fails before any process is spawned, so this
        // exercises the full dispatch cycle without ffmpeg installed.
        let mut queue = queue();
        enqueue_missing(&queue, "a.mp4");
        enqueue_missing(&queue, "b.mp4");
        queue.start().unwrap();
        let summary = queue.wait().unwrap();
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.completed, 0);
        assert!(queue
            .tasks()
            .iter()
            .all(|t| t.status == TaskStatus::Failed && t.detail.is_some()));
    }

    #[test]
    fn test_stop_cancels_pending_tasks() {
        let queue = queue();
        enqueue_missing(&queue, "a.mp4");
        {
            let mut state = lock_state(&queue.inner);
            state.status = QueueStatus::Running;
        }
        queue.stop();
        assert!(queue
            .tasks()
            .iter()
            .all(|t| t.status == TaskStatus::Cancelled));
    }

    #[test]
    fn test_terminal_tasks_reject_further_transitions() {
        let queue = queue();
        enqueue_missing(&queue, "a.mp4");
        {
            let mut state = lock_state(&queue.inner);
            assert!(state.transition(0, TaskStatus::Running));
            assert!(state.transition(0, TaskStatus::Completed));
            assert!(!state.transition(0, TaskStatus::Running));
            assert!(!state.transition(0, TaskStatus::Cancelled));
        }
        {
            let mut state = lock_state(&queue.inner);
            state.status = QueueStatus::Running;
        }
        queue.stop();
        assert_eq!(queue.tasks()[0].status, TaskStatus::Completed);
    }

    #[test]
    fn test_queue_is_restartable_after_draining() {
        let mut queue = queue();
        enqueue_missing(&queue, "a.mp4");
        queue.start().unwrap();
        queue.wait().unwrap();
        enqueue_missing(&queue, "b.mp4");
        queue.start().unwrap();
        let summary = queue.wait().unwrap();
        assert_eq!(summary.failed, 2);
    }
}
