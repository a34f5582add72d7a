//! Core library for batch video processing with ffmpeg and ffprobe.
//!
//! This crate compiles immutable settings snapshots into ffmpeg argument
//! lists (trim, crop, scale, speed, codecs, watermarks, text overlays,
//! subtitles, splitting) and runs them through a pausable task queue with
//! per-task progress reporting.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use vidbatch_core::events::EventDispatcher;
//! use vidbatch_core::queue::TaskQueue;
//! use vidbatch_core::settings::Snapshot;
//! use std::path::PathBuf;
//!
//! let snapshot = Snapshot {
//!     speed: 1.5,
//!     ..Default::default()
//! };
//! snapshot.validate().unwrap();
//!
//! let mut queue = TaskQueue::new(1, EventDispatcher::new());
//! queue.enqueue(
//!     PathBuf::from("/videos/input.mp4"),
//!     PathBuf::from("/videos/out/input.mp4"),
//!     snapshot,
//! );
//! queue.start().unwrap();
//! let summary = queue.wait().unwrap();
//! println!("{} completed", summary.completed);
//! ```

pub mod command;
pub mod discovery;
pub mod error;
pub mod events;
pub mod external;
pub mod fonts;
pub mod progress;
pub mod queue;
pub mod settings;
pub mod utils;

// Re-exports for public API
pub use command::{compile, CompiledCommand, Invocation, MediaContext, SplitPlan};
pub use discovery::find_processable_files;
pub use error::{CoreError, CoreResult};
pub use events::{Event, EventDispatcher, EventHandler};
pub use external::{check_dependency, check_required_tools, probe_media, MediaInfo};
pub use progress::{parse_ffmpeg_time, ProgressUpdate};
pub use queue::{QueueSummary, Task, TaskQueue, TaskStatus};
pub use settings::Snapshot;
pub use utils::{format_bytes, format_duration};
