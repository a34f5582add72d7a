// vidbatch-cli/src/lib.rs
//
// Library portion of the vidbatch CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod progress;

// Re-export items needed by the binary or integration tests
pub use cli::{Cli, Commands, ProcessArgs};
pub use commands::process::run_process;
