// vidbatch-cli/src/logging.rs
//
// Console and file logging via fern. The console stays terse (info and up,
// message only); the log file gets timestamped lines at debug level.

use std::path::{Path, PathBuf};
use vidbatch_core::CoreResult;

/// Returns the current local timestamp formatted as "YYYYMMDD_HHMMSS",
/// used for unique log file names.
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Initializes logging to the console and to a timestamped file inside
/// `log_dir`. Returns the log file path.
pub fn setup_logging(log_dir: &Path) -> CoreResult<PathBuf> {
    std::fs::create_dir_all(log_dir)?;
    let log_path = log_dir.join(format!("vidbatch_{}.log", get_timestamp()));

    let console = fern::Dispatch::new()
        .level(log::LevelFilter::Info)
        .format(|out, message, record| {
            out.finish(format_args!("[{}] {}", record.level(), message));
        })
        .chain(std::io::stderr());

    let file = fern::Dispatch::new()
        .level(log::LevelFilter::Debug)
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] [{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ));
        })
        .chain(fern::log_file(&log_path)?);

    fern::Dispatch::new()
        .chain(console)
        .chain(file)
        .apply()
        .map_err(|e| {
            vidbatch_core::CoreError::Validation(format!("failed to initialize logging: {e}"))
        })?;

    Ok(log_path)
}
