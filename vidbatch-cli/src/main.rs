// vidbatch-cli/src/main.rs
//
// Entry point: parses arguments, initializes logging, runs the selected
// command, and maps the outcome to the process exit code.

use clap::Parser;
use console::style;
use std::process;
use vidbatch_cli::logging::setup_logging;
use vidbatch_cli::{run_process, Cli, Commands};

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Process(args) => {
            let log_dir = args
                .log_dir
                .clone()
                .unwrap_or_else(|| args.output_dir.join("logs"));
            match setup_logging(&log_dir) {
                Ok(log_path) => log::info!("Log file: {}", log_path.display()),
                Err(e) => eprintln!("Warning: could not initialize file logging: {e}"),
            }

            match run_process(&args) {
                Ok(true) => process::exit(0),
                Ok(false) => process::exit(1),
                Err(e) => {
                    log::error!("{e}");
                    eprintln!("{} {e}", style("Error:").red().bold());
                    process::exit(2);
                }
            }
        }
    }
}
