//! Demo CLI for defergate.
//!
//! # Usage
//!
//! ```bash
//! defergate-demo files <path>...
//! defergate-demo race [mutexes] [threads]
//! ```
//!
//! Logging is configured with `DEFERGATE_LOG` (filter directives, default
//! `info`) and `DEFERGATE_LOG_FORMAT` (`pretty`, `compact` or `json`).

#![expect(
    clippy::print_stdout,
    clippy::print_stderr,
    reason = "the demo binary reports to the terminal"
)]

use std::path::PathBuf;
use std::process::ExitCode;

use defergate_demos::{DemoError, RaceConfig, run_files, run_race};
use defergate_tracing::TracingConfig;

fn usage() -> ExitCode {
    eprintln!("Usage: defergate-demo files <path>...");
    eprintln!("       defergate-demo race [mutexes] [threads]");
    ExitCode::FAILURE
}

fn parse_count(arg: Option<&String>, default: usize, what: &str) -> Result<usize, String> {
    match arg {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e| format!("invalid {what} count '{raw}': {e}")),
    }
}

fn files(paths: &[String]) -> Result<(), DemoError> {
    let paths: Vec<PathBuf> = paths.iter().map(PathBuf::from).collect();
    let report = run_files(&paths)?;
    for (path, line) in paths.iter().zip(report.lines()) {
        println!("{}: {line}", path.display());
    }
    Ok(())
}

fn race(config: &RaceConfig) -> Result<(), DemoError> {
    let report = run_race(config)?;
    for worker in report.workers() {
        println!("worker {} acquired all mutexes after {} retries", worker.worker, worker.retries);
    }
    println!("total retries: {}", report.total_retries());
    Ok(())
}

fn main() -> ExitCode {
    TracingConfig::from_env().init();

    let args: Vec<String> = std::env::args().collect();
    let Some(command) = args.get(1) else {
        return usage();
    };

    let result = match command.as_str() {
        "files" if args.len() > 2 => files(&args[2..]),
        "race" => {
            let defaults = RaceConfig::default();
            let mutexes = parse_count(args.get(2), defaults.mutexes(), "mutex");
            let threads = parse_count(args.get(3), defaults.threads(), "thread");
            match (mutexes, threads) {
                (Ok(mutexes), Ok(threads)) => {
                    race(&defaults.with_mutexes(mutexes).with_threads(threads))
                }
                (Err(e), _) | (_, Err(e)) => {
                    eprintln!("Error: {e}");
                    return ExitCode::FAILURE;
                }
            }
        }
        _ => return usage(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
