//! Board inspection tool.
//!
//! # Responsibility
//! - Verify `boardkeep_core` linkage without a transport layer.
//! - Optionally load one board and print its summary as JSON.
//!
//! Limits and the history directory come from `BOARDKEEP_*` environment
//! variables; an explicit `<history_dir>` argument overrides the latter.
//! Logs are written under `<history_dir>/logs`.
//!
//! Usage: `boardkeep_cli [[<history_dir>] <board_name>]`

use boardkeep_core::{core_version, default_log_level, init_logging, BoardConfig, BoardStore};
use std::path::PathBuf;
use std::process::ExitCode;

const USAGE: &str = "usage: boardkeep_cli [[<history_dir>] <board_name>]";

fn main() -> ExitCode {
    println!("boardkeep_core version={}", core_version());

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (history_dir, board_name) = match args.as_slice() {
        [] => return ExitCode::SUCCESS,
        [board_name] => (None, board_name.clone()),
        [history_dir, board_name] => (Some(PathBuf::from(history_dir)), board_name.clone()),
        _ => {
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    let mut config = match BoardConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return ExitCode::from(2);
        }
    };
    if let Some(history_dir) = history_dir {
        config.history_dir = history_dir;
    }
    if config.history_dir.is_relative() {
        match std::env::current_dir() {
            Ok(cwd) => config.history_dir = cwd.join(&config.history_dir),
            Err(err) => {
                eprintln!("failed to resolve working directory: {err}");
                return ExitCode::FAILURE;
            }
        }
    }

    let log_dir = config.history_dir.join("logs");
    if let Err(err) = init_logging(default_log_level(), &log_dir.to_string_lossy()) {
        eprintln!("failed to initialize logging: {err}");
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to start runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    let stats = runtime.block_on(async { BoardStore::open(board_name, &config).await.stats() });
    match serde_json::to_string_pretty(&stats) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("failed to encode board summary: {err}");
            ExitCode::FAILURE
        }
    }
}
