// src/utils/logger.rs

//! Process-wide logger setup.
//!
//! Lines look like `session.rs[LINE:97]# WARN     [2026-10-18 14:03:11.204]  message`
//! and go to stderr or to a file under the configured log directory.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use env_logger::{Builder, Env, Target};

use crate::error::{AppError, Result};
use crate::models::LoggingConfig;

/// Install the global logger. `verbose` forces the `debug` level.
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { config.level.as_str() };
    let mut builder = Builder::from_env(Env::default().default_filter_or(level));
    builder.format(|buf, record| {
        let file = record
            .file()
            .and_then(|f| Path::new(f).file_name())
            .and_then(|f| f.to_str())
            .unwrap_or("unknown");
        writeln!(
            buf,
            "{}[LINE:{}]# {:<8} [{}]  {}",
            file,
            record.line().unwrap_or(0),
            record.level(),
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.args()
        )
    });

    if config.file {
        let path = log_file_path(config, Local::now())?;
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    builder
        .try_init()
        .map_err(|e| AppError::config(format!("logger already initialised: {e}")))
}

/// Create the log directory if needed and return the log file path.
pub fn log_file_path(config: &LoggingConfig, now: DateTime<Local>) -> Result<PathBuf> {
    let dir = Path::new(&config.dir);
    fs::create_dir_all(dir)?;
    Ok(dir.join(log_file_name(
        &config.name,
        config.single_date,
        config.rotate,
        now,
    )))
}

/// Log file name for the given naming mode.
///
/// - rotating, not dated: `<name>.log`
/// - dated, not rotating: `<name>_<date>.log`
/// - otherwise: `<name>_<date>_<time>.log`
pub fn log_file_name(name: &str, single_date: bool, rotate: bool, now: DateTime<Local>) -> String {
    match (single_date, rotate) {
        (false, true) => format!("{name}.log"),
        (true, false) => format!("{}_{}.log", name, now.format("%Y-%m-%d")),
        _ => format!("{}_{}.log", name, now.format("%Y-%m-%d_%H_%M_%S%.6f")),
    }
}
