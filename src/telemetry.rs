use crate::error::AppError;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "skillcheck.log";

/// Sends logs to `skillcheck.log` in `log_dir`, since the terminal UI owns
/// stdout. `SKILLCHECK_LOG` sets the filter (default `info`) and
/// `SKILLCHECK_LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing(log_dir: &Path) -> Result<PathBuf, AppError> {
    fs::create_dir_all(log_dir)?;
    let path = log_dir.join(LOG_FILE);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let filter = EnvFilter::try_from_env("SKILLCHECK_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true);

    match std::env::var("SKILLCHECK_LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().init(),
        _ => builder.init(),
    }
    Ok(path)
}
