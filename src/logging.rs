//! Log setup. The terminal belongs to the UI, so records only go to `--log-file`.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;

/// Append `log` records to `path` (filter from `RUST_LOG`, default `info`).
/// Without a path no logger is installed and every record is dropped.
pub fn init(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("could not create log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init()
        .context("logger already installed")?;
    log::info!("logging to {}", path.display());
    Ok(())
}
