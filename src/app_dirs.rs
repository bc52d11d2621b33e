use std::path::PathBuf;

use anyhow::{anyhow, Result};
use directories::ProjectDirs;

/// Overrides the platform data directory.
pub const DATA_DIR_ENV: &str = "TEABREW_DATA_DIR";

/// Resolves where settings and sessions live: an explicit path wins, then
/// `TEABREW_DATA_DIR`, then the platform data directory.
pub fn data_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    ProjectDirs::from("", "", "teabrew")
        .map(|dirs| dirs.data_local_dir().to_path_buf())
        .ok_or_else(|| anyhow!("no home directory; pass --data-dir or set {DATA_DIR_ENV}"))
}
