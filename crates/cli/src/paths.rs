use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use storage::SettingsStore;

/// The working directory: `explicit` when given, else the last selected one.
pub fn resolve_dir(explicit: Option<&Path>, settings: &SettingsStore) -> Result<PathBuf> {
    match explicit {
        Some(dir) => {
            if !dir.is_dir() {
                bail!("not a directory: {}", dir.display());
            }
            absolute(dir)
        }
        None => settings
            .last_directory()
            .context("no directory selected; run `select <DIR>` or pass --dir"),
    }
}

/// Absolute form of `path`. Files that no longer exist are resolved against the current
/// directory so their records can still be found.
pub fn absolute(path: &Path) -> Result<PathBuf> {
    if let Ok(canonical) = path.canonicalize() {
        return Ok(canonical);
    }
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(path))
}

/// Resolves a file argument: as given, or relative to `dir` when it does not exist as given.
pub fn resolve_file(file: &Path, dir: Option<&Path>) -> Result<PathBuf> {
    if !file.exists() {
        if let Some(candidate) = dir.map(|d| d.join(file)).filter(|c| c.exists()) {
            return absolute(&candidate);
        }
    }
    absolute(file)
}
