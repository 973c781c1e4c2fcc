//! Application settings file (last-used directory).

use crate::StoreResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(default)]
    pub last_directory: String,
}

pub struct SettingsStore {
    path: PathBuf,
    settings: AppSettings,
}

impl SettingsStore {
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let settings = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "could not parse settings, using defaults");
                AppSettings::default()
            }),
            Err(_) => AppSettings::default(),
        };
        Self { path, settings }
    }

    /// The stored directory, if it still exists.
    pub fn last_directory(&self) -> Option<PathBuf> {
        if self.settings.last_directory.is_empty() {
            return None;
        }
        let dir = PathBuf::from(&self.settings.last_directory);
        dir.is_dir().then_some(dir)
    }

    /// Remembers `dir`. Returns `false` without saving when it is not an existing directory.
    pub fn set_last_directory(&mut self, dir: &Path) -> StoreResult<bool> {
        if !dir.is_dir() {
            return Ok(false);
        }
        self.settings.last_directory = dir.to_string_lossy().into_owned();
        let content = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.path, content)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remembers_existing_directory_only() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("appsettings.json");

        let mut store = SettingsStore::open(&file);
        assert!(store.last_directory().is_none());
        assert!(!store.set_last_directory(&tmp.path().join("missing")).unwrap());
        assert!(store.set_last_directory(tmp.path()).unwrap());

        let reopened = SettingsStore::open(&file);
        assert_eq!(reopened.last_directory().as_deref(), Some(tmp.path()));
    }
}
