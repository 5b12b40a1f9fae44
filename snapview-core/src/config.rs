//! Per-user session config: the last opened snapshot files and folder.
//!
//! Stored as pretty JSON at `<config dir>/snapview/session.json`, or at the
//! path named by the `SNAPVIEW_CONFIG` environment variable.  Loading never
//! fails: a missing or corrupt file is "no prior session".

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::errors::SnapViewError;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "SNAPVIEW_CONFIG";

/// Maximum number of remembered files.
pub const MAX_RECENT_FILES: usize = 10;

/// Persisted session state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub last_directory: Option<PathBuf>,
    /// Most recent first.
    #[serde(default)]
    pub last_files: Vec<PathBuf>,
}

/// Default config file location.
pub fn default_config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("snapview")
        .join("session.json")
}

impl SessionConfig {
    /// Load from [`default_config_path`].
    pub fn load() -> Self {
        Self::load_from(&default_config_path())
    }

    /// Load from `path`, falling back to the default on any problem.
    ///
    /// Remembered files that no longer exist are dropped.
    pub fn load_from(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                debug!("no session config at {}: {e}", path.display());
                return Self::default();
            }
        };
        let mut config: SessionConfig = match serde_json::from_str(&text) {
            Ok(config) => config,
            Err(e) => {
                warn!("ignoring corrupt session config {}: {e}", path.display());
                return Self::default();
            }
        };
        config.last_files.retain(|f| f.exists());
        if config.last_directory.as_deref().is_some_and(|d| !d.is_dir()) {
            config.last_directory = None;
        }
        config
    }

    /// Save to [`default_config_path`].
    pub fn save(&self) -> Result<(), SnapViewError> {
        self.save_to(&default_config_path())
    }

    /// Write as pretty JSON, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), SnapViewError> {
        let to_config_err =
            |e: &dyn std::fmt::Display| SnapViewError::ConfigError(format!("{}: {e}", path.display()));
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| to_config_err(&e))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| to_config_err(&e))?;
        fs::write(path, json).map_err(|e| to_config_err(&e))
    }

    /// Remember a successfully opened file.
    ///
    /// The file moves to the front of the list (deduplicated, capped at
    /// [`MAX_RECENT_FILES`]) and its folder becomes the last directory.
    pub fn record_open(&mut self, file: &Path) {
        let file = fs::canonicalize(file).unwrap_or_else(|_| file.to_path_buf());
        self.last_files.retain(|f| f != &file);
        self.last_files.insert(0, file.clone());
        self.last_files.truncate(MAX_RECENT_FILES);
        self.last_directory = file.parent().map(Path::to_path_buf);
    }

    /// Most recently opened file.
    pub fn last_file(&self) -> Option<&Path> {
        self.last_files.first().map(PathBuf::as_path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig::load_from(&dir.path().join("nope.json"));
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn test_corrupt_config_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(SessionConfig::load_from(&path), SessionConfig::default());
    }

    #[test]
    fn test_round_trip_and_stale_files_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("a.xml");
        fs::write(&snapshot, "<ui/>").unwrap();

        let mut config = SessionConfig::default();
        config.record_open(&snapshot);
        config.last_files.push(dir.path().join("deleted.xml"));

        let path = dir.path().join("nested").join("session.json");
        config.save_to(&path).unwrap();

        let loaded = SessionConfig::load_from(&path);
        assert_eq!(loaded.last_files.len(), 1);
        assert_eq!(loaded.last_file(), config.last_file());
        assert!(loaded.last_directory.is_some());
    }

    #[test]
    fn test_record_open_dedups_and_caps() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SessionConfig::default();
        let files: Vec<PathBuf> = (0..12)
            .map(|i| {
                let p = dir.path().join(format!("{i}.xml"));
                fs::write(&p, "<ui/>").unwrap();
                p
            })
            .collect();
        for f in &files {
            config.record_open(f);
        }
        config.record_open(&files[5]);
        assert_eq!(config.last_files.len(), MAX_RECENT_FILES);
        assert!(config.last_file().unwrap().ends_with("5.xml"));
        let fives = config
            .last_files
            .iter()
            .filter(|f| f.ends_with("5.xml"))
            .count();
        assert_eq!(fives, 1);
    }

    #[test]
    fn test_unknown_fields_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, r#"{"last_files": [], "window": {"w": 10}}"#).unwrap();
        assert_eq!(SessionConfig::load_from(&path), SessionConfig::default());
    }
}
