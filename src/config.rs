//! User settings persistence
//!
//! Optional defaults live in ~/.config/playport/settings.json. Anything given
//! on the command line or through the environment takes precedence.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::transfer::DEFAULT_VOLUME_ROOT;
use crate::utils::encoding::DEFAULT_ENCODING;
use crate::utils::progress::DEFAULT_MARKER_INTERVAL;

const SETTINGS_FILE: &str = "settings.json";

/// Persistent defaults for porting runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root that absolute playlist paths are resolved under when they are
    /// not found next to the playlist
    pub volume_root: PathBuf,
    /// Encoding label for tab-delimited playlists
    pub encoding: String,
    /// Entries between two progress markers (0 disables them)
    pub progress_interval: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            volume_root: PathBuf::from(DEFAULT_VOLUME_ROOT),
            encoding: DEFAULT_ENCODING.to_string(),
            progress_interval: DEFAULT_MARKER_INTERVAL,
        }
    }
}

impl Settings {
    /// Load settings from the user config directory, falling back to defaults
    pub fn load() -> Result<Self> {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("No config directory on this platform, using default settings");
                Ok(Self::default())
            }
        }
    }

    /// Load settings from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;

        let settings: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings in {:?}", path))?;

        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents =
            serde_json::to_string_pretty(self).context("Failed to serialize settings")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write settings to {:?}", path))?;

        debug!("Saved settings to {}", path.display());
        Ok(())
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("playport").join(SETTINGS_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.volume_root, PathBuf::from("/Volumes"));
        assert_eq!(settings.encoding, "utf-16");
        assert_eq!(settings.progress_interval, 10);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::load_from(&temp.path().join("settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        fs::write(&path, r#"{ "volume_root": "/media/ipod" }"#).unwrap();

        let settings = Settings::load_from(&path).unwrap();

        assert_eq!(settings.volume_root, PathBuf::from("/media/ipod"));
        assert_eq!(settings.encoding, "utf-16");
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("settings.json");
        let settings = Settings {
            volume_root: PathBuf::from("/mnt/mac"),
            encoding: "utf-8".to_string(),
            progress_interval: 25,
        };

        settings.save_to(&path).unwrap();

        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        fs::write(&path, "volume_root = nope").unwrap();

        assert!(Settings::load_from(&path).is_err());
    }
}
