use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::render::DisplaySettings;

/// Returns the directory holding settings and logs: `~/.config/littlebits/`
pub fn config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("littlebits");
    path
}

/// Returns the path to the settings file: `~/.config/littlebits/settings.json`
pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Persisted scope settings.
///
/// Serialized as JSON to the platform config directory.
/// Fields use `#[serde(default)]` so that adding new settings
/// won't break existing config files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Substring of the device name; empty means the USB I/O module default
    pub device_name: String,

    /// cpal host name (e.g. "ALSA", "JACK"); `None` uses the platform default
    pub host: Option<String>,

    /// Transfer buffer size in bytes
    pub buffer_size: usize,

    pub refresh_interval_ms: u64,
    pub transfer_timeout_ms: u64,

    pub display: DisplaySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device_name: String::new(),
            host: None,
            buffer_size: 1024,
            refresh_interval_ms: 100,
            transfer_timeout_ms: 2000,
            display: DisplaySettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from disk, falling back to defaults on any error.
    pub fn load() -> Self {
        Self::load_from(&settings_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("Failed to parse settings ({}), using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                log::info!("No settings file found ({}), using defaults", e);
                Self::default()
            }
        }
    }

    /// Save settings to disk as pretty JSON.
    pub fn save(&self) -> io::Result<()> {
        self.save_to(&settings_path())
    }

    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Saved settings to {}", path.display());
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_millis(self.transfer_timeout_ms)
    }

    /// Length of the displayed series: one value per two-channel frame
    pub fn series_len(&self) -> usize {
        self.buffer_size / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::PlotMode;
    use ratatui::style::Color;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("settings.json"));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.series_len(), 512);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{ "device_name": "USB I/O", "display": { "mode": "braille", "color": "green" } }"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path);
        assert_eq!(settings.device_name, "USB I/O");
        assert_eq!(settings.buffer_size, 1024);
        assert_eq!(settings.display.mode, PlotMode::Braille);
        assert_eq!(settings.display.color, Color::Green);
        assert_eq!(settings.display.padding_left, 2);
    }

    #[test]
    fn test_garbage_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            host: Some("JACK".to_string()),
            refresh_interval_ms: 50,
            ..Settings::default()
        };

        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);
        assert_eq!(settings.refresh_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_save_reports_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("littlebits");
        std::fs::write(&blocker, "a file, not a directory").unwrap();

        let result = Settings::default().save_to(&blocker.join("settings.json"));
        assert!(result.is_err());
        assert!(!blocker.join("settings.json").exists());
    }
}
