use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::shared::errors::{CommandError, CommandResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub hotkeys: HotkeySettings,
    pub preferences: EnginePreferences,
}

/// The fixed keyboard contract surfaced to the user.
///
/// These strings are display labels; the gesture interceptor matches on
/// virtual key codes, not on these values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotkeySettings {
    pub toggle_picker: String,
    pub screenshot_mode: String,
    pub toggle_copy_capture: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnginePreferences {
    /// Clipboard change-detection poll cadence
    pub poll_interval_ms: u64,
    /// Delay between a copy keydown and the pasteboard read
    pub copy_read_delay_ms: u64,
    /// Name of the folder created on first run
    pub default_folder_name: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            hotkeys: HotkeySettings {
                toggle_picker: "Cmd+M".to_string(),
                screenshot_mode: "Cmd+1".to_string(),
                toggle_copy_capture: "Cmd+Q".to_string(),
            },
            preferences: EnginePreferences {
                poll_interval_ms: 500,
                copy_read_delay_ms: 200,
                default_folder_name: "UnTitled".to_string(),
            },
        }
    }
}

impl AppSettings {
    pub fn get_settings_path() -> CommandResult<PathBuf> {
        ProjectDirs::from("com", "clipfolio", "clipfolio")
            .map(|dirs| dirs.config_dir().join("settings.json"))
            .ok_or_else(|| CommandError::SystemIO("Failed to determine config directory".to_string()))
    }

    pub async fn load() -> CommandResult<Self> {
        Self::load_from(&Self::get_settings_path()?).await
    }

    /// Load settings, writing defaults on first run
    pub async fn load_from(path: &Path) -> CommandResult<Self> {
        if !path.exists() {
            let settings = Self::default();
            settings.save_to(path).await?;
            return Ok(settings);
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| CommandError::SystemIO(format!("Failed to read settings file: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| CommandError::InvalidInput(format!("Failed to parse settings: {}", e)))
    }

    /// Load settings, falling back to defaults when missing or malformed
    pub async fn load_or_default() -> Self {
        match Self::load().await {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("[Settings] Failed to load settings: {}, using defaults", e);
                Self::default()
            }
        }
    }

    pub async fn save(&self) -> CommandResult<()> {
        self.save_to(&Self::get_settings_path()?).await
    }

    pub async fn save_to(&self, path: &Path) -> CommandResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| CommandError::SystemIO(format!("Failed to create config directory: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(self)?;

        fs::write(path, content)
            .await
            .map_err(|e| CommandError::SystemIO(format!("Failed to write settings file: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_writes_defaults_on_first_run() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");

        let settings = AppSettings::load_from(&path).await.expect("load");
        assert_eq!(settings.preferences.poll_interval_ms, 500);
        assert_eq!(settings.preferences.copy_read_delay_ms, 200);
        assert_eq!(settings.preferences.default_folder_name, "UnTitled");
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_settings_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");

        let mut settings = AppSettings::default();
        settings.preferences.poll_interval_ms = 250;
        settings.save_to(&path).await.expect("save");

        let loaded = AppSettings::load_from(&path).await.expect("load");
        assert_eq!(loaded.preferences.poll_interval_ms, 250);
    }

    #[tokio::test]
    async fn test_malformed_settings_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        tokio::fs::write(&path, "not json").await.expect("write");

        assert!(AppSettings::load_from(&path).await.is_err());
    }
}
