//! Configuration file support.
//!
//! Settings are stored as versioned JSON in the user's config directory.
//! Files written by a newer version are rejected rather than half-read.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auto_save::AutoSaveManager;
use crate::constants::auto_save::DEBOUNCE;
use crate::format::{DatasetExportOptions, ExportMode};
use crate::keybindings::KeyBindings;
use crate::model::ClassList;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// User preferences
    #[serde(default)]
    pub preferences: UserPreferences,

    /// Navigation, delete and save keys
    #[serde(default)]
    pub keybindings: KeyBindings,

    /// Classes new sessions start with
    #[serde(default)]
    pub classes: ClassList,
}

/// User preferences section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Default export folder path
    #[serde(default)]
    pub export_folder: String,

    /// Label layout used when none is given
    #[serde(default)]
    pub export_mode: ExportMode,

    /// Write `classes.txt` next to the label files
    #[serde(default = "default_true")]
    pub include_classes: bool,

    /// Timed saves while editing
    #[serde(default = "default_true")]
    pub auto_save: bool,

    /// Quiet period before a timed save, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub auto_save_debounce_ms: u64,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_true() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    u64::try_from(DEBOUNCE.as_millis()).unwrap_or(u64::MAX)
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            export_folder: String::new(),
            export_mode: ExportMode::default(),
            include_classes: true,
            auto_save: true,
            auto_save_debounce_ms: default_debounce_ms(),
            log_level: LogLevel::default(),
        }
    }
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            preferences: UserPreferences::default(),
            keybindings: KeyBindings::default(),
            classes: ClassList::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Auto-save scheduler configured from the preferences.
    pub fn auto_save_manager(&self) -> AutoSaveManager {
        let mut manager = AutoSaveManager::new().with_debounce_delay(Duration::from_millis(
            self.preferences.auto_save_debounce_ms,
        ));
        manager.set_enabled(self.preferences.auto_save);
        manager
    }

    /// Export options configured from the preferences.
    pub fn export_options(&self) -> DatasetExportOptions {
        DatasetExportOptions::new(self.preferences.export_mode)
            .include_classes(self.preferences.include_classes)
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "yolo-labeler-config.json"
    }

    /// Get the default config file path.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("yolo-labeler").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("yolo-labeler")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load configuration from a file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to a file, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load configuration from the default path.
    /// Returns `Ok(None)` if there is no config file.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn try_load_from_default_path() -> Result<Option<Self>, ConfigError> {
        let Some(path) = Self::default_path() else {
            return Ok(None);
        };
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_default_path() -> Option<Self> {
        match Self::try_load_from_default_path() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config file: {}", e);
                None
            }
        }
    }

    /// Save configuration to the default path.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;
        self.save_to(&path)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keybindings::Key;

    #[test]
    fn test_defaults() {
        let config = AppConfig::new();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.preferences.auto_save_debounce_ms, 800);
        assert_eq!(config.preferences.export_mode, ExportMode::BBox);
        assert!(config.preferences.include_classes);
        assert_eq!(config.classes.names(), vec!["class0", "class1"]);
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = AppConfig::new();
        config.preferences.export_mode = ExportMode::Obb;
        config.preferences.log_level = LogLevel::Debug;
        config.keybindings.next_image = vec![Key::Char('n')];
        config.classes.rename(0, "person");

        let json = config.to_json().expect("serialize");
        let parsed = AppConfig::from_json(&json).expect("parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let parsed = AppConfig::from_json(r#"{"version": 1}"#).expect("parse");
        assert_eq!(parsed, AppConfig::new());
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let path = std::env::temp_dir().join(format!(
            "yolo_labeler_bad_config_{}.json",
            std::process::id()
        ));
        std::fs::write(&path, "{ not json").expect("write");
        let result = AppConfig::load_from(&path);
        std::fs::remove_file(&path).ok();
        let err = result.expect_err("corrupt config");
        assert!(matches!(err, ConfigError::ParseError(_)));
        assert!(err.to_string().starts_with("Failed to parse configuration"));
    }

    #[test]
    fn test_newer_version_rejected() {
        let result = AppConfig::from_json(r#"{"version": 42}"#);
        assert!(matches!(
            result,
            Err(ConfigError::VersionTooNew {
                file_version: 42,
                ..
            })
        ));
    }

    #[test]
    fn test_auto_save_manager_from_preferences() {
        let mut config = AppConfig::new();
        config.preferences.auto_save_debounce_ms = 250;
        config.preferences.auto_save = false;
        let manager = config.auto_save_manager();
        assert_eq!(manager.debounce_delay(), Duration::from_millis(250));
        assert!(!manager.is_enabled());
    }

    #[test]
    fn test_export_options_from_preferences() {
        let mut config = AppConfig::new();
        config.preferences.export_mode = ExportMode::Obb;
        config.preferences.include_classes = false;
        let options = config.export_options();
        assert_eq!(options.mode, ExportMode::Obb);
        assert!(!options.include_classes);
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir()
            .join(format!("yolo_labeler_config_{}", std::process::id()))
            .join(AppConfig::default_filename());
        let config = AppConfig::new();
        config.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");
        assert_eq!(loaded, config);
        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    #[test]
    fn test_log_level_filter() {
        assert_eq!(LogLevel::default().to_level_filter(), log::LevelFilter::Info);
        assert_eq!(LogLevel::Trace.to_level_filter(), log::LevelFilter::Trace);
    }
}
