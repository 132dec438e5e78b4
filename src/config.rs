//! Configuration file support for boxmark.
//!
//! Settings are stored as versioned JSON: in the user's config directory on
//! native builds and in `localStorage` on the web.

use boxmark_canvas::{CanvasSettings, KeyBindings};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_SERVER_URL;
use crate::navigation::NavigationConfig;
use crate::undo::HistoryConfig;

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
    pub preferences: Preferences,

    /// Canvas interaction tunables
    #[serde(default)]
    pub canvas: CanvasSettings,

    /// Prefetch pipeline tunables
    #[serde(default)]
    pub navigation: NavigationConfig,

    /// Per-image undo history
    #[serde(default)]
    pub history: HistoryConfig,

    /// Keybinding configuration
    #[serde(default)]
    pub keybindings: KeyBindings,
}

/// User preferences section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// API root of the annotation server
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Bearer token passed with every request
    #[serde(default)]
    pub api_token: Option<String>,

    /// Dataset opened when none is given
    #[serde(default)]
    pub default_dataset: Option<u64>,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            api_token: None,
            default_dataset: None,
            log_level: LogLevel::default(),
        }
    }
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            preferences: Preferences::default(),
            canvas: CanvasSettings::default(),
            navigation: NavigationConfig::default(),
            history: HistoryConfig::default(),
            keybindings: KeyBindings::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "boxmark-config.json"
    }

    /// Load the stored configuration, falling back to defaults with a
    /// warning when it is invalid. On native builds a missing file is
    /// created with the defaults so there is something to edit.
    pub fn load_or_default() -> Self {
        #[cfg(not(target_arch = "wasm32"))]
        let loaded = Self::load_native();
        #[cfg(target_arch = "wasm32")]
        let loaded = Self::load_from_local_storage();

        loaded.unwrap_or_else(|| {
            log::info!("Using default configuration");
            Self::new()
        })
    }

    /// `<config dir>/boxmark/boxmark-config.json`, or under `~/.config`
    /// when the platform reports no config dir.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<std::path::PathBuf> {
        dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .map(|dir| dir.join("boxmark").join(Self::default_filename()))
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn load_native() -> Option<Self> {
        let path = Self::default_path()?;
        match Self::load_from_path(&path) {
            Ok(Some(config)) => {
                log::info!("Loaded configuration from {:?}", path);
                Some(config)
            }
            Ok(None) => {
                let config = Self::new();
                match config.save_to_path(&path) {
                    Ok(()) => log::info!("Wrote default configuration to {:?}", path),
                    Err(e) => log::warn!("Could not write default configuration: {}", e),
                }
                Some(config)
            }
            Err(e) => {
                log::warn!("Ignoring config file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Read a config file. A missing file is `Ok(None)`.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_path(path: &std::path::Path) -> Result<Option<Self>, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the config as pretty JSON, creating parent directories.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_path(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    #[cfg(target_arch = "wasm32")]
    const LOCALSTORAGE_KEY: &'static str = "boxmark-config";

    /// Read the config stored under `boxmark-config` in localStorage.
    #[cfg(target_arch = "wasm32")]
    fn load_from_local_storage() -> Option<Self> {
        let storage = web_sys::window()?.local_storage().ok()??;
        let json = match storage.get_item(Self::LOCALSTORAGE_KEY) {
            Ok(Some(json)) => json,
            Ok(None) => {
                log::debug!("No config found in localStorage");
                return None;
            }
            Err(e) => {
                log::warn!("Failed to read from localStorage: {:?}", e);
                return None;
            }
        };
        match Self::from_json(&json) {
            Ok(config) => {
                log::info!("Loaded configuration from localStorage");
                Some(config)
            }
            Err(e) => {
                log::warn!("Ignoring stored configuration: {}", e);
                None
            }
        }
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

    /// I/O error when reading or writing the config file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
