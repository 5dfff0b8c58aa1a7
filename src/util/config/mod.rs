//! IPPcode19 interpreter configuration system
//!
//! A single, optional user-level configuration file. Missing file or
//! missing directory both fall back to defaults silently — the
//! interpreter never requires a config file to run.
//!
//! # Configuration hierarchy
//!
//! ```text
//! Priority (high -> low):
//! 1. CLI arguments
//! 2. User-level (~/.config/ippcode19/config.toml)
//! 3. Default values
//! ```
//!
//! # Usage
//!
//! ```rust
//! use ippcode19::util::config::{load_user_config, UserConfig};
//!
//! let config = load_user_config().unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// User-level configuration for the interpreter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    /// Default log level, overridden by `--log-level`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Whether `BREAK` dumps its diagnostic state to stderr.
    #[serde(default = "default_break_enabled")]
    pub break_enabled: bool,
    /// Exit code used when the interpreter panics outside of a
    /// recognized `VMError`/`LoadError` (should not normally happen).
    #[serde(default = "default_panic_exit_code")]
    pub panic_exit_code: i32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_break_enabled() -> bool {
    true
}

fn default_panic_exit_code() -> i32 {
    99
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            break_enabled: default_break_enabled(),
            panic_exit_code: default_panic_exit_code(),
        }
    }
}

/// Get the user config directory
pub fn get_config_dir() -> Option<PathBuf> {
    // Try XDG config directory on Unix
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config).join("ippcode19"));
    }

    // Fallback to ~/.config/ippcode19
    if let Ok(home) = std::env::var("HOME") {
        return Some(PathBuf::from(home).join(".config").join("ippcode19"));
    }

    // On Windows, try %APPDATA%
    if let Ok(appdata) = std::env::var("APPDATA") {
        return Some(PathBuf::from(appdata).join("ippcode19"));
    }

    None
}

/// Get the user config file path (~/.config/ippcode19/config.toml)
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("config.toml"))
}

/// Check if user config exists
pub fn config_exists() -> bool {
    get_config_path().map(|p| p.exists()).unwrap_or(false)
}

/// Load user-level configuration. Returns the default config if no
/// config directory can be determined or the file doesn't exist.
pub fn load_user_config() -> Result<UserConfig, ConfigError> {
    let path = match get_config_path() {
        Some(p) => p,
        None => return Ok(UserConfig::default()),
    };

    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = fs::read_to_string(&path).map_err(ConfigError::IoError)?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

/// Load user-level config, creating the default file if it doesn't exist.
pub fn load_or_create_user_config() -> Result<UserConfig, ConfigError> {
    let path = match get_config_path() {
        Some(p) => p,
        None => return Ok(UserConfig::default()),
    };

    if !path.exists() {
        let config = UserConfig::default();
        save_user_config(&config)?;
        return Ok(config);
    }

    load_user_config()
}

/// Save user-level configuration
pub fn save_user_config(config: &UserConfig) -> Result<(), ConfigError> {
    let dir = get_config_dir().ok_or(ConfigError::NoConfigDir)?;
    let path = dir.join("config.toml");

    if !dir.exists() {
        fs::create_dir_all(&dir).map_err(ConfigError::IoError)?;
    }

    let content = toml::to_string_pretty(config).map_err(ConfigError::SerializeError)?;
    fs::write(&path, content).map_err(ConfigError::IoError)?;

    Ok(())
}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    ParseError(toml::de::Error),
    SerializeError(toml::ser::Error),
    NoConfigDir,
}

impl std::fmt::Display for ConfigError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Config parse error: {}", e),
            ConfigError::SerializeError(e) => write!(f, "Config serialize error: {}", e),
            ConfigError::NoConfigDir => write!(f, "Cannot determine config directory"),
        }
    }
}

impl std::error::Error for ConfigError {}
