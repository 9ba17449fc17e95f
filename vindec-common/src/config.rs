//! Bootstrap configuration and root folder resolution
//!
//! The TOML file only carries bootstrap values and fallbacks. Runtime
//! settings live in the database `settings` table.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "VINDEC_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "vindec.db";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_folder: Option<PathBuf>,

    /// HTTP port for `serve`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Fallback per-request upstream timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_timeout_secs: Option<u64>,

    /// Fallback for enabling the secondary decoder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_secondary_api: Option<bool>,

    /// Fallback secondary decoder API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_api_key: Option<String>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Default TOML location: `<config dir>/vindec/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("vindec").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("vindec.toml"))
}

/// Load TOML config; a missing file yields defaults
///
/// A file that exists but fails to parse is an error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!("Config file not found at {}, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML {} failed: {}", path.display(), e)))
}

/// Write TOML config atomically (temp file + rename)
///
/// On Unix the file is restricted to 0600 because it may hold an API key.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Resolve the root folder
///
/// Priority:
/// 1. Command-line argument
/// 2. `VINDEC_ROOT_FOLDER`
/// 3. TOML `root_folder`
/// 4. OS-dependent default
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("vindec"))
        .unwrap_or_else(|| PathBuf::from("./vindec_data"))
}

/// Database path inside a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE)
}
