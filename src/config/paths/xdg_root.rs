//! Filesystem locations for configuration and cache data.

use crate::error::RouterError;
use std::path::PathBuf;

/// Get XDG config home directory
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise defaults to `$HOME/.config`
pub fn config_home() -> Result<PathBuf, RouterError> {
    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg_config_home.is_empty() {
            return Ok(PathBuf::from(xdg_config_home));
        }
    }

    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".config"))
        .ok_or_else(|| {
            RouterError::ConfigError(
                "Could not determine XDG config home directory (HOME not set)".to_string(),
            )
        })
}

/// `$XDG_CONFIG_HOME/trustrouter/config.toml`
pub fn global_config_path() -> Result<PathBuf, RouterError> {
    Ok(config_home()?.join("trustrouter").join("config.toml"))
}

/// Default cache directory: `$HOME/.trustrouter`
///
/// Not created here; stores create it on first write.
pub fn cache_dir() -> Result<PathBuf, RouterError> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".trustrouter"))
        .ok_or_else(|| {
            RouterError::ConfigError(
                "Could not determine home directory for the cache".to_string(),
            )
        })
}
