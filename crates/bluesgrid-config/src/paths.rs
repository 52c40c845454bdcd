//! Platform-specific configuration paths.
//!
//! - Linux: `~/.config/bluesgrid/config.toml`
//! - macOS: `~/Library/Application Support/bluesgrid/config.toml`
//! - Windows: `%APPDATA%\bluesgrid\config.toml`

use std::path::PathBuf;

use crate::ConfigError;

/// Application name used for directory paths.
const APP_NAME: &str = "bluesgrid";

/// File name of the main configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// The user configuration directory.
///
/// Falls back to the working directory if the platform has none.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Where the configuration file lives by default.
pub fn default_config_path() -> PathBuf {
    user_config_dir().join(CONFIG_FILE_NAME)
}

/// Create the user configuration directory if needed and return it.
pub fn ensure_user_config_dir() -> Result<PathBuf, ConfigError> {
    let dir = user_config_dir();
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| ConfigError::create_dir(&dir, e))?;
    }
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_is_inside_app_dir() {
        let path = default_config_path();
        assert!(path.ends_with("bluesgrid/config.toml"));
        assert_eq!(path.parent(), Some(user_config_dir().as_path()));
    }
}
