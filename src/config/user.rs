//! User configuration location for iterm2-client.
//!
//! User config location: $XDG_CONFIG_HOME/iterm2-client/iterm2-client.toml
//! Fallback: the platform config directory reported by `dirs`.

use std::path::PathBuf;

const APP_DIR: &str = "iterm2-client";
const FILE_NAME: &str = "iterm2-client.toml";

/// Returns the path to the user configuration file.
///
/// The path is determined by:
/// 1. If $XDG_CONFIG_HOME is set: $XDG_CONFIG_HOME/iterm2-client/iterm2-client.toml
/// 2. Otherwise: `dirs::config_dir()`/iterm2-client/iterm2-client.toml
///
/// Returns None if no config directory can be determined.
pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg_config.is_empty() {
            return Some(PathBuf::from(xdg_config).join(APP_DIR).join(FILE_NAME));
        }
    }

    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(FILE_NAME))
}
