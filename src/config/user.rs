//! User settings file for godot-bridge.
//!
//! Location: $XDG_CONFIG_HOME/godot-bridge/godot-bridge.toml
//! Fallback: the platform config directory (e.g. ~/.config/godot-bridge/godot-bridge.toml)

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::ConfigError;
use super::settings::{DecodeErrorPolicy, ReconnectPolicy};

const APP_DIR: &str = "godot-bridge";
const FILE_NAME: &str = "godot-bridge.toml";

/// Contents of the settings file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
    pub url: Option<String>,
    pub token_file: Option<PathBuf>,
    pub request_timeout_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
    pub handshake_timeout_ms: Option<u64>,
    pub shutdown_timeout_ms: Option<u64>,
    pub reconnect: Option<ReconnectPolicy>,
    pub decode_errors: Option<DecodeErrorPolicy>,
}

/// Returns the path to the user settings file.
///
/// 1. If $XDG_CONFIG_HOME is set: $XDG_CONFIG_HOME/godot-bridge/godot-bridge.toml
/// 2. Otherwise: <platform config dir>/godot-bridge/godot-bridge.toml
///
/// Returns None if no config directory can be determined.
pub fn user_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::config_dir)?;
    Some(base.join(APP_DIR).join(FILE_NAME))
}

/// Load a settings file.
///
/// A missing file is `Ok(None)`; an unreadable or malformed one is an error.
pub fn load_settings_file(path: &Path) -> Result<Option<SettingsFile>, ConfigError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    toml::from_str(&contents)
        .map(Some)
        .map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Load the user settings file from its default location, if any.
pub fn load_user_settings() -> Result<Option<SettingsFile>, ConfigError> {
    match user_config_path() {
        Some(path) => load_settings_file(&path),
        None => Ok(None),
    }
}
