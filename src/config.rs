//! Endpoint and settings resolution.
//!
//! Values are layered, later layers overriding earlier ones:
//! defaults < settings file < environment < token file port < command line.

pub mod endpoint;
pub mod settings;
pub mod user;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde_json::Value;
use thiserror::Error;

use crate::bridge::transport::{self, ConnectError};
use crate::error::BridgeError;

pub use endpoint::{DEFAULT_WS_URL, Endpoint};
pub use settings::{BridgeSettings, DecodeErrorPolicy, ReconnectPolicy};
pub use user::{SettingsFile, load_settings_file, load_user_settings, user_config_path};

pub const ENV_WS_URL: &str = "GODOT_WS_URL";
pub const ENV_TOKEN: &str = "GODOT_TOKEN";
pub const ENV_TOKEN_FILE: &str = "GODOT_TOKEN_FILE";

/// Configuration could not be resolved.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("failed to read token file {}: {source}", path.display())]
    TokenFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid WebSocket URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

impl From<ConfigError> for BridgeError {
    fn from(err: ConfigError) -> Self {
        BridgeError::config(err.to_string())
    }
}

/// Values given on the command line. They win over every other layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub url: Option<String>,
    pub request_timeout: Option<Duration>,
}

/// What a token file contributed.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TokenFileContents {
    token: String,
    port: Option<u16>,
}

/// Resolve from the process environment and the user settings file.
pub fn load(overrides: &Overrides) -> Result<(Endpoint, BridgeSettings), ConfigError> {
    let file = load_user_settings()?;
    resolve(|key| std::env::var(key).ok(), file.as_ref(), overrides)
}

/// Resolve the endpoint and settings from explicit layers.
///
/// `env` looks up environment variables; empty values count as unset.
pub fn resolve<E>(
    env: E,
    file: Option<&SettingsFile>,
    overrides: &Overrides,
) -> Result<(Endpoint, BridgeSettings), ConfigError>
where
    E: Fn(&str) -> Option<String>,
{
    let env = |key: &str| env(key).filter(|value| !value.trim().is_empty());
    let file_layer = file.cloned().unwrap_or_default();

    let mut url = env(ENV_WS_URL)
        .or(file_layer.url.clone())
        .unwrap_or_else(|| DEFAULT_WS_URL.to_string());

    let mut token = env(ENV_TOKEN).unwrap_or_default();
    if token.is_empty() {
        let token_file = env(ENV_TOKEN_FILE)
            .map(PathBuf::from)
            .or(file_layer.token_file.clone());
        if let Some(contents) = token_file.as_deref().map(read_token_file).transpose()?.flatten() {
            token = contents.token;
            if let Some(port) = contents.port {
                url = format!("ws://127.0.0.1:{}", port);
            }
        }
    }

    if let Some(cli_url) = &overrides.url {
        url = cli_url.clone();
    }
    validate_url(&url)?;

    let defaults = BridgeSettings::default();
    let settings = BridgeSettings {
        request_timeout: match overrides.request_timeout {
            Some(timeout) if timeout.is_zero() => {
                return Err(ConfigError::InvalidValue {
                    key: "--timeout",
                    reason: "must be greater than zero".to_string(),
                });
            }
            Some(timeout) => timeout,
            None => millis(
                "request_timeout_ms",
                file_layer.request_timeout_ms,
                defaults.request_timeout,
            )?,
        },
        connect_timeout: millis(
            "connect_timeout_ms",
            file_layer.connect_timeout_ms,
            defaults.connect_timeout,
        )?,
        handshake_timeout: millis(
            "handshake_timeout_ms",
            file_layer.handshake_timeout_ms,
            defaults.handshake_timeout,
        )?,
        shutdown_timeout: millis(
            "shutdown_timeout_ms",
            file_layer.shutdown_timeout_ms,
            defaults.shutdown_timeout,
        )?,
        reconnect: file_layer.reconnect.unwrap_or(defaults.reconnect),
        decode_errors: file_layer.decode_errors.unwrap_or(defaults.decode_errors),
    };

    debug!(
        target: "godot_bridge::config",
        "Resolved endpoint {} (token {})",
        url,
        if token.is_empty() { "missing" } else { "present" }
    );

    Ok((Endpoint::new(url, token), settings))
}

fn millis(key: &'static str, value: Option<u64>, default: Duration) -> Result<Duration, ConfigError> {
    match value {
        Some(0) => Err(ConfigError::InvalidValue {
            key,
            reason: "must be greater than zero".to_string(),
        }),
        Some(ms) => Ok(Duration::from_millis(ms)),
        None => Ok(default),
    }
}

fn validate_url(raw: &str) -> Result<(), ConfigError> {
    transport::validate_ws_url(raw).map_err(|e| match e {
        ConnectError::InvalidUrl { url, reason } => ConfigError::InvalidUrl { url, reason },
        other => ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: other.to_string(),
        },
    })
}

/// Read a token file. A file that does not exist contributes nothing.
fn read_token_file(path: &Path) -> Result<Option<TokenFileContents>, ConfigError> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(Some(parse_token_file(&raw))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(
                target: "godot_bridge::config",
                "Token file {} does not exist, ignoring",
                path.display()
            );
            Ok(None)
        }
        Err(source) => Err(ConfigError::TokenFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// The editor plugin writes either a bare token or `{"token": ..., "port": ...}`.
fn parse_token_file(raw: &str) -> TokenFileContents {
    let raw = raw.trim();
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(fields)) => {
            let token = match fields.get("token") {
                Some(Value::String(token)) if !token.is_empty() => token.clone(),
                _ => raw.to_string(),
            };
            let port = match fields.get("port") {
                Some(Value::Number(n)) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
                Some(Value::String(s)) => s.trim().parse().ok(),
                _ => None,
            }
            .filter(|port| *port != 0);
            TokenFileContents { token, port }
        }
        _ => TokenFileContents {
            token: raw.to_string(),
            port: None,
        },
    }
}
