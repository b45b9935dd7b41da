//! Error handling types for godot-bridge
//!
//! Every way a bridge call can end without a result maps to one
//! `BridgeError` variant, and every variant maps to a distinct process exit
//! code so that scripts driving the CLI can branch on the failure kind.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::bridge::protocol::ErrorCode;

/// Outcome taxonomy surfaced by the bridge client.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    /// The transport could not be established
    #[error("Cannot connect to Godot at {url}: {reason}")]
    Connect { url: String, reason: String },

    /// The editor rejected the authentication handshake
    #[error("Authentication rejected: {message}")]
    Auth {
        code: Option<ErrorCode>,
        message: String,
    },

    /// The local deadline passed; the editor may still execute the call
    #[error("Request '{method}' timed out after {elapsed:?} (remote outcome unknown)")]
    Timeout { method: String, elapsed: Duration },

    /// The transport failed while the call was outstanding or being set up
    #[error("Connection lost: {reason}")]
    ConnectionLost { reason: String },

    /// The editor executed the call and reported a failure
    #[error("RPC Error {code}: {message}")]
    Remote {
        code: ErrorCode,
        message: String,
        data: Option<Value>,
    },

    /// Malformed or unexpected envelope
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// The client was shut down while the call was pending
    #[error("Bridge client shut down")]
    Shutdown,

    /// Settings, token file or URL could not be used
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// A command-line argument could not be turned into call parameters
    #[error("Invalid argument: {message}")]
    Usage { message: String },
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Helper functions for common error patterns
impl BridgeError {
    pub fn connect(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        BridgeError::Connect {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn connection_lost(reason: impl Into<String>) -> Self {
        BridgeError::ConnectionLost {
            reason: reason.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        BridgeError::Protocol {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        BridgeError::Config {
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        BridgeError::Usage {
            message: message.into(),
        }
    }

    /// Process exit code for this failure kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            BridgeError::Config { .. } | BridgeError::Usage { .. } => 2,
            BridgeError::Connect { .. } => 3,
            BridgeError::Auth { .. } => 4,
            BridgeError::Timeout { .. } => 5,
            BridgeError::ConnectionLost { .. } => 6,
            BridgeError::Remote { .. } => 7,
            BridgeError::Protocol { .. } => 8,
            BridgeError::Shutdown => 9,
        }
    }

    /// Stable machine-readable name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::Connect { .. } => "connect",
            BridgeError::Auth { .. } => "auth",
            BridgeError::Timeout { .. } => "timeout",
            BridgeError::ConnectionLost { .. } => "connection_lost",
            BridgeError::Remote { .. } => "remote",
            BridgeError::Protocol { .. } => "protocol",
            BridgeError::Shutdown => "shutdown",
            BridgeError::Config { .. } => "config",
            BridgeError::Usage { .. } => "usage",
        }
    }
}
