use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What the next caller sees after the current connection failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReconnectPolicy {
    /// The first caller after a failure gets `ConnectionLost`; the one after
    /// that connects afresh.
    #[default]
    FailFast,
    /// Reconnect once and surface that attempt's failure verbatim.
    ReconnectOnce,
}

/// What the reader task does with a frame it cannot decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecodeErrorPolicy {
    /// Log and keep reading
    #[default]
    Tolerate,
    /// Fail the connection and every pending call with a protocol error
    FailConnection,
}

/// Timeouts and policies of one bridge client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSettings {
    /// Default deadline of a call
    pub request_timeout: Duration,
    /// Bound on opening the WebSocket
    pub connect_timeout: Duration,
    /// Bound on the `auth.hello` round trip
    pub handshake_timeout: Duration,
    /// Bound on the close handshake during shutdown
    pub shutdown_timeout: Duration,
    pub reconnect: ReconnectPolicy,
    pub decode_errors: DecodeErrorPolicy,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            handshake_timeout: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(5),
            reconnect: ReconnectPolicy::default(),
            decode_errors: DecodeErrorPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fail_fast_and_tolerate_bad_frames() {
        let settings = BridgeSettings::default();
        assert_eq!(settings.reconnect, ReconnectPolicy::FailFast);
        assert_eq!(settings.decode_errors, DecodeErrorPolicy::Tolerate);
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn policies_use_kebab_case_names() {
        let policy: ReconnectPolicy = serde_json::from_str("\"reconnect-once\"").unwrap();
        assert_eq!(policy, ReconnectPolicy::ReconnectOnce);
        let policy: DecodeErrorPolicy = serde_json::from_str("\"fail-connection\"").unwrap();
        assert_eq!(policy, DecodeErrorPolicy::FailConnection);
    }
}
