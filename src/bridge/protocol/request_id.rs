//! Request ID type for bridge communication.
//!
//! Ids are allocated from a per-connection counter and sent to the editor as
//! decimal strings, which the editor plugin echoes back verbatim.

use std::fmt;

use serde_json::Value;

/// JSON-RPC request ID for one connection.
///
/// Wraps `u64` so ids cannot be confused with other integers and can be used
/// as the key of the pending-request map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    #[inline]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Wire representation: the decimal string form.
    pub fn to_wire(self) -> Value {
        Value::String(self.0.to_string())
    }

    /// Parse an id echoed by the editor.
    ///
    /// Accepts the decimal string form we send as well as a plain
    /// non-negative integer. Returns `None` for anything else (including
    /// `null`, which marks a notification).
    pub fn from_wire(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => text.parse().ok().map(Self),
            Value::Number(number) => number.as_u64().map(Self),
            _ => None,
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}
