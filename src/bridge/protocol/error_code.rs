use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error code reported by the editor.
///
/// The plugin uses JSON-RPC integer codes for most failures but symbolic
/// codes (e.g. `"unauthorized"`) for some; both are carried through as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    Number(i64),
    Text(String),
}

impl ErrorCode {
    /// Code used when an error object omits `code`.
    pub const UNKNOWN: ErrorCode = ErrorCode::Number(-1);

    pub(crate) fn from_wire(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Number(number)) => number
                .as_i64()
                .map(ErrorCode::Number)
                .unwrap_or_else(|| ErrorCode::Text(number.to_string())),
            Some(Value::String(text)) => ErrorCode::Text(text.clone()),
            _ => ErrorCode::UNKNOWN,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Number(code) => write!(f, "{}", code),
            ErrorCode::Text(code) => f.write_str(code),
        }
    }
}
