//! Rendering of call outcomes for humans and for scripts.
//!
//! With `--json` both outcomes are printed to stdout as
//! `{"ok": true, "data": ...}` or `{"ok": false, "error": {...}}`.
//! Otherwise data is pretty-printed to stdout and errors go to stderr.

use serde_json::{Map, Value, json};

use crate::error::BridgeError;

/// Text to print for a successful outcome.
pub fn render_success(data: &Value, json_mode: bool) -> String {
    if json_mode {
        pretty(&json!({"ok": true, "data": data}))
    } else {
        pretty(data)
    }
}

/// Text to print for a failure, and whether it goes to stdout.
pub fn render_error(error: &BridgeError, json_mode: bool) -> (String, bool) {
    if json_mode {
        (pretty(&error_document(error)), true)
    } else {
        (format!("Error: {}", error), false)
    }
}

/// `{"ok": false, "error": {"type", "kind", "code"?, "message", "details"?}}`
pub fn error_document(error: &BridgeError) -> Value {
    let mut fields = Map::new();
    match error {
        BridgeError::Remote {
            code,
            message,
            data,
        } => {
            fields.insert("type".into(), json!("rpc_error"));
            fields.insert("kind".into(), json!(error.kind()));
            fields.insert("code".into(), json!(code));
            fields.insert("message".into(), json!(message));
            if let Some(data) = data {
                fields.insert("details".into(), data.clone());
            }
        }
        BridgeError::Auth {
            code: Some(code), ..
        } => {
            fields.insert("type".into(), json!("error"));
            fields.insert("kind".into(), json!(error.kind()));
            fields.insert("code".into(), json!(code));
            fields.insert("message".into(), json!(error.to_string()));
        }
        _ => {
            fields.insert("type".into(), json!("error"));
            fields.insert("kind".into(), json!(error.kind()));
            fields.insert("message".into(), json!(error.to_string()));
        }
    }
    json!({"ok": false, "error": Value::Object(fields)})
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
