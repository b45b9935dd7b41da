//! `auth.hello` handshake payloads.
//!
//! The first message on every connection is a call to [`AUTH_METHOD`]
//! carrying the token. The editor answers with `{"ok": true, ...}` (plus an
//! optional `editor_version`) or an error envelope.

use serde_json::{Value, json};

/// Method name of the authentication handshake.
pub const AUTH_METHOD: &str = "auth.hello";

/// Client name announced during the handshake.
pub const CLIENT_NAME: &str = "godot-bridge-cli";

/// What an accepted handshake tells us about the editor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelloAccepted {
    pub editor_version: Option<String>,
}

/// Build the params of the `auth.hello` request.
pub fn build_hello_params(token: &str) -> Value {
    json!({
        "client": CLIENT_NAME,
        "token": token,
        "version": env!("CARGO_PKG_VERSION"),
    })
}

/// Validate the result of a successful `auth.hello` call.
///
/// The editor signals acceptance with `ok: true`; any other shape is a
/// rejection.
pub fn validate_hello_result(result: &Value) -> Result<HelloAccepted, String> {
    match result.get("ok") {
        Some(Value::Bool(true)) => Ok(HelloAccepted {
            editor_version: result
                .get("editor_version")
                .and_then(Value::as_str)
                .map(str::to_owned),
        }),
        Some(_) => Err("editor rejected the token".to_string()),
        None => Err(format!("unexpected auth.hello result: {}", result)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_params_carry_token_and_client_identity() {
        let params = build_hello_params("s3cret");
        assert_eq!(params["token"], "s3cret");
        assert_eq!(params["client"], "godot-bridge-cli");
        assert_eq!(params["version"], env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn accepted_hello_reports_editor_version() {
        let accepted =
            validate_hello_result(&json!({"ok": true, "editor_version": "4.3.stable"})).unwrap();
        assert_eq!(accepted.editor_version.as_deref(), Some("4.3.stable"));
    }

    #[test]
    fn accepted_hello_without_version() {
        let accepted = validate_hello_result(&json!({"ok": true})).unwrap();
        assert_eq!(accepted, HelloAccepted::default());
    }

    #[test]
    fn ok_false_is_a_rejection() {
        assert!(validate_hello_result(&json!({"ok": false})).is_err());
    }

    #[test]
    fn missing_ok_is_a_rejection() {
        let err = validate_hello_result(&json!({"welcome": 1})).unwrap_err();
        assert!(err.contains("unexpected auth.hello result"), "{}", err);
    }
}
