//! Envelope codec.
//!
//! Outgoing: `{"id":"<n>","jsonrpc":"2.0","method":...,"params":...}`.
//! Incoming success `{id, result}`, failure `{id, error:{code, message,
//! data?}}`, notification `{event, data}` or the JSON-RPC form
//! `{method, params}` without an id. Unknown fields are ignored.

use serde_json::{Map, Value, json};
use thiserror::Error;

use super::envelope::{Inbound, Notification, RemoteFailure, Request, Response, ResponseOutcome};
use super::{ErrorCode, RequestId};

/// Message used when an error object carries no usable `message`.
const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// Why an incoming frame could not be turned into an envelope.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("frame is not valid JSON: {0}")]
    Malformed(String),

    #[error("frame is not a JSON object")]
    NotAnObject,

    #[error("response id {0} was not issued by this client")]
    InvalidId(Value),

    #[error("response {0} carries neither result nor error")]
    MissingOutcome(RequestId),

    #[error("frame has no id and no recognized notification tag")]
    Unrecognized,
}

/// Encode a request to wire bytes.
///
/// Keys are inserted in lexical order so the output is byte-for-byte stable
/// whatever map implementation serde_json is built with.
pub fn encode(request: &Request) -> Vec<u8> {
    let envelope = json!({
        "id": request.id.to_wire(),
        "jsonrpc": "2.0",
        "method": request.method,
        "params": request.params,
    });
    envelope.to_string().into_bytes()
}

/// Decode one incoming frame.
pub fn decode(frame: &[u8]) -> Result<Inbound, DecodeError> {
    let value: Value =
        serde_json::from_slice(frame).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    let Value::Object(mut object) = value else {
        return Err(DecodeError::NotAnObject);
    };

    match object.remove("id") {
        None | Some(Value::Null) => decode_notification(object),
        Some(raw_id) => {
            let id = RequestId::from_wire(&raw_id).ok_or(DecodeError::InvalidId(raw_id))?;
            decode_response(id, object).map(Inbound::Response)
        }
    }
}

fn decode_response(id: RequestId, mut object: Map<String, Value>) -> Result<Response, DecodeError> {
    // A null "error" next to a result is how some JSON-RPC servers spell success
    if let Some(error) = object.remove("error").filter(|e| !e.is_null()) {
        return Ok(Response {
            id,
            outcome: ResponseOutcome::Failure(decode_failure(error)),
        });
    }

    match object.remove("result") {
        Some(result) => Ok(Response {
            id,
            outcome: ResponseOutcome::Success(result),
        }),
        None => Err(DecodeError::MissingOutcome(id)),
    }
}

fn decode_failure(error: Value) -> RemoteFailure {
    match error {
        Value::Object(mut fields) => RemoteFailure {
            code: ErrorCode::from_wire(fields.get("code")),
            message: match fields.remove("message") {
                Some(Value::String(message)) => message,
                _ => UNKNOWN_ERROR_MESSAGE.to_string(),
            },
            data: fields.remove("data").filter(|d| !d.is_null()),
        },
        Value::String(message) => RemoteFailure {
            code: ErrorCode::UNKNOWN,
            message,
            data: None,
        },
        other => RemoteFailure {
            code: ErrorCode::UNKNOWN,
            message: UNKNOWN_ERROR_MESSAGE.to_string(),
            data: Some(other),
        },
    }
}

fn decode_notification(mut object: Map<String, Value>) -> Result<Inbound, DecodeError> {
    if let Some(Value::String(event)) = object.remove("event") {
        let data = object.remove("data").unwrap_or(Value::Null);
        return Ok(Inbound::Notification(Notification { event, data }));
    }

    if let Some(Value::String(method)) = object.remove("method") {
        let data = object.remove("params").unwrap_or(Value::Null);
        return Ok(Inbound::Notification(Notification {
            event: method,
            data,
        }));
    }

    Err(DecodeError::Unrecognized)
}
