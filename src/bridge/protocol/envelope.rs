//! Typed envelopes exchanged with the editor.

use serde_json::Value;
use tokio::time::Instant;

use super::{ErrorCode, RequestId};
use crate::error::BridgeError;

/// An outgoing call.
///
/// Created by the client for every `call`; the Correlator owns its pending
/// entry until the matching response arrives or the deadline passes.
#[derive(Debug, Clone)]
pub struct Request {
    pub id: RequestId,
    pub method: String,
    pub params: Value,
    pub created_at: Instant,
    pub deadline: Instant,
}

impl Request {
    pub fn new(id: RequestId, method: impl Into<String>, params: Value, deadline: Instant) -> Self {
        Self {
            id,
            method: method.into(),
            params,
            created_at: Instant::now(),
            deadline,
        }
    }
}

/// Failure reported by the editor for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFailure {
    pub code: ErrorCode,
    pub message: String,
    pub data: Option<Value>,
}

impl From<RemoteFailure> for BridgeError {
    fn from(failure: RemoteFailure) -> Self {
        BridgeError::Remote {
            code: failure.code,
            message: failure.message,
            data: failure.data,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome {
    Success(Value),
    Failure(RemoteFailure),
}

impl ResponseOutcome {
    pub fn into_result(self) -> Result<Value, BridgeError> {
        match self {
            ResponseOutcome::Success(payload) => Ok(payload),
            ResponseOutcome::Failure(failure) => Err(failure.into()),
        }
    }
}

/// Response correlated 1:1 with a request by id.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub id: RequestId,
    pub outcome: ResponseOutcome,
}

/// Server-initiated message with no request id.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub event: String,
    pub data: Value,
}

/// A decoded incoming frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Response(Response),
    Notification(Notification),
}
