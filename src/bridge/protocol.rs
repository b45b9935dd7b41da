//! Wire protocol for talking to the editor plugin.
//!
//! ## Module Structure
//!
//! - `request_id` - RequestId type for type-safe request ID handling
//! - `error_code` - Remote error codes (numeric or symbolic)
//! - `envelope` - Typed outgoing requests and incoming responses/notifications
//! - `codec` - Envelope encoding and validation of incoming frames
//! - `auth` - `auth.hello` handshake payloads

mod auth;
mod codec;
mod envelope;
mod error_code;
mod request_id;

pub use auth::{AUTH_METHOD, CLIENT_NAME, HelloAccepted, build_hello_params, validate_hello_result};
pub use codec::{DecodeError, decode, encode};
pub use envelope::{Inbound, Notification, RemoteFailure, Request, Response, ResponseOutcome};
pub use error_code::ErrorCode;
pub use request_id::RequestId;
