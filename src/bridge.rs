//! RPC bridge to the Godot editor.
//!
//! ## Module Structure
//!
//! - `transport` - WebSocket connection halves and their state signal
//! - `protocol` - Envelopes, codec, request ids and the auth handshake payloads
//! - `correlator` - Request id allocation and response routing
//! - `reader` - The per-connection reader task
//! - `session` - Connection lifecycle and reconnection policy
//! - `client` - The `BridgeClient` facade
//! - `notification` - Observers of server-pushed notifications

mod client;
mod correlator;
mod notification;
pub mod protocol;
mod reader;
mod session;
pub mod transport;

pub use client::BridgeClient;
pub use correlator::{Correlator, Outcome, PendingEntry};
pub use notification::{LogNotifications, NotificationObserver};
pub use protocol::{ErrorCode, Notification, RequestId};
pub use session::{ConnectionState, LinkStatus, Session, SessionStatus};
