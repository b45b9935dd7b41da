//! Connection state machine and the pure decision logic built on it.

use std::sync::RwLock;

use log::warn;

use crate::config::ReconnectPolicy;

/// State of one editor connection.
///
/// State transitions:
/// - Connecting -> Authenticating (transport open)
/// - Authenticating -> Ready (`auth.hello` accepted)
/// - Connecting/Authenticating/Ready -> Failed (transport error, peer closed)
/// - any non-terminal -> Closing (shutdown or auth rejection)
/// - Closing -> Closed (terminal)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport being opened
    Connecting,
    /// Transport open, `auth.hello` in flight
    Authenticating,
    /// Authenticated, calls may be sent
    Ready,
    /// Close in progress, new calls rejected
    Closing,
    /// Closed locally (terminal)
    Closed,
    /// Transport failed (terminal)
    Failed,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Authenticating => "authenticating",
            ConnectionState::Ready => "ready",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
            ConnectionState::Failed => "failed",
        }
    }
}

/// Shared, observable state of one connection.
///
/// Written by the session and the reader task, read by callers.
#[derive(Debug)]
pub struct LinkStatus {
    state: RwLock<ConnectionState>,
}

impl LinkStatus {
    pub fn new(state: ConnectionState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    pub fn get(&self) -> ConnectionState {
        *self.state.read().unwrap_or_else(|poisoned| {
            warn!(
                target: "godot_bridge::lock_recovery",
                "Recovered from poisoned state lock in LinkStatus"
            );
            poisoned.into_inner()
        })
    }

    pub fn set(&self, state: ConnectionState) {
        *self.write() = state;
    }

    /// Move from `from` to `to`; returns `false` if the state was not `from`.
    pub fn transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        let mut state = self.write();
        if *state == from {
            *state = to;
            true
        } else {
            false
        }
    }

    /// Mark the connection Failed unless it is already shutting down.
    ///
    /// Returns `true` if the state changed.
    pub fn fail(&self) -> bool {
        let mut state = self.write();
        match *state {
            ConnectionState::Closing | ConnectionState::Closed | ConnectionState::Failed => false,
            _ => {
                *state = ConnectionState::Failed;
                true
            }
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, ConnectionState> {
        self.state.write().unwrap_or_else(|poisoned| {
            warn!(
                target: "godot_bridge::lock_recovery",
                "Recovered from poisoned state lock in LinkStatus"
            );
            poisoned.into_inner()
        })
    }
}

/// What `ensure_ready` does with the current connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SessionAction {
    /// No usable connection; open one
    Connect,
    /// Current connection is Ready
    Reuse,
    /// Connection failed; discard it and report the loss to this caller
    SurfaceLoss,
    /// Connection failed; discard it and connect once more
    Reconnect,
    /// A state the caller cannot proceed from
    FailFast(&'static str),
}

/// Decide what `ensure_ready` does based on the current connection state.
///
/// - `None`/`Closed`: nothing to reuse → Connect
/// - `Ready` → Reuse
/// - `Failed` → SurfaceLoss (FailFast policy) or Reconnect (ReconnectOnce)
/// - `Connecting`/`Authenticating`: only visible outside the establish lock
///   if establishment was abandoned → FailFast
/// - `Closing` → FailFast
pub(crate) fn decide_session_action(
    state: Option<ConnectionState>,
    policy: ReconnectPolicy,
) -> SessionAction {
    match state {
        None | Some(ConnectionState::Closed) => SessionAction::Connect,
        Some(ConnectionState::Ready) => SessionAction::Reuse,
        Some(ConnectionState::Failed) => match policy {
            ReconnectPolicy::FailFast => SessionAction::SurfaceLoss,
            ReconnectPolicy::ReconnectOnce => SessionAction::Reconnect,
        },
        Some(ConnectionState::Connecting) | Some(ConnectionState::Authenticating) => {
            SessionAction::FailFast("connection establishment still in progress")
        }
        Some(ConnectionState::Closing) => SessionAction::FailFast("connection closing"),
    }
}
