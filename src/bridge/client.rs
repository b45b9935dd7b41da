//! `BridgeClient`: the facade callers use to issue remote calls.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use serde_json::{Value, json};

use super::correlator::deadline_after;
use super::notification::{LogNotifications, NotificationObserver};
use super::protocol::Request;
use super::session::{Session, SessionStatus};
use crate::config::{BridgeSettings, Endpoint};
use crate::error::{BridgeError, BridgeResult};

/// Client for the editor's RPC surface.
///
/// Cheap to clone; clones share one session, so concurrent calls from any
/// number of tasks multiplex over a single connection.
#[derive(Clone)]
pub struct BridgeClient {
    session: Arc<Session>,
}

impl BridgeClient {
    /// Notifications are logged at debug level.
    pub fn new(endpoint: Endpoint, settings: BridgeSettings) -> Self {
        Self::with_observer(endpoint, settings, Arc::new(LogNotifications))
    }

    pub fn with_observer(
        endpoint: Endpoint,
        settings: BridgeSettings,
        observer: Arc<dyn NotificationObserver>,
    ) -> Self {
        Self {
            session: Arc::new(Session::new(endpoint, settings, observer)),
        }
    }

    /// Call `method` and wait at most `timeout` for its outcome.
    ///
    /// `null` params are sent as `{}`. A `Timeout` only abandons the local
    /// wait; the editor may still execute the call.
    pub async fn call(&self, method: &str, params: Value, timeout: Duration) -> BridgeResult<Value> {
        let link = self.session.ensure_ready().await?;

        let params = if params.is_null() { json!({}) } else { params };
        let deadline = deadline_after(timeout);
        let entry = link
            .correlator()
            .register(method, deadline)
            .map_err(|e| self.after_close(e))?;
        let id = entry.id();
        let request = Request::new(id, method, params, deadline);

        // Dropping `entry` (early return, timeout, or the caller abandoning
        // this future) removes it from the correlator
        link.send(&request).await.map_err(|e| self.after_close(e))?;

        debug!(
            target: "godot_bridge::bridge::client",
            "Sent {} (id {}) on link {}",
            method,
            id,
            link.generation()
        );

        match tokio::time::timeout_at(deadline, entry.wait()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                debug!(
                    target: "godot_bridge::bridge::client",
                    "{} (id {}) timed out after {:?}",
                    method,
                    id,
                    request.created_at.elapsed()
                );
                Err(BridgeError::Timeout {
                    method: method.to_string(),
                    elapsed: timeout,
                })
            }
        }
    }

    /// A link closed by `shutdown` reports `Shutdown` whatever failed first.
    fn after_close(&self, error: BridgeError) -> BridgeError {
        if self.session.is_shut_down() {
            BridgeError::Shutdown
        } else {
            error
        }
    }

    /// `call` with the configured request timeout.
    pub async fn call_default(&self, method: &str, params: Value) -> BridgeResult<Value> {
        let timeout = self.session.settings().request_timeout;
        self.call(method, params, timeout).await
    }

    /// Connect and authenticate without issuing a call.
    pub async fn connect(&self) -> BridgeResult<()> {
        self.session.ensure_ready().await.map(|_| ())
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.session.endpoint()
    }

    /// See [`Session::reset_auth`].
    pub fn reset_auth(&self) {
        self.session.reset_auth();
    }

    /// Close the connection; pending and later calls fail with `Shutdown`.
    pub async fn shutdown(&self) {
        self.session.shutdown().await;
    }
}
