//! One live connection as seen by the session.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::Mutex;

use super::state::{ConnectionState, LinkStatus};
use crate::bridge::correlator::Correlator;
use crate::bridge::notification::NotificationObserver;
use crate::bridge::protocol::{Request, encode};
use crate::bridge::reader::{ReaderContext, ReaderTaskHandle, spawn_reader_task};
use crate::bridge::transport::{self, SendError, TransportWriter};
use crate::config::{BridgeSettings, Endpoint};
use crate::error::BridgeError;

/// A transport plus everything scoped to it: state, correlator, reader task.
///
/// Writes are serialized by the writer mutex, held for one frame.
pub(crate) struct Link {
    generation: u64,
    status: Arc<LinkStatus>,
    writer: Mutex<TransportWriter>,
    correlator: Arc<Correlator>,
    reader: ReaderTaskHandle,
    editor_version: OnceLock<String>,
}

impl Link {
    /// Open the transport and start its reader task. The link starts in
    /// `Connecting` and must be authenticated before use.
    pub(crate) async fn open(
        endpoint: &Endpoint,
        settings: &BridgeSettings,
        observer: Arc<dyn NotificationObserver>,
        generation: u64,
    ) -> Result<Self, BridgeError> {
        let (writer, reader) = transport::open(endpoint, settings.connect_timeout)
            .await
            .map_err(|e| BridgeError::connect(endpoint.url(), e))?;

        let status = Arc::new(LinkStatus::new(ConnectionState::Connecting));
        let correlator = Arc::new(Correlator::new());
        let reader = spawn_reader_task(
            reader,
            ReaderContext {
                correlator: Arc::clone(&correlator),
                status: Arc::clone(&status),
                observer,
                decode_errors: settings.decode_errors,
            },
        );

        debug!(
            target: "godot_bridge::bridge::session",
            "Link {} open to {}",
            generation,
            endpoint.url()
        );

        Ok(Self {
            generation,
            status,
            writer: Mutex::new(writer),
            correlator,
            reader,
            editor_version: OnceLock::new(),
        })
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.status.get()
    }

    pub(crate) fn status(&self) -> &LinkStatus {
        &self.status
    }

    pub(crate) fn correlator(&self) -> &Arc<Correlator> {
        &self.correlator
    }

    pub(crate) fn editor_version(&self) -> Option<&str> {
        self.editor_version.get().map(String::as_str)
    }

    /// Record a successful handshake. Fails if the transport died meanwhile.
    pub(crate) fn mark_ready(&self, editor_version: Option<String>) -> Result<(), BridgeError> {
        if let Some(version) = editor_version {
            let _ = self.editor_version.set(version);
        }
        if self
            .status
            .transition(ConnectionState::Authenticating, ConnectionState::Ready)
        {
            Ok(())
        } else {
            Err(BridgeError::connection_lost(format!(
                "connection became {} during authentication",
                self.state().as_str()
            )))
        }
    }

    /// Encode and send one request.
    ///
    /// A write failure fails the whole link: every pending call is resolved
    /// with `ConnectionLost`, including the one being sent.
    pub(crate) async fn send(&self, request: &Request) -> Result<(), BridgeError> {
        let frame = encode(request);
        let result = self.writer.lock().await.send(frame).await;

        match result {
            Ok(()) => Ok(()),
            Err(SendError::NotOpen(state)) => Err(BridgeError::connection_lost(format!(
                "connection is {:?}",
                state
            ))),
            Err(e @ SendError::Io(_)) => {
                let failure = BridgeError::connection_lost(e.to_string());
                if self.status.fail() {
                    warn!(
                        target: "godot_bridge::bridge::session",
                        "Link {} failed while sending {}",
                        self.generation,
                        request.method
                    );
                }
                self.correlator.drain_all(&failure);
                Err(failure)
            }
        }
    }

    /// Close the link: pending calls fail with `Shutdown`, the close
    /// handshake is bounded by `grace`, and the reader task stops.
    pub(crate) async fn close(&self, grace: Duration) {
        self.status.set(ConnectionState::Closing);
        let drained = self.correlator.drain_all(&BridgeError::Shutdown);
        if drained > 0 {
            debug!(
                target: "godot_bridge::bridge::session",
                "Link {} closing with {} pending request(s)",
                self.generation,
                drained
            );
        }

        let closed = tokio::time::timeout(grace, async {
            self.writer.lock().await.close().await;
        })
        .await;
        if closed.is_err() {
            warn!(
                target: "godot_bridge::bridge::session",
                "Link {} close handshake did not finish within {:?}",
                self.generation,
                grace
            );
        }

        self.reader.cancel();
        self.status.set(ConnectionState::Closed);
    }
}
