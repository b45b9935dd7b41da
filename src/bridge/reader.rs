//! Reader task for one editor connection.
//!
//! The Reader Task:
//! - Runs in a spawned tokio task and is the only reader of the transport
//! - Decodes every frame and routes responses through the Correlator
//! - Hands notifications to the NotificationObserver
//! - On end of stream marks the connection Failed and drains pending calls
//! - Stops on cancellation without touching pending calls

use std::sync::Arc;

use log::{debug, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::correlator::Correlator;
use super::notification::NotificationObserver;
use super::protocol::{Inbound, decode};
use super::session::LinkStatus;
use super::transport::TransportReader;
use crate::config::DecodeErrorPolicy;
use crate::error::BridgeError;

/// Handle to a running Reader Task. Dropping it stops the task.
pub(crate) struct ReaderTaskHandle {
    /// Join handle for the reader task (dropped on struct drop)
    _join_handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

impl ReaderTaskHandle {
    pub(crate) fn cancel(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for ReaderTaskHandle {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

/// Everything the reader needs besides the transport.
pub(crate) struct ReaderContext {
    pub correlator: Arc<Correlator>,
    pub status: Arc<LinkStatus>,
    pub observer: Arc<dyn NotificationObserver>,
    pub decode_errors: DecodeErrorPolicy,
}

/// Spawn the reader task for a freshly opened transport.
pub(crate) fn spawn_reader_task(reader: TransportReader, context: ReaderContext) -> ReaderTaskHandle {
    let cancel_token = CancellationToken::new();
    let join_handle = tokio::spawn(reader_loop(reader, context, cancel_token.clone()));

    ReaderTaskHandle {
        _join_handle: join_handle,
        cancel_token,
    }
}

async fn reader_loop(
    mut reader: TransportReader,
    context: ReaderContext,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                debug!(
                    target: "godot_bridge::bridge::reader",
                    "Reader task cancelled, shutting down"
                );
                return;
            }

            frame = reader.next_frame() => {
                match frame {
                    Some(frame) => {
                        if !handle_frame(&frame, &context) {
                            return;
                        }
                    }
                    None => {
                        if context.status.fail() {
                            warn!(
                                target: "godot_bridge::bridge::reader",
                                "Connection to the editor lost, failing pending requests"
                            );
                        }
                        context.correlator.drain_all(&BridgeError::connection_lost(
                            "connection to the editor closed",
                        ));
                        return;
                    }
                }
            }
        }
    }
}

/// Handle one incoming frame. Returns `false` when the reader must stop.
fn handle_frame(frame: &[u8], context: &ReaderContext) -> bool {
    match decode(frame) {
        Ok(Inbound::Response(response)) => {
            // The Correlator logs undeliverable responses itself
            context
                .correlator
                .resolve(response.id, response.outcome.into_result());
            true
        }
        Ok(Inbound::Notification(notification)) => {
            context.observer.on_notification(&notification);
            true
        }
        Err(e) => match context.decode_errors {
            DecodeErrorPolicy::Tolerate => {
                warn!(
                    target: "godot_bridge::bridge::reader",
                    "Discarding undecodable frame: {}",
                    e
                );
                true
            }
            DecodeErrorPolicy::FailConnection => {
                warn!(
                    target: "godot_bridge::bridge::reader",
                    "Undecodable frame, failing connection: {}",
                    e
                );
                context.status.fail();
                context
                    .correlator
                    .drain_all(&BridgeError::protocol(e.to_string()));
                false
            }
        },
    }
}
