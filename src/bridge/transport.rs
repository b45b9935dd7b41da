//! WebSocket transport to the editor.
//!
//! `open` returns the two halves of one connection:
//! - `TransportWriter` sends frames (callers serialize access to it)
//! - `TransportReader` yields incoming frames until the connection ends
//!
//! Both halves share a state signal that moves from `Open` to a terminal
//! `Closed` (closure requested locally) or `Failed` (I/O error or the peer
//! went away). The transport never retries; that policy belongs to the
//! session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use log::{debug, warn};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::config::Endpoint;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Transport-level connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Open,
    /// Closed after a local close request
    Closed,
    /// Ended by an I/O error or by the peer
    Failed,
}

/// The transport could not be established.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("invalid WebSocket URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("connection timed out after {0:?}")]
    TimedOut(Duration),

    #[error("{0}")]
    Failed(#[source] tungstenite::Error),
}

/// A frame could not be sent.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("connection is not open ({0:?})")]
    NotOpen(TransportState),

    #[error("write failed: {0}")]
    Io(#[source] tungstenite::Error),
}

/// State shared by both halves of one connection.
struct Signal {
    state: watch::Sender<TransportState>,
    close_requested: AtomicBool,
}

impl Signal {
    fn current(&self) -> TransportState {
        *self.state.borrow()
    }

    /// Move out of `Open` exactly once; later transitions are ignored.
    fn end(&self, terminal: TransportState) {
        self.state.send_if_modified(|state| {
            if *state == TransportState::Open {
                *state = terminal;
                true
            } else {
                false
            }
        });
    }

    /// The incoming sequence ended: Closed if we asked for it, Failed otherwise.
    fn finish(&self) {
        if self.close_requested.load(Ordering::Acquire) {
            self.end(TransportState::Closed);
        } else {
            self.end(TransportState::Failed);
        }
    }
}

/// Open a WebSocket connection to the endpoint.
pub async fn open(
    endpoint: &Endpoint,
    connect_timeout: Duration,
) -> Result<(TransportWriter, TransportReader), ConnectError> {
    validate_ws_url(endpoint.url())?;

    let (stream, _response) = tokio::time::timeout(connect_timeout, connect_async(endpoint.url()))
        .await
        .map_err(|_| ConnectError::TimedOut(connect_timeout))?
        .map_err(ConnectError::Failed)?;

    debug!(
        target: "godot_bridge::bridge::transport",
        "WebSocket open to {}",
        endpoint.url()
    );

    let (sink, stream) = stream.split();
    let (state, _) = watch::channel(TransportState::Open);
    let signal = Arc::new(Signal {
        state,
        close_requested: AtomicBool::new(false),
    });

    Ok((
        TransportWriter {
            sink,
            signal: Arc::clone(&signal),
        },
        TransportReader {
            stream,
            signal,
            ended: false,
        },
    ))
}

/// Reject anything that is not a `ws://` or `wss://` URL before touching the network.
pub(crate) fn validate_ws_url(raw: &str) -> Result<(), ConnectError> {
    let parsed = url::Url::parse(raw).map_err(|e| ConnectError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "ws" | "wss" => Ok(()),
        other => Err(ConnectError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

/// Sending half of a connection.
pub struct TransportWriter {
    sink: SplitSink<WsStream, Message>,
    signal: Arc<Signal>,
}

impl TransportWriter {
    pub fn state(&self) -> TransportState {
        self.signal.current()
    }

    /// Watch the connection state.
    pub fn subscribe(&self) -> watch::Receiver<TransportState> {
        self.signal.state.subscribe()
    }

    /// Send one frame. UTF-8 payloads go out as text frames.
    pub async fn send(&mut self, frame: Vec<u8>) -> Result<(), SendError> {
        let state = self.signal.current();
        if state != TransportState::Open {
            return Err(SendError::NotOpen(state));
        }

        let message = match String::from_utf8(frame) {
            Ok(text) => Message::text(text),
            Err(e) => Message::binary(e.into_bytes()),
        };

        if let Err(e) = self.sink.send(message).await {
            warn!(
                target: "godot_bridge::bridge::transport",
                "Write error: {}",
                e
            );
            self.signal.end(TransportState::Failed);
            return Err(SendError::Io(e));
        }
        Ok(())
    }

    /// Request closure: sends a close frame and marks the connection Closed.
    pub async fn close(&mut self) {
        self.signal.close_requested.store(true, Ordering::Release);
        if let Err(e) = self.sink.close().await {
            debug!(
                target: "godot_bridge::bridge::transport",
                "Close handshake error (ignored): {}",
                e
            );
        }
        self.signal.end(TransportState::Closed);
    }
}

/// Receiving half of a connection.
pub struct TransportReader {
    stream: SplitStream<WsStream>,
    signal: Arc<Signal>,
    ended: bool,
}

impl TransportReader {
    pub fn state(&self) -> TransportState {
        self.signal.current()
    }

    /// Next incoming frame, or `None` once the connection has ended.
    ///
    /// The sequence is not restartable: after the first `None` every later
    /// call returns `None` immediately.
    pub async fn next_frame(&mut self) -> Option<Vec<u8>> {
        if self.ended {
            return None;
        }
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Some(text.as_bytes().to_vec()),
                Some(Ok(Message::Binary(bytes))) => return Some(bytes.to_vec()),
                // Ping/pong replies are handled inside tungstenite
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Ok(Message::Close(frame))) => {
                    debug!(
                        target: "godot_bridge::bridge::transport",
                        "Close frame received: {:?}",
                        frame
                    );
                    self.ended = true;
                    self.signal.finish();
                    return None;
                }
                Some(Err(e)) => {
                    if !self.signal.close_requested.load(Ordering::Acquire) {
                        warn!(
                            target: "godot_bridge::bridge::transport",
                            "Read error: {}",
                            e
                        );
                    }
                    self.ended = true;
                    self.signal.finish();
                    return None;
                }
                None => {
                    self.ended = true;
                    self.signal.finish();
                    return None;
                }
            }
        }
    }
}
