//! Connection lifecycle: connect, authenticate, reuse, reconnect, shut down.
//!
//! ## Module Structure
//!
//! - `state` - ConnectionState, LinkStatus and the pure `ensure_ready` decision
//! - `link` - One live connection (transport, correlator, reader task)
//! - `handshake` - `auth.hello` on a fresh link
//!
//! At most one link is current. Establishment is serialized by a mutex and
//! callers re-check the current link after acquiring it, so concurrent
//! `ensure_ready` calls never open two connections.

mod handshake;
mod link;
mod state;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwapOption;
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use super::notification::NotificationObserver;
use crate::config::{BridgeSettings, Endpoint};
use crate::error::BridgeError;

pub(crate) use link::Link;
pub use state::{ConnectionState, LinkStatus};
use state::{SessionAction, decide_session_action};

/// Snapshot reported by `status()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    /// State of the current link, `None` when there is none
    pub state: Option<ConnectionState>,
    pub authenticated: bool,
    pub url: String,
    pub editor_version: Option<String>,
    /// Calls awaiting a response on the current link
    pub pending: usize,
    pub shut_down: bool,
}

/// One authenticated connection lifecycle and its reconnection policy.
pub struct Session {
    endpoint: Endpoint,
    settings: BridgeSettings,
    observer: Arc<dyn NotificationObserver>,
    current: ArcSwapOption<Link>,
    establish: tokio::sync::Mutex<()>,
    auth_rejection: Mutex<Option<BridgeError>>,
    shutdown: CancellationToken,
    generation: AtomicU64,
}

impl Session {
    pub fn new(
        endpoint: Endpoint,
        settings: BridgeSettings,
        observer: Arc<dyn NotificationObserver>,
    ) -> Self {
        Self {
            endpoint,
            settings,
            observer,
            current: ArcSwapOption::empty(),
            establish: tokio::sync::Mutex::new(()),
            auth_rejection: Mutex::new(None),
            shutdown: CancellationToken::new(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    /// Return a Ready link, connecting and authenticating if needed.
    pub(crate) async fn ensure_ready(&self) -> Result<Arc<Link>, BridgeError> {
        if let Some(link) = self.ready_link() {
            return Ok(link);
        }

        let _guard = self.establish.lock().await;
        self.check_usable()?;

        let current = self.current.load_full();
        let action = decide_session_action(
            current.as_ref().map(|link| link.state()),
            self.settings.reconnect,
        );

        match (action, current) {
            (SessionAction::Reuse, Some(link)) => Ok(link),
            (SessionAction::FailFast(reason), _) => Err(BridgeError::connection_lost(reason)),
            (SessionAction::SurfaceLoss, stale) => {
                self.discard(stale).await;
                Err(BridgeError::connection_lost(
                    "connection to the editor was lost; the next call reconnects",
                ))
            }
            (SessionAction::Reconnect, stale) => {
                info!(
                    target: "godot_bridge::bridge::session",
                    "Reconnecting to {} after connection loss",
                    self.endpoint.url()
                );
                self.discard(stale).await;
                self.connect().await
            }
            (_, stale) => {
                self.discard(stale).await;
                self.connect().await
            }
        }
    }

    fn ready_link(&self) -> Option<Arc<Link>> {
        if self.shutdown.is_cancelled() {
            return None;
        }
        self.current
            .load_full()
            .filter(|link| link.state() == ConnectionState::Ready)
    }

    fn check_usable(&self) -> Result<(), BridgeError> {
        if self.shutdown.is_cancelled() {
            return Err(BridgeError::Shutdown);
        }
        match self.lock_auth_rejection().as_ref() {
            Some(rejection) => Err(rejection.clone()),
            None => Ok(()),
        }
    }

    /// Drop a stale link if it is still current.
    async fn discard(&self, stale: Option<Arc<Link>>) {
        let Some(stale) = stale else {
            return;
        };
        let previous = self
            .current
            .compare_and_swap(&Some(Arc::clone(&stale)), None::<Arc<Link>>);
        if matches!(&*previous, Some(link) if Arc::ptr_eq(link, &stale)) {
            debug!(
                target: "godot_bridge::bridge::session",
                "Discarding link {} ({})",
                stale.generation(),
                stale.state().as_str()
            );
            stale.close(self.settings.shutdown_timeout).await;
        }
    }

    /// Open and authenticate a new link; caller holds the establish lock.
    async fn connect(&self) -> Result<Arc<Link>, BridgeError> {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(
            target: "godot_bridge::bridge::session",
            "Connecting to {} (link {})",
            self.endpoint.url(),
            generation
        );

        let link = tokio::select! {
            _ = self.shutdown.cancelled() => return Err(BridgeError::Shutdown),
            result = self.open_authenticated(generation) => result?,
        };

        let link = Arc::new(link);
        self.current.store(Some(Arc::clone(&link)));

        // Shutdown may have swapped `current` out just before the store
        if self.shutdown.is_cancelled() {
            if let Some(link) = self.current.swap(None) {
                link.close(self.settings.shutdown_timeout).await;
            }
            return Err(BridgeError::Shutdown);
        }

        info!(
            target: "godot_bridge::bridge::session",
            "Connected to {} (editor {})",
            self.endpoint.url(),
            link.editor_version().unwrap_or("unknown")
        );
        Ok(link)
    }

    async fn open_authenticated(&self, generation: u64) -> Result<Link, BridgeError> {
        let link = Link::open(
            &self.endpoint,
            &self.settings,
            Arc::clone(&self.observer),
            generation,
        )
        .await?;

        let accepted = match handshake::authenticate(
            &link,
            self.endpoint.token(),
            self.settings.handshake_timeout,
        )
        .await
        {
            Ok(accepted) => accepted,
            Err(err) => {
                if matches!(err, BridgeError::Auth { .. }) {
                    warn!(
                        target: "godot_bridge::bridge::session",
                        "Editor rejected authentication: {}",
                        err
                    );
                    *self.lock_auth_rejection() = Some(err.clone());
                }
                link.close(self.settings.shutdown_timeout).await;
                return Err(err);
            }
        };

        link.mark_ready(accepted.editor_version)?;
        Ok(link)
    }

    /// Forget a previous authentication rejection so the next call retries.
    pub fn reset_auth(&self) {
        if self.lock_auth_rejection().take().is_some() {
            debug!(
                target: "godot_bridge::bridge::session",
                "Authentication rejection cleared"
            );
        }
    }

    /// Close the current link and refuse further calls.
    ///
    /// Pending calls resolve with `Shutdown`. Idempotent.
    pub async fn shutdown(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        self.shutdown.cancel();

        if let Some(link) = self.current.swap(None) {
            debug!(
                target: "godot_bridge::bridge::session",
                "Shutting down link {}",
                link.generation()
            );
            link.close(self.settings.shutdown_timeout).await;
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn status(&self) -> SessionStatus {
        let current = self.current.load_full();
        let state = current.as_ref().map(|link| link.state());
        SessionStatus {
            state,
            authenticated: state == Some(ConnectionState::Ready),
            url: self.endpoint.url().to_string(),
            editor_version: current
                .as_ref()
                .and_then(|link| link.editor_version().map(str::to_owned)),
            pending: current
                .as_ref()
                .map_or(0, |link| link.correlator().pending_count()),
            shut_down: self.shutdown.is_cancelled(),
        }
    }

    fn lock_auth_rejection(&self) -> std::sync::MutexGuard<'_, Option<BridgeError>> {
        self.auth_rejection.lock().unwrap_or_else(|poisoned| {
            warn!(
                target: "godot_bridge::lock_recovery",
                "Recovered from poisoned auth lock in Session"
            );
            poisoned.into_inner()
        })
    }
}
