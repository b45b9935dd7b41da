//! Request/response correlation for one connection.
//!
//! The Correlator allocates request ids, tracks in-flight requests and hands
//! each incoming response to the caller waiting for it:
//! - Before sending, the caller registers to get a `PendingEntry`
//! - The reader task calls `resolve(id, outcome)` when a response arrives
//! - The caller awaits its entry without holding any lock
//! - Dropping an unresolved entry removes it from the map
//!
//! All state sits behind a single mutex that is held only while the map is
//! mutated; outcomes are delivered through oneshot channels after the lock
//! has been released. Once `drain_all` has run the correlator is closed and
//! `register` fails with the drain failure.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use log::{debug, warn};
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::Instant;

use super::protocol::RequestId;
use crate::error::BridgeError;

/// What a pending request eventually resolves to.
pub type Outcome = Result<Value, BridgeError>;

/// Stand-in deadline for timeouts too large to add to the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Deadline `timeout` from now, saturating instead of overflowing.
pub fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Bookkeeping for one outstanding request, held by the caller.
///
/// Carries the receiving side of the single-resolution completion slot.
/// Dropping it before an outcome arrives removes the slot, so abandoned
/// calls do not accumulate.
#[derive(Debug)]
pub struct PendingEntry {
    id: RequestId,
    deadline: Instant,
    rx: oneshot::Receiver<Outcome>,
    correlator: Weak<Correlator>,
    settled: bool,
}

impl PendingEntry {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Wait for the outcome.
    ///
    /// Fails with `ConnectionLost` if the slot was dropped unresolved, which
    /// happens only when the whole connection is torn down.
    pub async fn wait(mut self) -> Outcome {
        let outcome = match (&mut self.rx).await {
            Ok(outcome) => outcome,
            Err(_) => Err(BridgeError::connection_lost(
                "connection dropped before a response arrived",
            )),
        };
        self.settled = true;
        outcome
    }
}

impl Drop for PendingEntry {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Some(correlator) = self.correlator.upgrade()
            && correlator.cancel(self.id)
        {
            debug!(
                target: "godot_bridge::bridge::correlator",
                "Request {} abandoned by its caller, removed",
                self.id
            );
        }
    }
}

struct Slot {
    tx: oneshot::Sender<Outcome>,
    method: String,
}

#[derive(Default)]
struct Pending {
    slots: HashMap<RequestId, Slot>,
    /// Set by `drain_all`; later registrations fail with it
    closed: Option<BridgeError>,
}

/// Routes outcomes to pending requests by id.
pub struct Correlator {
    next_id: AtomicU64,
    pending: Mutex<Pending>,
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}

impl Correlator {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: Mutex::new(Pending::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(|poisoned| {
            warn!(
                target: "godot_bridge::lock_recovery",
                "Recovered from poisoned lock in Correlator"
            );
            poisoned.into_inner()
        })
    }

    /// Allocate a fresh id and register a pending entry for it.
    ///
    /// Ids increase monotonically for the lifetime of the connection, so an
    /// id is never handed out twice. Fails with the drain failure once the
    /// correlator has been drained.
    pub fn register(
        self: &Arc<Self>,
        method: &str,
        deadline: Instant,
    ) -> Result<PendingEntry, BridgeError> {
        let (tx, rx) = oneshot::channel();
        let id = {
            let mut pending = self.lock();
            if let Some(failure) = &pending.closed {
                return Err(failure.clone());
            }
            let id = RequestId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
            let previous = pending.slots.insert(
                id,
                Slot {
                    tx,
                    method: method.to_owned(),
                },
            );
            debug_assert!(previous.is_none(), "request id {} registered twice", id);
            id
        };
        Ok(PendingEntry {
            id,
            deadline,
            rx,
            correlator: Arc::downgrade(self),
            settled: false,
        })
    }

    /// Resolve the pending entry for `id`.
    ///
    /// Returns `false` when no entry is pending for `id` (unknown id, already
    /// resolved, cancelled) or when its caller stopped waiting. Never fatal.
    pub fn resolve(&self, id: RequestId, outcome: Outcome) -> bool {
        let slot = self.lock().slots.remove(&id);
        match slot {
            Some(slot) => {
                if slot.tx.send(outcome).is_ok() {
                    true
                } else {
                    debug!(
                        target: "godot_bridge::bridge::correlator",
                        "Caller of {} (id {}) stopped waiting, response dropped",
                        slot.method,
                        id
                    );
                    false
                }
            }
            None => {
                warn!(
                    target: "godot_bridge::bridge::correlator",
                    "Response for unknown or already-resolved request {}, discarding",
                    id
                );
                false
            }
        }
    }

    /// Remove a pending entry without resolving it (timeout, send failure).
    ///
    /// Returns `true` if the entry was still pending.
    pub fn cancel(&self, id: RequestId) -> bool {
        self.lock().slots.remove(&id).is_some()
    }

    /// Resolve every pending entry with the same failure and close the
    /// correlator to new registrations.
    ///
    /// Used on disconnect and shutdown so no caller waits forever. Returns
    /// the number of entries drained. The first failure recorded is kept.
    pub fn drain_all(&self, failure: &BridgeError) -> usize {
        let entries: Vec<_> = {
            let mut pending = self.lock();
            if pending.closed.is_none() {
                pending.closed = Some(failure.clone());
            }
            pending.slots.drain().collect()
        };

        // Lock released before delivering
        let drained = entries.len();
        for (id, slot) in entries {
            debug!(
                target: "godot_bridge::bridge::correlator",
                "Failing {} (id {}): {}",
                slot.method,
                id,
                failure
            );
            let _ = slot.tx.send(Err(failure.clone()));
        }
        drained
    }

    pub fn pending_count(&self) -> usize {
        self.lock().slots.len()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed.is_some()
    }
}
