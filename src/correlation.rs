//! Pending-request table for matching remote reports to dispatched commands.
//!
//! Dispatch into the remote context is fire-and-forget, so every command
//! envelope carries a correlation id and the remote side answers with an
//! `ack` or `failed` report carrying that id. This table holds a waiter per
//! outstanding id; a timeout converts an unanswered request into a declared
//! `RemoteExecutionTimeout` instead of hanging forever.

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Mutex;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::BridgeError;

/// Terminal outcome of one correlated request.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestOutcome {
    /// The remote side acknowledged the command; carries the report value.
    Completed(serde_json::Value),
    /// The remote side reported a failure with this message.
    Failed(String),
}

/// Thread-safe pending-request table.
///
/// The bus resolves entries from the channel's reader thread while callers
/// block on [`RequestTracker::await_response`].
#[derive(Debug, Default)]
pub struct RequestTracker {
    pending: Mutex<HashMap<String, mpsc::Sender<RequestOutcome>>>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request id before dispatching it.
    ///
    /// Must happen before the dispatch so a synchronous responder cannot
    /// race the registration.
    pub fn register(&self, id: &str) -> mpsc::Receiver<RequestOutcome> {
        let (tx, rx) = mpsc::channel();
        let mut pending = self.pending.lock().expect("pending map poisoned");
        if pending.insert(id.to_string(), tx).is_some() {
            warn!(request_id = %id, "Replaced an existing pending request with the same id");
        }
        rx
    }

    /// Resolve a pending request from an inbound report.
    ///
    /// Returns false when the id is unknown (already timed out, or never
    /// ours); late resolutions are dropped with a debug log.
    pub fn resolve(&self, id: &str, outcome: RequestOutcome) -> bool {
        let sender = {
            let mut pending = self.pending.lock().expect("pending map poisoned");
            pending.remove(id)
        };

        match sender {
            Some(tx) => {
                // Send can only fail if the waiter gave up between removal
                // and send; treat that like an unknown id.
                if tx.send(outcome).is_err() {
                    debug!(request_id = %id, "Waiter gone before resolution");
                    return false;
                }
                true
            }
            None => {
                debug!(request_id = %id, "Dropping resolution for unknown request id");
                false
            }
        }
    }

    /// Block until the request resolves or the timeout elapses.
    ///
    /// On timeout the entry is removed, so a later report for this id is
    /// dropped rather than delivered to nobody.
    pub fn await_response(
        &self,
        id: &str,
        rx: mpsc::Receiver<RequestOutcome>,
        timeout: Duration,
    ) -> Result<serde_json::Value, BridgeError> {
        match rx.recv_timeout(timeout) {
            Ok(RequestOutcome::Completed(value)) => Ok(value),
            Ok(RequestOutcome::Failed(message)) => Err(BridgeError::RemoteExecutionFailed {
                request_id: id.to_string(),
                message,
            }),
            Err(_) => {
                self.pending
                    .lock()
                    .expect("pending map poisoned")
                    .remove(id);
                Err(BridgeError::RemoteExecutionTimeout {
                    request_id: id.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Forget a registered request whose dispatch never happened.
    pub fn cancel(&self, id: &str) {
        self.pending
            .lock()
            .expect("pending map poisoned")
            .remove(id);
    }

    /// Number of requests still waiting for a report.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().expect("pending map poisoned").len()
    }
}
