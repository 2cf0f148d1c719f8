//! Event bus routing inbound tagged messages.
//!
//! A message is accepted only when its sender identity equals this panel's
//! own identity AND its key is recognized; anything else is silently
//! dropped (debug-level diagnostics only, no error). `ack` and `failed`
//! reports resolve the pending-request table; other recognized keys go to
//! the handler registered for them.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::correlation::{RequestOutcome, RequestTracker};
use crate::protocol::{
    AckReport, FailureReport, InboundMessage, KEY_ACK, KEY_FAILED,
};

type Handler = Box<dyn Fn(serde_json::Value) + Send + Sync>;

/// Routes inbound messages to handlers and the request tracker.
pub struct EventBus {
    identity: String,
    tracker: Arc<RequestTracker>,
    handlers: RwLock<HashMap<String, Handler>>,
}

impl EventBus {
    pub fn new(identity: impl Into<String>, tracker: Arc<RequestTracker>) -> Self {
        Self {
            identity: identity.into(),
            tracker,
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Identity this bus accepts on inbound messages.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Register a handler for a message key.
    ///
    /// The handler receives the raw `value` payload and is responsible for
    /// deserializing it; a replaced handler for the same key is dropped.
    pub fn register_handler<F>(&self, key: impl Into<String>, handler: F)
    where
        F: Fn(serde_json::Value) + Send + Sync + 'static,
    {
        let mut handlers = self.handlers.write().expect("handler map poisoned");
        handlers.insert(key.into(), Box::new(handler));
    }

    /// Remove the handler for a key, if any.
    pub fn unregister_handler(&self, key: &str) {
        let mut handlers = self.handlers.write().expect("handler map poisoned");
        handlers.remove(key);
    }

    /// Route one inbound message.
    pub fn on_message(&self, msg: InboundMessage) {
        if msg.sender != self.identity {
            debug!(sender = %msg.sender, key = %msg.key, "Dropping message from foreign sender");
            return;
        }

        match msg.key.as_str() {
            KEY_ACK => match msg.payload::<AckReport>() {
                Ok(report) => {
                    debug!(request_id = %report.id, "Remote acknowledged command");
                    self.tracker
                        .resolve(&report.id, RequestOutcome::Completed(msg.value));
                }
                Err(e) => warn!(error = %e, "Invalid ack payload, dropping"),
            },
            KEY_FAILED => match msg.payload::<FailureReport>() {
                Ok(report) => {
                    warn!(request_id = %report.id, message = %report.message, "Remote reported failure");
                    self.tracker
                        .resolve(&report.id, RequestOutcome::Failed(report.message));
                }
                Err(e) => warn!(error = %e, "Invalid failure payload, dropping"),
            },
            key => {
                let handlers = self.handlers.read().expect("handler map poisoned");
                match handlers.get(key) {
                    Some(handler) => handler(msg.value),
                    None => {
                        debug!(key = %key, "Dropping message with unrecognized key");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{LocaleReport, KEY_LOCALES};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn bus_with_tracker() -> (Arc<RequestTracker>, EventBus) {
        let tracker = Arc::new(RequestTracker::new());
        let bus = EventBus::new("harvest-bridge", Arc::clone(&tracker));
        (tracker, bus)
    }

    fn message(sender: &str, key: &str, value: serde_json::Value) -> InboundMessage {
        InboundMessage {
            sender: sender.to_string(),
            key: key.to_string(),
            value,
        }
    }

    #[test]
    fn test_foreign_sender_dropped_regardless_of_key() {
        let (_tracker, bus) = bus_with_tracker();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        bus.register_handler(KEY_LOCALES, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.on_message(message(
            "someone-else",
            KEY_LOCALES,
            serde_json::json!({"supported": ["en"], "user": "en"}),
        ));

        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unknown_key_dropped_regardless_of_sender() {
        let (_tracker, bus) = bus_with_tracker();
        // No handler registered for this key; must not panic or error
        bus.on_message(message("harvest-bridge", "unknown", serde_json::json!(42)));
    }

    #[test]
    fn test_locales_routes_to_registered_handler() {
        let (_tracker, bus) = bus_with_tracker();
        let received = Arc::new(Mutex::new(None));

        let sink = Arc::clone(&received);
        bus.register_handler(KEY_LOCALES, move |value| {
            let report: LocaleReport = serde_json::from_value(value).unwrap();
            *sink.lock().unwrap() = Some(report);
        });

        bus.on_message(message(
            "harvest-bridge",
            KEY_LOCALES,
            serde_json::json!({"supported": ["en", "de"], "user": "fr"}),
        ));

        let report = received.lock().unwrap().take().unwrap();
        assert_eq!(report.user, "fr");
        assert_eq!(report.supported, vec!["en", "de"]);
    }

    #[test]
    fn test_ack_resolves_pending_request() {
        let (tracker, bus) = bus_with_tracker();
        let rx = tracker.register("req-1");

        bus.on_message(message(
            "harvest-bridge",
            KEY_ACK,
            serde_json::json!({"id": "req-1"}),
        ));

        let value = tracker
            .await_response("req-1", rx, std::time::Duration::from_millis(100))
            .unwrap();
        assert_eq!(value["id"], "req-1");
    }

    #[test]
    fn test_failed_resolves_pending_request_as_failure() {
        let (tracker, bus) = bus_with_tracker();
        let rx = tracker.register("req-2");

        bus.on_message(message(
            "harvest-bridge",
            KEY_FAILED,
            serde_json::json!({"id": "req-2", "message": "no data"}),
        ));

        let err = tracker
            .await_response("req-2", rx, std::time::Duration::from_millis(100))
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::BridgeError::RemoteExecutionFailed { .. }
        ));
    }

    #[test]
    fn test_invalid_ack_payload_dropped() {
        let (tracker, bus) = bus_with_tracker();
        let _rx = tracker.register("req-3");

        bus.on_message(message(
            "harvest-bridge",
            KEY_ACK,
            serde_json::json!("not an object"),
        ));

        // The pending request is untouched
        assert_eq!(tracker.pending_count(), 1);
    }

    #[test]
    fn test_unregister_handler() {
        let (_tracker, bus) = bus_with_tracker();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        bus.register_handler(KEY_LOCALES, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        bus.unregister_handler(KEY_LOCALES);

        bus.on_message(message(
            "harvest-bridge",
            KEY_LOCALES,
            serde_json::json!({"supported": [], "user": "en"}),
        ));

        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
