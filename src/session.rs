//! Session registry for remote harvester instances.
//!
//! The remote context owns the actual harvester instance; the panel never
//! holds a reference to it. This registry keys instance state by
//! remote-context identity and performs an explicit existence check before
//! construction, so bootstrapping is idempotent within one remote-context
//! lifetime: a second call never re-constructs or discards in-progress
//! state held by an existing instance.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::channel::RemoteExecutionChannel;
use crate::error::BridgeError;
use crate::protocol::{Command, CommandEnvelope};

/// Marker in the remote context's location that enables debug harvesting.
pub const DEBUG_MARKER: &str = "#harvest-debug";

/// Identity of a remote execution context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteContext {
    /// Stable id for the context's lifetime (e.g. a connection or tab id).
    pub id: String,
    /// Current location of the remote context, inspected for [`DEBUG_MARKER`].
    pub location: String,
}

/// State tracked for one bootstrapped harvester instance.
#[derive(Clone, Debug)]
pub struct SessionState {
    pub context_id: String,
    pub debug: bool,
    pub started_at: DateTime<Utc>,
}

/// Thread-safe registry of bootstrapped sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionState>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure exactly one harvester instance exists for this context.
    ///
    /// Dispatches a bootstrap command only when no session is registered
    /// for the context id. Returns true when a new instance was
    /// constructed, false when an existing one was reused.
    pub fn ensure_instance(
        &self,
        channel: &dyn RemoteExecutionChannel,
        ctx: &RemoteContext,
    ) -> Result<bool, BridgeError> {
        // Existence check and insertion stay under one write lock so two
        // callers cannot both construct.
        let mut sessions = self.sessions.write().expect("session map poisoned");

        if sessions.contains_key(&ctx.id) {
            debug!(context_id = %ctx.id, "Reusing existing harvester instance");
            return Ok(false);
        }

        // Named debug_enabled rather than debug: a local called `debug`
        // collides with `tracing::field::debug` in the info! expansion.
        let debug_enabled = ctx.location.contains(DEBUG_MARKER);
        let envelope = CommandEnvelope::new(Command::Bootstrap {
            debug: debug_enabled,
        });
        channel.dispatch(&envelope, None)?;

        sessions.insert(
            ctx.id.clone(),
            SessionState {
                context_id: ctx.id.clone(),
                debug: debug_enabled,
                started_at: Utc::now(),
            },
        );

        info!(context_id = %ctx.id, debug = debug_enabled, "Bootstrapped harvester instance");
        Ok(true)
    }

    /// Look up the session for a context id.
    pub fn get(&self, context_id: &str) -> Option<SessionState> {
        self.sessions
            .read()
            .expect("session map poisoned")
            .get(context_id)
            .cloned()
    }

    /// Forget a session when its remote context ends.
    pub fn remove(&self, context_id: &str) {
        let mut sessions = self.sessions.write().expect("session map poisoned");
        if sessions.remove(context_id).is_some() {
            debug!(context_id = %context_id, "Removed session for ended context");
        }
    }

    pub fn active_count(&self) -> usize {
        self.sessions.read().expect("session map poisoned").len()
    }
}
