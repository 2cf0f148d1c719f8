//! Panel controller.
//!
//! Owns the control surface's state and drives the remote harvester
//! through the execution channel. Startup is an explicit sequence - the
//! locale report and the endpoint catalog load are two visible steps here,
//! not a chain hidden inside a message handler - so initialization order
//! is testable independent of message timing:
//!
//! 1. ensure the remote harvester instance exists (bootstrap)
//! 2. request the locale report and wait for it (correlated, with timeout)
//! 3. negotiate the ordered locale list
//! 4. load the bundled endpoint catalog
//! 5. read the persisted schema-version preference
//!
//! The UI itself is a collaborator: this controller only consumes the
//! current selections and produces the option lists in [`PanelState`].

use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::bus::EventBus;
use crate::channel::RemoteExecutionChannel;
use crate::config::BridgeConfig;
use crate::correlation::RequestTracker;
use crate::endpoints::{self, EndpointDescriptor};
use crate::error::BridgeError;
use crate::locale;
use crate::preferences::{PreferenceStore, SchemaVersion};
use crate::protocol::{Command, CommandEnvelope, LocaleReport, KEY_LOCALES};
use crate::session::{RemoteContext, SessionRegistry};

/// Option lists and current selections consumed by the panel UI.
#[derive(Clone, Debug)]
pub struct PanelState {
    /// Priority-ordered locale codes; the first is the user's own locale.
    pub locales: Vec<String>,
    pub selected_locale: Option<String>,
    pub endpoints: Vec<EndpointDescriptor>,
    /// URL of the selected endpoint.
    pub selected_endpoint: Option<String>,
    pub schema_version: SchemaVersion,
    pub ready: bool,
}

impl Default for PanelState {
    fn default() -> Self {
        Self {
            locales: Vec::new(),
            selected_locale: None,
            endpoints: Vec::new(),
            selected_endpoint: None,
            schema_version: SchemaVersion::Stable,
            ready: false,
        }
    }
}

impl PanelState {
    /// An empty list disables the selector; it is never an error.
    pub fn locale_selection_enabled(&self) -> bool {
        !self.locales.is_empty()
    }

    pub fn endpoint_selection_enabled(&self) -> bool {
        !self.endpoints.is_empty()
    }

    /// Options for the schema-version selector.
    pub fn schema_version_options(&self) -> &'static [SchemaVersion] {
        &SchemaVersion::ALL
    }
}

/// Control surface driving one remote harvester.
pub struct Controller<C: RemoteExecutionChannel> {
    channel: C,
    bus: Arc<EventBus>,
    tracker: Arc<RequestTracker>,
    sessions: SessionRegistry,
    prefs: PreferenceStore,
    config: BridgeConfig,
    state: PanelState,
}

impl<C: RemoteExecutionChannel> Controller<C> {
    pub fn new(
        channel: C,
        bus: Arc<EventBus>,
        tracker: Arc<RequestTracker>,
        config: BridgeConfig,
    ) -> Self {
        let prefs = PreferenceStore::new(config.preferences_path.clone());
        Self {
            channel,
            bus,
            tracker,
            sessions: SessionRegistry::new(),
            prefs,
            config,
            state: PanelState::default(),
        }
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    /// Run the startup sequence against a remote context.
    pub fn startup(&mut self, ctx: &RemoteContext) -> Result<(), BridgeError> {
        self.sessions.ensure_instance(&self.channel, ctx)?;

        let report = self.request_locales()?;
        self.state.locales = locale::merge(&report.supported, &report.user);
        self.state.selected_locale = self.state.locales.first().cloned();

        // Explicit step, not a side effect of the locales handler
        self.state.endpoints = match endpoints::load(&self.config.endpoints_path) {
            Ok(list) => list,
            Err(e) => {
                warn!(error = %e, "Endpoint catalog unavailable, selector disabled");
                Vec::new()
            }
        };
        self.state.selected_endpoint = self.state.endpoints.first().map(|e| e.url.clone());

        self.state.schema_version = self.prefs.get(self.state.schema_version);
        self.state.ready = true;

        info!(
            locales = self.state.locales.len(),
            endpoints = self.state.endpoints.len(),
            schema_version = %self.state.schema_version,
            "Panel ready"
        );
        Ok(())
    }

    /// The remote context this controller drove has ended.
    pub fn context_closed(&mut self, context_id: &str) {
        self.sessions.remove(context_id);
        self.state.ready = false;
    }

    /// Select the harvesting locale in the remote instance.
    ///
    /// `code` must come from the panel's own locale option list.
    pub fn set_locale(&mut self, code: &str) -> Result<(), BridgeError> {
        self.dispatch_and_wait(Command::SetLocale {
            code: code.to_string(),
        })?;
        self.state.selected_locale = Some(code.to_string());
        Ok(())
    }

    /// Select the delivery endpoint in the remote instance.
    ///
    /// `url` must come from the panel's own endpoint option list.
    pub fn set_endpoint(&mut self, url: &str) -> Result<(), BridgeError> {
        self.dispatch_and_wait(Command::SetEndpoint {
            url: url.to_string(),
        })?;
        self.state.selected_endpoint = Some(url.to_string());
        Ok(())
    }

    /// Change the schema version and persist it.
    pub fn set_schema_version(&mut self, version: SchemaVersion) {
        self.state.schema_version = version;
        self.prefs.set(version);
    }

    /// Run the harvest and show the result in the remote context.
    ///
    /// On success, returns how long the panel should stay open before
    /// closing itself - a heuristic allowing the remote action to start,
    /// not a completion guarantee.
    pub fn run_and_show(&self) -> Result<Duration, BridgeError> {
        self.dispatch_and_wait(Command::RunAndShow {
            version: self.state.schema_version,
        })?;
        Ok(self.config.close_delay())
    }

    /// Run the harvest and send the result to the selected endpoint.
    pub fn run_and_send_to_endpoint(&self) -> Result<Duration, BridgeError> {
        let endpoint_url = self
            .state
            .selected_endpoint
            .clone()
            .ok_or(BridgeError::NoEndpointSelected)?;

        self.dispatch_and_wait(Command::RunAndSendToEndpoint {
            version: self.state.schema_version,
            endpoint_url,
        })?;
        Ok(self.config.close_delay())
    }

    /// Run the harvest and download the result.
    pub fn run_and_download(&self) -> Result<Duration, BridgeError> {
        self.dispatch_and_wait(Command::RunAndDownload {
            version: self.state.schema_version,
        })?;
        Ok(self.config.close_delay())
    }

    /// Request the locale report and wait for it.
    ///
    /// The `locales` report carries no correlation id on the wire, so the
    /// wait goes through a one-shot handler on the bus instead of the
    /// pending-request table; an unanswered request still times out to
    /// `RemoteExecutionTimeout`.
    fn request_locales(&self) -> Result<LocaleReport, BridgeError> {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        self.bus.register_handler(KEY_LOCALES, move |value| {
            match serde_json::from_value::<LocaleReport>(value) {
                Ok(report) => {
                    let _ = tx.lock().expect("locale sender poisoned").send(report);
                }
                Err(e) => warn!(error = %e, "Invalid locales payload, dropping"),
            }
        });

        let envelope = CommandEnvelope::new(Command::ReportLocales);
        let result = self
            .channel
            .dispatch(&envelope, None)
            .and_then(|_| {
                rx.recv_timeout(self.config.request_timeout()).map_err(|_| {
                    BridgeError::RemoteExecutionTimeout {
                        request_id: envelope.id.clone(),
                        timeout_ms: self.config.request_timeout_ms,
                    }
                })
            });

        self.bus.unregister_handler(KEY_LOCALES);
        result
    }

    /// Dispatch a command and wait for its correlated `ack`.
    fn dispatch_and_wait(&self, command: Command) -> Result<(), BridgeError> {
        let envelope = CommandEnvelope::new(command);
        debug!(request_id = %envelope.id, command = %envelope.command.name(), "Issuing command");

        // Register before dispatching so a fast responder cannot race us
        let rx = self.tracker.register(&envelope.id);
        if let Err(e) = self.channel.dispatch(&envelope, None) {
            self.tracker.cancel(&envelope.id);
            return Err(e);
        }

        self.tracker
            .await_response(&envelope.id, rx, self.config.request_timeout())?;
        Ok(())
    }
}
