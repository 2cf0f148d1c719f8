//! harvest-bridge - control surface for a remote harvester.
//!
//! This library drives harvesting logic that runs inside a separate,
//! isolated script environment. Commands travel one way over a
//! fire-and-forget dispatch channel; results come back as asynchronous
//! tagged messages that an event bus correlates to the requests that
//! caused them. Around that bridge sit a session registry (one harvester
//! instance per remote context), a locale negotiator, a bundled endpoint
//! catalog, and a persisted schema-version preference with a dynamic
//! fallback.

pub mod bus;
pub mod channel;
pub mod config;
pub mod controller;
pub mod correlation;
pub mod endpoints;
pub mod error;
pub mod locale;
pub mod logging;
pub mod preferences;
pub mod protocol;
pub mod session;

pub use bus::EventBus;
pub use channel::{DispatchCallback, ProcessChannel, RemoteExecutionChannel};
pub use config::BridgeConfig;
pub use controller::{Controller, PanelState};
pub use correlation::{RequestOutcome, RequestTracker};
pub use endpoints::EndpointDescriptor;
pub use error::BridgeError;
pub use preferences::{PreferenceStore, SchemaVersion};
pub use protocol::{Command, CommandEnvelope, InboundMessage, LocaleReport};
pub use session::{RemoteContext, SessionRegistry, SessionState};
