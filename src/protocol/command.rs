//! Outbound command payloads.
//!
//! Commands are a closed, structured set serialized through serde - no
//! string interpolation anywhere on the dispatch path. Every dispatched
//! command travels inside a [`CommandEnvelope`] carrying a generated
//! correlation id, which the remote side echoes back in its `ack` /
//! `failed` reports.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::preferences::SchemaVersion;

/// Command payload with type discrimination via serde tag.
///
/// # Example
/// ```json
/// {"type":"runAndSendToEndpoint","version":"beta","endpointUrl":"https://api.example.com"}
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Command {
    /// Construct the harvester instance in the remote context if absent.
    Bootstrap { debug: bool },
    /// Ask the remote instance to report supported/user locales.
    ReportLocales,
    /// Select the harvesting locale.
    SetLocale { code: String },
    /// Select the delivery endpoint.
    SetEndpoint { url: String },
    /// Run the harvest and show the result in the remote context.
    RunAndShow { version: SchemaVersion },
    /// Run the harvest and send the result to an endpoint.
    RunAndSendToEndpoint {
        version: SchemaVersion,
        #[serde(rename = "endpointUrl")]
        endpoint_url: String,
    },
    /// Run the harvest and download the result.
    RunAndDownload { version: SchemaVersion },
}

impl Command {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Bootstrap { .. } => "bootstrap",
            Command::ReportLocales => "reportLocales",
            Command::SetLocale { .. } => "setLocale",
            Command::SetEndpoint { .. } => "setEndpoint",
            Command::RunAndShow { .. } => "runAndShow",
            Command::RunAndSendToEndpoint { .. } => "runAndSendToEndpoint",
            Command::RunAndDownload { .. } => "runAndDownload",
        }
    }
}

/// A command plus its correlation id, flattened onto one JSON object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// Correlation id echoed back by the remote side.
    pub id: String,
    #[serde(flatten)]
    pub command: Command,
}

impl CommandEnvelope {
    /// Wrap a command with a freshly generated correlation id.
    pub fn new(command: Command) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            command,
        }
    }
}
