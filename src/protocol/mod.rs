//! Bridge protocol: outbound command envelopes and inbound tagged reports.

mod command;
mod io;
mod message;

pub use command::{Command, CommandEnvelope};
pub use io::{log_preview, parse_inbound_graceful, serialize_envelope, JsonlReader, ParseResult};
pub use message::{
    AckReport, FailureReport, InboundMessage, LocaleReport, KEY_ACK, KEY_FAILED, KEY_LOCALES,
};
