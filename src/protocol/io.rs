//! Protocol I/O for JSONL message parsing and serialization.
//!
//! This module provides:
//! - `serialize_envelope` for writing command envelopes
//! - `parse_inbound_graceful` for classifying inbound lines
//! - `JsonlReader` for streaming JSONL reads from the remote channel

use std::io::{BufRead, BufReader, Read};

use tracing::{debug, warn};

use super::command::CommandEnvelope;
use super::message::InboundMessage;

/// Maximum length for raw JSON in logs.
const MAX_RAW_LOG_PREVIEW: usize = 200;

/// Get a truncated preview of raw JSON for logging.
///
/// Truncation backs off to a char boundary so multi-byte text in a long
/// line can never panic the slice.
pub fn log_preview(raw: &str) -> &str {
    if raw.len() <= MAX_RAW_LOG_PREVIEW {
        return raw;
    }
    let mut end = MAX_RAW_LOG_PREVIEW;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    &raw[..end]
}

/// Serialize a command envelope to JSONL format (without trailing newline).
pub fn serialize_envelope(envelope: &CommandEnvelope) -> Result<String, serde_json::Error> {
    serde_json::to_string(envelope)
}

/// Result type for graceful inbound parsing.
#[derive(Debug)]
pub enum ParseResult {
    /// Successfully parsed message (key may still be unrecognized; the bus
    /// decides that).
    Ok(InboundMessage),
    /// Message has no "key" field
    MissingKey {
        /// Truncated raw JSON for debugging
        raw: String,
    },
    /// Message has no "sender" field
    MissingSender {
        /// Truncated raw JSON for debugging
        raw: String,
    },
    /// JSON parsing failed entirely (syntax error or wrong field types)
    ParseError(serde_json::Error),
}

/// Parse an inbound line with graceful classification.
///
/// # Classification Logic
/// - Missing "key" field → `MissingKey`
/// - Missing "sender" field → `MissingSender`
/// - Invalid JSON or wrong field types → `ParseError`
pub fn parse_inbound_graceful(line: &str) -> ParseResult {
    let preview = log_preview(line);

    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => return ParseResult::ParseError(e),
    };

    if value.get("key").and_then(|k| k.as_str()).is_none() {
        return ParseResult::MissingKey {
            raw: preview.to_string(),
        };
    }

    if value.get("sender").and_then(|s| s.as_str()).is_none() {
        return ParseResult::MissingSender {
            raw: preview.to_string(),
        };
    }

    match serde_json::from_value::<InboundMessage>(value) {
        Ok(msg) => ParseResult::Ok(msg),
        Err(e) => ParseResult::ParseError(e),
    }
}

/// JSONL reader for streaming message reads from the remote channel.
///
/// Reuses a single line buffer between reads.
pub struct JsonlReader<R: Read> {
    reader: BufReader<R>,
    line_buffer: String,
}

impl<R: Read> JsonlReader<R> {
    pub fn new(reader: R) -> Self {
        JsonlReader {
            reader: BufReader::new(reader),
            line_buffer: String::with_capacity(1024),
        }
    }

    /// Read the next well-formed message, skipping malformed lines.
    ///
    /// All skip logging happens here; `parse_inbound_graceful` returns
    /// structured results for this layer to report.
    ///
    /// # Returns
    /// * `Ok(Some(InboundMessage))` - parsed message
    /// * `Ok(None)` - end of stream
    /// * `Err(e)` - IO error (never a parse error)
    pub fn next_message(&mut self) -> Result<Option<InboundMessage>, std::io::Error> {
        loop {
            self.line_buffer.clear();
            match self.reader.read_line(&mut self.line_buffer)? {
                0 => {
                    debug!("Reached end of remote message stream");
                    return Ok(None);
                }
                _ => {
                    let trimmed = self.line_buffer.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    let preview = log_preview(trimmed);
                    let raw_len = trimmed.len();

                    match parse_inbound_graceful(trimmed) {
                        ParseResult::Ok(msg) => {
                            debug!(key = %msg.key, "Parsed inbound message");
                            return Ok(Some(msg));
                        }
                        ParseResult::MissingKey { .. } => {
                            warn!(
                                raw_preview = %preview,
                                raw_len = raw_len,
                                "Skipping message with missing 'key' field"
                            );
                            continue;
                        }
                        ParseResult::MissingSender { .. } => {
                            warn!(
                                raw_preview = %preview,
                                raw_len = raw_len,
                                "Skipping message with missing 'sender' field"
                            );
                            continue;
                        }
                        ParseResult::ParseError(e) => {
                            warn!(
                                error = %e,
                                raw_preview = %preview,
                                raw_len = raw_len,
                                "Skipping malformed message"
                            );
                            continue;
                        }
                    }
                }
            }
        }
    }
}
