//! Inbound tagged messages from the remote context.
//!
//! The wire shape is `{ sender, key, value }`. The `key` stays an open
//! string so unrecognized messages can be carried to the bus and dropped
//! there; known keys have typed payload structs deserialized from `value`.

use serde::{Deserialize, Serialize};

/// Recognized message keys.
pub const KEY_LOCALES: &str = "locales";
pub const KEY_ACK: &str = "ack";
pub const KEY_FAILED: &str = "failed";

/// A tagged message received from the remote context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Identity of the sender; messages from anyone else are dropped.
    pub sender: String,
    pub key: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl InboundMessage {
    /// Deserialize `value` into a typed payload.
    pub fn payload<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.value.clone())
    }
}

/// Payload of a `locales` report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocaleReport {
    /// Locales the remote instance can harvest in.
    pub supported: Vec<String>,
    /// The remote user's own locale.
    pub user: String,
}

/// Payload of an `ack` report: the named command's effects are applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AckReport {
    /// Correlation id of the acknowledged command.
    pub id: String,
}

/// Payload of a `failed` report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    /// Correlation id of the failed command.
    pub id: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_locales_message() {
        let json = r#"{"sender":"harvest-bridge","key":"locales","value":{"supported":["en","fr"],"user":"fr"}}"#;
        let msg: InboundMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.sender, "harvest-bridge");
        assert_eq!(msg.key, KEY_LOCALES);

        let report: LocaleReport = msg.payload().unwrap();
        assert_eq!(report.supported, vec!["en", "fr"]);
        assert_eq!(report.user, "fr");
    }

    #[test]
    fn test_parse_message_without_value() {
        let json = r#"{"sender":"harvest-bridge","key":"ping"}"#;
        let msg: InboundMessage = serde_json::from_str(json).unwrap();
        assert!(msg.value.is_null());
    }

    #[test]
    fn test_payload_type_mismatch_is_an_error() {
        let msg = InboundMessage {
            sender: "harvest-bridge".to_string(),
            key: KEY_ACK.to_string(),
            value: serde_json::json!({"wrong": true}),
        };
        assert!(msg.payload::<AckReport>().is_err());
    }

    #[test]
    fn test_failure_report_payload() {
        let msg = InboundMessage {
            sender: "harvest-bridge".to_string(),
            key: KEY_FAILED.to_string(),
            value: serde_json::json!({"id": "req-9", "message": "no table found"}),
        };
        let report: FailureReport = msg.payload().unwrap();
        assert_eq!(report.id, "req-9");
        assert_eq!(report.message, "no table found");
    }
}
