use thiserror::Error;

/// Domain-specific errors for the harvest bridge.
///
/// Remote execution failures are declared outcomes here, not silent drops:
/// an unanswered request becomes `RemoteExecutionTimeout`, and a `failed`
/// report from the remote side becomes `RemoteExecutionFailed`.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("remote execution timed out after {timeout_ms}ms (request {request_id})")]
    RemoteExecutionTimeout { request_id: String, timeout_ms: u64 },

    #[error("remote execution failed (request {request_id}): {message}")]
    RemoteExecutionFailed { request_id: String, message: String },

    #[error("remote channel closed: {0}")]
    ChannelClosed(String),

    #[error("failed to parse protocol message: {0}")]
    ProtocolParse(#[from] serde_json::Error),

    #[error("failed to spawn harvester process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("no endpoint selected")]
    NoEndpointSelected,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_names_request() {
        let err = BridgeError::RemoteExecutionTimeout {
            request_id: "req-1".to_string(),
            timeout_ms: 5000,
        };
        let text = err.to_string();
        assert!(text.contains("req-1"));
        assert!(text.contains("5000"));
    }

    #[test]
    fn test_failed_message_carries_remote_detail() {
        let err = BridgeError::RemoteExecutionFailed {
            request_id: "req-2".to_string(),
            message: "selector not found".to_string(),
        };
        assert!(err.to_string().contains("selector not found"));
    }
}
