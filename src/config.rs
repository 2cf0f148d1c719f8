//! Bridge configuration.
//!
//! Timeouts, storage paths, and the panel's own sender identity. Loaded
//! from an optional JSON file; any missing or invalid file falls back to
//! defaults with a warning, never a fatal error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

/// Default sender identity expected on inbound messages.
pub const DEFAULT_IDENTITY: &str = "harvest-bridge";

fn default_request_timeout_ms() -> u64 {
    5000
}

/// Heuristic delay after a run command before the panel may close.
/// Gives the remote action a chance to start; not a completion guarantee.
fn default_close_delay_ms() -> u64 {
    700
}

fn default_identity() -> String {
    DEFAULT_IDENTITY.to_string()
}

fn app_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".harvest-bridge"))
        .unwrap_or_else(|| std::env::temp_dir().join(".harvest-bridge"))
}

fn default_endpoints_path() -> PathBuf {
    app_dir().join("endpoints.json")
}

fn default_preferences_path() -> PathBuf {
    app_dir().join("preferences.json")
}

/// Runtime configuration for the bridge.
#[derive(Clone, Debug, Deserialize)]
pub struct BridgeConfig {
    /// How long to wait for a correlated response before declaring
    /// `RemoteExecutionTimeout`.
    #[serde(default = "default_request_timeout_ms", rename = "requestTimeoutMs")]
    pub request_timeout_ms: u64,

    /// Post-dispatch delay before the panel reports it may close.
    #[serde(default = "default_close_delay_ms", rename = "closeDelayMs")]
    pub close_delay_ms: u64,

    /// Bundled endpoint catalog location.
    #[serde(default = "default_endpoints_path", rename = "endpointsPath")]
    pub endpoints_path: PathBuf,

    /// Persisted preferences location.
    #[serde(default = "default_preferences_path", rename = "preferencesPath")]
    pub preferences_path: PathBuf,

    /// Sender identity this panel accepts on inbound messages.
    #[serde(default = "default_identity")]
    pub identity: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            close_delay_ms: default_close_delay_ms(),
            endpoints_path: default_endpoints_path(),
            preferences_path: default_preferences_path(),
            identity: default_identity(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a JSON file.
    ///
    /// Returns `BridgeConfig::default()` if the file is missing or fails
    /// to parse; both cases are logged, neither is fatal.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            info!(path = %path.display(), "Config file not found, using defaults");
            return Self::default();
        }

        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read config, using defaults");
                return Self::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(config) => {
                info!(path = %path.display(), "Loaded bridge config");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to parse config, using defaults");
                Self::default()
            }
        }
    }

    /// Request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Close delay as a `Duration`.
    pub fn close_delay(&self) -> Duration {
        Duration::from_millis(self.close_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.request_timeout_ms, 5000);
        assert_eq!(config.close_delay_ms, 700);
        assert_eq!(config.identity, "harvest-bridge");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = BridgeConfig::load(&dir.path().join("nope.json"));
        assert_eq!(config.request_timeout_ms, 5000);
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"requestTimeoutMs": 250}"#).unwrap();

        let config = BridgeConfig::load(&path);
        assert_eq!(config.request_timeout_ms, 250);
        assert_eq!(config.close_delay_ms, 700);
        assert_eq!(config.identity, "harvest-bridge");
    }

    #[test]
    fn test_load_invalid_json_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();

        let config = BridgeConfig::load(&path);
        assert_eq!(config.close_delay_ms, 700);
    }

    #[test]
    fn test_durations() {
        let config = BridgeConfig {
            request_timeout_ms: 1500,
            close_delay_ms: 700,
            ..BridgeConfig::default()
        };
        assert_eq!(config.request_timeout(), Duration::from_millis(1500));
        assert_eq!(config.close_delay(), Duration::from_millis(700));
    }
}
