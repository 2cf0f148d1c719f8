//! Bundled endpoint catalog.
//!
//! The catalog ships as a JSON array of `{ name, url }` descriptors in
//! which placeholder slots appear as `null`. Loading filters those out,
//! along with descriptors whose name or url is empty, preserving the
//! relative order of survivors. An empty catalog is a valid outcome; the
//! endpoint selector downstream is disabled, not blocked.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::BridgeError;

/// A named delivery endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub name: String,
    pub url: String,
}

/// Drop placeholder and degenerate entries, preserving order.
pub fn filter_descriptors(raw: Vec<Option<EndpointDescriptor>>) -> Vec<EndpointDescriptor> {
    raw.into_iter()
        .flatten()
        .filter(|d| !d.name.is_empty() && !d.url.is_empty())
        .collect()
}

/// Parse a catalog from its JSON text.
pub fn load_from_str(contents: &str) -> Result<Vec<EndpointDescriptor>, BridgeError> {
    let raw: Vec<Option<EndpointDescriptor>> = serde_json::from_str(contents)?;
    Ok(filter_descriptors(raw))
}

/// Load the bundled catalog from disk.
pub fn load(path: &Path) -> Result<Vec<EndpointDescriptor>, BridgeError> {
    debug!(path = %path.display(), "Loading endpoint catalog");
    let contents = fs::read_to_string(path)?;
    let endpoints = load_from_str(&contents)?;
    info!(count = endpoints.len(), "Loaded endpoint catalog");
    Ok(endpoints)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, url: &str) -> EndpointDescriptor {
        EndpointDescriptor {
            name: name.to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn test_nulls_filtered_order_preserved() {
        let endpoints = load_from_str(
            r#"[{"name":"A","url":"u1"}, null, {"name":"B","url":"u2"}]"#,
        )
        .unwrap();
        assert_eq!(endpoints, vec![descriptor("A", "u1"), descriptor("B", "u2")]);
    }

    #[test]
    fn test_empty_fields_filtered() {
        let endpoints = load_from_str(
            r#"[{"name":"","url":"u1"}, {"name":"B","url":""}, {"name":"C","url":"u3"}]"#,
        )
        .unwrap();
        assert_eq!(endpoints, vec![descriptor("C", "u3")]);
    }

    #[test]
    fn test_all_null_catalog_is_valid_and_empty() {
        let endpoints = load_from_str("[null, null]").unwrap();
        assert!(endpoints.is_empty());
    }

    #[test]
    fn test_empty_array_is_valid() {
        assert!(load_from_str("[]").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(
            load_from_str("{"),
            Err(BridgeError::ProtocolParse(_))
        ));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("endpoints.json");
        std::fs::write(
            &path,
            r#"[{"name":"Staging","url":"https://staging.example.com"}, null]"#,
        )
        .unwrap();

        let endpoints = load(&path).unwrap();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].name, "Staging");
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            load(&dir.path().join("nope.json")),
            Err(BridgeError::Io(_))
        ));
    }
}
