//! Persisted schema-version preference.
//!
//! Stores the `schemaVersion` key in a small JSON file under the app dir.
//! Reads fall back to the value currently shown in the panel - a dynamic
//! fallback, not a fixed constant - whenever the store is missing, fails
//! to read, or holds something outside the closed enumeration.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Closed set of harvester output schema versions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    Legacy,
    Stable,
    Beta,
}

impl SchemaVersion {
    /// All members, in selector display order.
    pub const ALL: [SchemaVersion; 3] =
        [SchemaVersion::Legacy, SchemaVersion::Stable, SchemaVersion::Beta];

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaVersion::Legacy => "legacy",
            SchemaVersion::Stable => "stable",
            SchemaVersion::Beta => "beta",
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for strings outside the closed enumeration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidSchemaVersion(pub String);

impl fmt::Display for InvalidSchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid schema version '{}'", self.0)
    }
}

impl std::error::Error for InvalidSchemaVersion {}

impl FromStr for SchemaVersion {
    type Err = InvalidSchemaVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legacy" => Ok(SchemaVersion::Legacy),
            "stable" => Ok(SchemaVersion::Stable),
            "beta" => Ok(SchemaVersion::Beta),
            other => Err(InvalidSchemaVersion(other.to_string())),
        }
    }
}

/// On-disk shape of the preference file.
///
/// `schemaVersion` is stored as a raw string so an unknown value degrades
/// to the fallback instead of failing the whole read.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct PreferenceFile {
    #[serde(default, rename = "schemaVersion")]
    schema_version: Option<String>,
}

/// Persisted preference store for the panel.
#[derive(Debug)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted schema version.
    ///
    /// `current_ui` is the value shown in the panel at call time; it is
    /// returned whenever the store is absent, unreadable, or holds a value
    /// outside the enumeration. Read failures are logged, never raised.
    pub fn get(&self, current_ui: SchemaVersion) -> SchemaVersion {
        let file = match self.read_file() {
            Ok(f) => f,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Preference read failed, using panel value");
                return current_ui;
            }
        };

        match file.schema_version.as_deref() {
            None => {
                debug!("No persisted schema version, using panel value");
                current_ui
            }
            Some(raw) => match raw.parse::<SchemaVersion>() {
                Ok(version) => version,
                Err(e) => {
                    warn!(stored = %raw, error = %e, "Persisted schema version invalid, using panel value");
                    current_ui
                }
            },
        }
    }

    /// Persist the schema version unconditionally.
    ///
    /// The caller is constrained to the closed enumeration by the type, so
    /// no validation happens here. Write failures are logged, not surfaced;
    /// losing one enumerated preference is not worth an error path.
    pub fn set(&self, version: SchemaVersion) {
        let file = PreferenceFile {
            schema_version: Some(version.as_str().to_string()),
        };

        if let Err(e) = self.write_file(&file) {
            warn!(path = %self.path.display(), error = %e, "Preference write failed");
        } else {
            debug!(version = %version, "Persisted schema version");
        }
    }

    fn read_file(&self) -> Result<PreferenceFile, std::io::Error> {
        if !self.path.exists() {
            return Ok(PreferenceFile::default());
        }
        let contents = fs::read_to_string(&self.path)?;
        serde_json::from_str(&contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    fn write_file(&self, file: &PreferenceFile) -> Result<(), std::io::Error> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(file)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, contents)
    }
}
