//! Export file types.
//!
//! An export is a JSON snapshot written by the activity tracker for one
//! completed tracking session.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

/// A parsed export payload.
///
/// The only structural guarantee is that the document is a JSON object.
/// Field presence and types are checked when the export is transformed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawExport {
    document: Map<String, Value>,
}

impl RawExport {
    /// Wrap a JSON value, returning `None` if it is not an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(document) => Some(Self { document }),
            _ => None,
        }
    }

    /// Look up `section.field`, e.g. `info.start_time`.
    pub fn field(&self, section: &str, field: &str) -> Option<&Value> {
        self.document.get(section)?.as_object()?.get(field)
    }
}

/// Where an export file was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoverySource {
    /// Found by the one-time startup sweep.
    Sweep,
    /// Reported by the directory watcher.
    Watch,
}

impl fmt::Display for DiscoverySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sweep => write!(f, "sweep"),
            Self::Watch => write!(f, "watch"),
        }
    }
}

/// An export file owned by the pipeline run that discovered it.
///
/// The handle lives until the file is deleted after a confirmed index, or is
/// dropped with the file left in place when processing fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFileHandle {
    path: PathBuf,
    source: DiscoverySource,
}

impl ExportFileHandle {
    pub fn new(path: impl Into<PathBuf>, source: DiscoverySource) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> DiscoverySource {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_requires_object() {
        assert!(RawExport::from_value(json!({})).is_some());
        assert!(RawExport::from_value(json!([1, 2, 3])).is_none());
        assert!(RawExport::from_value(json!("text")).is_none());
        assert!(RawExport::from_value(Value::Null).is_none());
    }

    #[test]
    fn test_field_lookup() {
        let raw = RawExport::from_value(json!({
            "info": { "start_time": 1000 },
            "totals": "not an object"
        }))
        .unwrap();

        assert_eq!(raw.field("info", "start_time"), Some(&json!(1000)));
        assert!(raw.field("info", "end_time").is_none());
        assert!(raw.field("totals", "neutral_duration").is_none());
        assert!(raw.field("missing", "start_time").is_none());
    }

    #[test]
    fn test_handle_accessors() {
        let handle = ExportFileHandle::new("/tmp/exports/a.json", DiscoverySource::Watch);
        assert_eq!(handle.path(), Path::new("/tmp/exports/a.json"));
        assert_eq!(handle.source(), DiscoverySource::Watch);
        assert_eq!(handle.source().to_string(), "watch");
    }
}
