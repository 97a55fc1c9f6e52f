//! Export file name matching.

use std::path::Path;

use globset::{GlobBuilder, GlobMatcher};

use crate::errors::PipelineError;

/// Default export file name pattern.
pub const DEFAULT_EXPORT_PATTERN: &str = "*.json";

/// Glob matched against the file name of a candidate export.
///
/// Only the final path component is considered; `*` never crosses a
/// separator, so nested paths never match.
#[derive(Debug, Clone)]
pub struct ExportPattern {
    glob: String,
    matcher: GlobMatcher,
}

impl ExportPattern {
    pub fn new(glob: &str) -> Result<Self, PipelineError> {
        let matcher = GlobBuilder::new(glob)
            .literal_separator(true)
            .build()
            .map_err(|e| PipelineError::config(format!("Invalid export pattern {}: {}", glob, e)))?
            .compile_matcher();

        Ok(Self {
            glob: glob.to_string(),
            matcher,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.glob
    }

    /// Whether the file name of `path` matches.
    pub fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| self.matcher.is_match(Path::new(name)))
            .unwrap_or(false)
    }
}
