//! Metadata documents for artifacts and catalogs.
//!
//! This module provides:
//! - `MetadataDocument`: JSON-LD descriptor wrapper
//! - `merge`: the tree merge used to layer fragments
//! - `TemplateSet`: the named fragments and placeholder injection
//! - `ActivityWindow`: start/end timestamps stamped on documents

mod document;
mod merge;
mod templates;

use std::path::PathBuf;

use chrono::Utc;
use thiserror::Error;

pub use document::{MetadataDocument, ID_KEY};
pub use merge::{merge, merge_all};
pub use templates::{Fragment, Placeholder, Placeholders, TemplateSet};

/// Errors raised while loading or serializing metadata.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to parse {what}: {source}")]
    Parse {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize metadata: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MetadataError {
    /// Create a parse error.
    pub fn parse(what: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Parse {
            what: what.into(),
            source,
        }
    }
}

/// Result type for metadata operations.
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Current UTC time as an `xsd:dateTime` (`CCYY-MM-DDThh:mm:ss.ffffffZ`).
pub fn xsd_datetime() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Start/end timestamps of an activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityWindow {
    pub start: String,
    pub end: String,
}

impl ActivityWindow {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// A zero-length window at the current instant.
    pub fn now() -> Self {
        let now = xsd_datetime();
        Self {
            start: now.clone(),
            end: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xsd_datetime_shape() {
        let stamp = xsd_datetime();
        assert!(stamp.ends_with('Z'));
        assert_eq!(stamp.as_bytes()[10], b'T');
        // 2024-01-01T00:00:00.000000Z
        assert_eq!(stamp.len(), 27);
    }

    #[test]
    fn instant_window_has_equal_bounds() {
        let window = ActivityWindow::now();
        assert_eq!(window.start, window.end);
    }
}
