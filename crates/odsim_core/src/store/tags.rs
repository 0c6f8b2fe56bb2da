//! Metadata tag backends.
//!
//! A tag attaches a serialized `MetadataDocument` to a path in the store.
//! OneData exposes tags as the `onedata_json` extended attribute, which is
//! the default backend. On mounts without extended attributes a hidden
//! companion file is used instead.

use std::fs;
use std::path::{Path, PathBuf};

use crate::metadata::MetadataDocument;

use super::{StoreError, StoreResult};

/// Attribute / companion key holding the document.
pub const TAG_KEY: &str = "onedata_json";

/// Capability to attach and read back a metadata document on a path.
pub trait TagBackend: Send + Sync {
    fn set_tag(&self, path: &Path, doc: &MetadataDocument) -> StoreResult<()>;
    fn get_tag(&self, path: &Path) -> StoreResult<MetadataDocument>;
}

/// Stores tags in hidden companion files.
///
/// A file's tag sits beside it as `.<name>.onedata_json`; a directory's tag
/// sits inside it as `.onedata_json`, so a catalog's tag stays within the
/// catalog.
#[derive(Debug, Clone, Default)]
pub struct CompanionFileTags;

impl CompanionFileTags {
    pub fn new() -> Self {
        Self
    }

    /// Companion file for `path`.
    pub fn companion_path(path: &Path) -> StoreResult<PathBuf> {
        if path.is_dir() {
            return Ok(path.join(format!(".{}", TAG_KEY)));
        }
        let name = path
            .file_name()
            .ok_or_else(|| StoreError::InvalidPath(path.to_path_buf()))?;
        let companion = format!(".{}.{}", name.to_string_lossy(), TAG_KEY);
        Ok(match path.parent() {
            Some(parent) => parent.join(companion),
            None => PathBuf::from(companion),
        })
    }
}

impl TagBackend for CompanionFileTags {
    fn set_tag(&self, path: &Path, doc: &MetadataDocument) -> StoreResult<()> {
        if !path.exists() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }
        let companion = Self::companion_path(path)?;
        let text = doc.to_json_string()?;
        fs::write(&companion, text).map_err(|e| StoreError::io("writing tag", &companion, e))
    }

    fn get_tag(&self, path: &Path) -> StoreResult<MetadataDocument> {
        let companion = Self::companion_path(path)?;
        if !companion.exists() {
            return Err(StoreError::MissingTag(path.to_path_buf()));
        }
        let text = fs::read_to_string(&companion)
            .map_err(|e| StoreError::io("reading tag", &companion, e))?;
        Ok(MetadataDocument::from_json_str(&text)?)
    }
}

/// Native extended attribute tags.
#[cfg(feature = "xattr")]
#[derive(Debug, Clone)]
pub struct XattrTags {
    key: String,
}

#[cfg(feature = "xattr")]
impl XattrTags {
    /// Use the OneData key, `onedata_json`.
    pub fn new() -> Self {
        Self {
            key: TAG_KEY.to_string(),
        }
    }

    /// Use a different attribute name (e.g. `user.onedata_json` on local filesystems).
    pub fn with_key(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

#[cfg(feature = "xattr")]
impl Default for XattrTags {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "xattr")]
impl TagBackend for XattrTags {
    fn set_tag(&self, path: &Path, doc: &MetadataDocument) -> StoreResult<()> {
        let text = doc.to_json_string()?;
        xattr::set(path, &self.key, text.as_bytes())
            .map_err(|e| StoreError::io("setting xattr", path, e))
    }

    fn get_tag(&self, path: &Path) -> StoreResult<MetadataDocument> {
        let bytes = xattr::get(path, &self.key)
            .map_err(|e| StoreError::io("reading xattr", path, e))?
            .ok_or_else(|| StoreError::MissingTag(path.to_path_buf()))?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(MetadataDocument::from_json_str(&text)?)
    }
}
