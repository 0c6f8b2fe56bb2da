//! Remote store access.
//!
//! The store is a mounted filesystem (a OneData space). Everything the
//! pipeline needs from it goes through the `CatalogStore` trait, addressed by
//! store ids (`/<catalog>/<file>`) rather than absolute paths:
//! - existence and writability checks
//! - directory creation and listing
//! - moving a local file into the store
//! - metadata tags and sidecar files

mod mounted;
mod tags;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::metadata::{MetadataDocument, MetadataError};
use crate::process::ProcessError;

pub use mounted::MountedStore;
#[cfg(feature = "xattr")]
pub use tags::XattrTags;
pub use tags::{CompanionFileTags, TagBackend, TAG_KEY};

/// Errors from store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error {operation} {path}: {source}")]
    Io {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    #[error("Path has no file name: {0}")]
    InvalidPath(PathBuf),

    #[error("Store path {0} is a directory")]
    Occupied(PathBuf),

    #[error("No metadata tag on {0}")]
    MissingTag(PathBuf),

    #[error("Failed to move {from} into the store: {source}")]
    Relocate {
        from: PathBuf,
        #[source]
        source: ProcessError,
    },

    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

impl StoreError {
    /// Create an I/O error with operation context.
    pub fn io(operation: impl Into<String>, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// What the pipeline needs from the remote store.
///
/// Implementations must be safe to call from every worker at once; the
/// pipeline guarantees that concurrent calls target disjoint ids.
pub trait CatalogStore: Send + Sync {
    /// Mount point of the store.
    fn root(&self) -> &Path;

    /// Whether the store root is present (mounted).
    fn is_mounted(&self) -> bool;

    /// Whether `id` exists in the store.
    fn exists(&self, id: &str) -> bool;

    /// Whether `id` can be written to by this run.
    fn is_writable(&self, id: &str) -> bool;

    /// Create directory `id` (and missing parents).
    fn create_dir(&self, id: &str) -> StoreResult<()>;

    /// Move the local file at `local` to `id`.
    fn relocate(&self, local: &Path, id: &str) -> StoreResult<()>;

    /// Attach `doc` as the metadata tag of `id`.
    fn set_tag(&self, id: &str, doc: &MetadataDocument) -> StoreResult<()>;

    /// Read the metadata tag of `id`.
    fn get_tag(&self, id: &str) -> StoreResult<MetadataDocument>;

    /// Write `contents` to the file `id`, creating parent directories.
    fn write_file(&self, id: &str, contents: &str) -> StoreResult<()>;

    /// Names of the entries of directory `id`.
    fn list_dir(&self, id: &str) -> StoreResult<Vec<String>>;
}
