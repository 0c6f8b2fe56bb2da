//! Root catalog entity.

use std::path::PathBuf;

use crate::metadata::MetadataDocument;

/// One catalog in the store.
///
/// Owned exclusively by the catalog lifecycle; workers never see it.
#[derive(Debug, Clone)]
pub struct CatalogRecord {
    /// Catalog name.
    pub name: String,
    /// Mount point of the store.
    pub store_root: PathBuf,
    /// Root document as written at creation (or as found when attaching).
    pub creation_metadata: Option<MetadataDocument>,
    /// Artifact ids listed at finalization.
    pub dataset_list: Vec<String>,
    /// Whether this run created the catalog (false when resuming).
    pub created: bool,
}

impl CatalogRecord {
    pub fn new(name: impl Into<String>, store_root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            store_root: store_root.into(),
            creation_metadata: None,
            dataset_list: Vec::new(),
            created: false,
        }
    }

    /// Store id of the catalog (`/<name>`).
    pub fn id(&self) -> String {
        format!("/{}", self.name)
    }

    /// Absolute path of the catalog directory.
    pub fn path(&self) -> PathBuf {
        self.store_root.join(&self.name)
    }
}
