//! Store identifiers and their hidden metadata paths.
//!
//! Ids are absolute within the store (`/<catalog>/<file>`). Sidecar files live
//! in a parallel hidden tree: every `/` after the first segment becomes
//! `/.metadata/.`, so `/cat/DAT1.bz2` maps to `/cat/.metadata/.DAT1.bz2.jsonld`.

use std::path::{Path, PathBuf};

/// Name of the hidden metadata directory.
pub const METADATA_DIR: &str = ".metadata";

/// Extension of sidecar files.
pub const SIDECAR_EXTENSION: &str = ".jsonld";

/// `/<catalog>`.
pub fn catalog_id(catalog_name: &str) -> String {
    format!("/{}", catalog_name)
}

/// `/<catalog>/<file_name>`.
pub fn artifact_id(catalog_name: &str, file_name: &str) -> String {
    format!("/{}/{}", catalog_name, file_name)
}

/// Hidden sidecar id of an artifact id.
pub fn sidecar_id(id: &str) -> String {
    let relative = id.trim_start_matches('/');
    format!(
        "/{}{}",
        relative.replace('/', &format!("/{}/.", METADATA_DIR)),
        SIDECAR_EXTENSION
    )
}

/// Sidecar id of a catalog: `/<catalog>/.metadata/.<catalog>.jsonld`.
pub fn catalog_sidecar_id(catalog_name: &str) -> String {
    format!(
        "/{}/{}/.{}{}",
        catalog_name, METADATA_DIR, catalog_name, SIDECAR_EXTENSION
    )
}

/// Resolve an id below `root`.
pub fn resolve(root: &Path, id: &str) -> PathBuf {
    root.join(id.trim_start_matches('/'))
}

/// Whether a directory entry belongs to the hidden tree.
pub fn is_hidden(entry_name: &str) -> bool {
    entry_name.starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_ids() {
        assert_eq!(catalog_id("myrun"), "/myrun");
        assert_eq!(artifact_id("myrun", "DAT3.bz2"), "/myrun/DAT3.bz2");
    }

    #[test]
    fn sidecar_for_artifact() {
        assert_eq!(
            sidecar_id("/myrun/DAT3.bz2"),
            "/myrun/.metadata/.DAT3.bz2.jsonld"
        );
    }

    #[test]
    fn sidecar_hides_every_nested_segment() {
        assert_eq!(
            sidecar_id("/a/b/c"),
            "/a/.metadata/.b/.metadata/.c.jsonld"
        );
    }

    #[test]
    fn sidecar_for_catalog() {
        assert_eq!(catalog_sidecar_id("myrun"), "/myrun/.metadata/.myrun.jsonld");
    }

    #[test]
    fn resolves_below_root() {
        assert_eq!(
            resolve(Path::new("/mnt/space"), "/myrun/x"),
            PathBuf::from("/mnt/space/myrun/x")
        );
    }

    #[test]
    fn hidden_entries() {
        assert!(is_hidden(".metadata"));
        assert!(!is_hidden("DAT3.bz2"));
    }
}
