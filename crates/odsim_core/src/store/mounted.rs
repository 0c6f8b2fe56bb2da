//! Store backed by a locally mounted filesystem.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::catalog::ids;
use crate::metadata::MetadataDocument;
use crate::process::{shell_quote, ProcessRunner};

use super::tags::{CompanionFileTags, TagBackend};
use super::{CatalogStore, StoreError, StoreResult};

/// A OneData space (or any directory) mounted at `root`.
pub struct MountedStore {
    root: PathBuf,
    tags: Box<dyn TagBackend>,
    mover: Option<Arc<dyn ProcessRunner>>,
}

impl MountedStore {
    /// Store at `root` tagging with companion files.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tags: Box::new(CompanionFileTags::new()),
            mover: None,
        }
    }

    /// Use a different tag backend.
    pub fn with_tags(mut self, tags: Box<dyn TagBackend>) -> Self {
        self.tags = tags;
        self
    }

    /// Fall back to an external `mv` when a rename into the store fails.
    ///
    /// OneData's client rewrites ownership on ingestion and rejects some
    /// in-process renames; the `mv` binary goes through its own path.
    pub fn with_mv_fallback(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.mover = Some(runner);
        self
    }

    /// Absolute path of `id`.
    pub fn path(&self, id: &str) -> PathBuf {
        ids::resolve(&self.root, id)
    }

    fn move_with(&self, runner: &dyn ProcessRunner, local: &Path, target: &Path) -> StoreResult<()> {
        let command = format!(
            "mv -f {} {}",
            shell_quote(&local.to_string_lossy()),
            shell_quote(&target.to_string_lossy())
        );
        runner
            .run(&command, &self.root)
            .map(|_| ())
            .map_err(|source| StoreError::Relocate {
                from: local.to_path_buf(),
                source,
            })
    }
}

impl CatalogStore for MountedStore {
    fn root(&self) -> &Path {
        &self.root
    }

    fn is_mounted(&self) -> bool {
        self.root.is_dir()
    }

    fn exists(&self, id: &str) -> bool {
        self.path(id).exists()
    }

    /// Whether this process can write to `id`.
    ///
    /// Mode bits say nothing about whose catalog it is, so access is tested
    /// for real: a directory must accept a scratch file, a file must open
    /// for appending.
    fn is_writable(&self, id: &str) -> bool {
        let path = self.path(id);
        match fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => tempfile::Builder::new()
                .prefix(".odsim-access-")
                .tempfile_in(&path)
                .is_ok(),
            Ok(_) => OpenOptions::new().append(true).open(&path).is_ok(),
            Err(_) => false,
        }
    }

    fn create_dir(&self, id: &str) -> StoreResult<()> {
        let path = self.path(id);
        fs::create_dir_all(&path).map_err(|e| StoreError::io("creating", &path, e))
    }

    fn relocate(&self, local: &Path, id: &str) -> StoreResult<()> {
        if !local.exists() {
            return Err(StoreError::NotFound(local.to_path_buf()));
        }
        let target = self.path(id);
        // `mv` would drop the file inside a directory of the same name.
        if target.is_dir() {
            return Err(StoreError::Occupied(target));
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io("creating", parent, e))?;
        }

        match fs::rename(local, &target) {
            Ok(()) => Ok(()),
            Err(e) => match &self.mover {
                Some(runner) => {
                    tracing::debug!(
                        "rename {} failed ({}), falling back to mv",
                        local.display(),
                        e
                    );
                    self.move_with(runner.as_ref(), local, &target)
                }
                None => Err(StoreError::io("moving", local, e)),
            },
        }
    }

    fn set_tag(&self, id: &str, doc: &MetadataDocument) -> StoreResult<()> {
        self.tags.set_tag(&self.path(id), doc)
    }

    fn get_tag(&self, id: &str) -> StoreResult<MetadataDocument> {
        self.tags.get_tag(&self.path(id))
    }

    fn write_file(&self, id: &str, contents: &str) -> StoreResult<()> {
        let path = self.path(id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io("creating", parent, e))?;
        }
        fs::write(&path, contents).map_err(|e| StoreError::io("writing", &path, e))
    }

    fn list_dir(&self, id: &str) -> StoreResult<Vec<String>> {
        let path = self.path(id);
        let entries = fs::read_dir(&path).map_err(|e| StoreError::io("listing", &path, e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io("listing", &path, e))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{ProcessError, ProcessResult, ShellRunner};
    use serde_json::json;
    use std::os::unix::fs::{MetadataExt, PermissionsExt};
    use tempfile::tempdir;

    struct FailingRunner;

    impl ProcessRunner for FailingRunner {
        fn run(&self, command: &str, _cwd: &Path) -> ProcessResult<String> {
            Err(ProcessError::failed(command, 1, "refused"))
        }
    }

    #[test]
    fn mounted_only_when_root_is_dir() {
        let dir = tempdir().unwrap();
        assert!(MountedStore::new(dir.path()).is_mounted());
        assert!(!MountedStore::new(dir.path().join("missing")).is_mounted());
    }

    #[test]
    fn relocate_moves_file() {
        let store_dir = tempdir().unwrap();
        let work_dir = tempdir().unwrap();
        let local = work_dir.path().join("DAT1.bz2");
        fs::write(&local, b"payload").unwrap();

        let store = MountedStore::new(store_dir.path());
        store.relocate(&local, "/cat/DAT1.bz2").unwrap();

        assert!(!local.exists());
        assert!(store.exists("/cat/DAT1.bz2"));
        assert_eq!(fs::read(store.path("/cat/DAT1.bz2")).unwrap(), b"payload");
    }

    #[test]
    fn relocate_missing_local_file_fails() {
        let store_dir = tempdir().unwrap();
        let store = MountedStore::new(store_dir.path());
        let err = store
            .relocate(&store_dir.path().join("ghost"), "/cat/ghost")
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn mv_fallback_moves_file_onto_target() {
        let store_dir = tempdir().unwrap();
        let work_dir = tempdir().unwrap();
        let local = work_dir.path().join("DAT1.bz2");
        fs::write(&local, b"x").unwrap();
        let store = MountedStore::new(store_dir.path());
        let target = store.path("/cat/DAT1.bz2");
        fs::create_dir_all(target.parent().unwrap()).unwrap();

        let err = store.move_with(&FailingRunner, &local, &target).unwrap_err();
        assert!(matches!(err, StoreError::Relocate { .. }));
        assert!(local.exists());

        store.move_with(&ShellRunner::new(), &local, &target).unwrap();
        assert!(!local.exists());
        assert_eq!(fs::read(&target).unwrap(), b"x");
    }

    #[test]
    fn relocate_refuses_directory_target() {
        let store_dir = tempdir().unwrap();
        let work_dir = tempdir().unwrap();
        let local = work_dir.path().join("f");
        fs::write(&local, b"x").unwrap();
        fs::create_dir_all(store_dir.path().join("cat/f")).unwrap();

        let store = MountedStore::new(store_dir.path())
            .with_mv_fallback(Arc::new(ShellRunner::new()));
        let err = store.relocate(&local, "/cat/f").unwrap_err();

        assert!(matches!(err, StoreError::Occupied(_)));
        assert!(local.exists());
        assert_eq!(fs::read_dir(store_dir.path().join("cat/f")).unwrap().count(), 0);
    }

    #[test]
    fn tags_and_sidecars() {
        let store_dir = tempdir().unwrap();
        let store = MountedStore::new(store_dir.path());
        store.create_dir("/cat").unwrap();

        let doc = MetadataDocument::new(json!({"@id": "/cat"}));
        store.set_tag("/cat", &doc).unwrap();
        assert_eq!(store.get_tag("/cat").unwrap(), doc);

        store
            .write_file("/cat/.metadata/.cat.jsonld", &doc.to_json_string().unwrap())
            .unwrap();
        let text = fs::read_to_string(store.path("/cat/.metadata/.cat.jsonld")).unwrap();
        assert_eq!(MetadataDocument::from_json_str(&text).unwrap(), doc);
    }

    #[test]
    fn lists_directory_entries() {
        let store_dir = tempdir().unwrap();
        let store = MountedStore::new(store_dir.path());
        store.create_dir("/cat/.metadata").unwrap();
        store.write_file("/cat/a.bz2", "").unwrap();

        let mut names = store.list_dir("/cat").unwrap();
        names.sort();
        assert_eq!(names, vec![".metadata", "a.bz2"]);
        assert!(store.list_dir("/missing").is_err());
    }

    /// Whether creating a file in `dir` actually works for this process.
    fn can_create_in(dir: &Path) -> bool {
        let scratch = dir.join("scratch");
        let ok = fs::write(&scratch, b"").is_ok();
        let _ = fs::remove_file(&scratch);
        ok
    }

    #[test]
    fn writability_matches_real_access() {
        let store_dir = tempdir().unwrap();
        let store = MountedStore::new(store_dir.path());
        store.create_dir("/cat").unwrap();
        assert!(store.is_writable("/cat"));
        assert!(!store.is_writable("/missing"));

        let path = store.path("/cat");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o555)).unwrap();
        assert_eq!(store.is_writable("/cat"), can_create_in(&path));
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

        // The scratch file used by the check does not linger.
        assert_eq!(fs::read_dir(&path).unwrap().count(), 0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn directory_nobody_may_write_is_not_writable() {
        // procfs refuses new files whatever the uid or mode bits.
        let store = MountedStore::new("/");
        assert!(store.exists("/proc"));
        assert!(!store.is_writable("/proc"));
    }

    #[test]
    fn directory_owned_by_another_user_is_not_writable() {
        let me = match fs::metadata("/proc/self") {
            Ok(meta) => meta.uid(),
            Err(_) => return,
        };
        let root_meta = fs::metadata("/").unwrap();
        if me == 0 || root_meta.uid() == me {
            return;
        }
        // `/` is another user's 0755 directory: its mode alone looks writable.
        assert!(!root_meta.permissions().readonly());
        let store = MountedStore::new("/");
        assert!(!store.is_writable("/"));
    }

    #[test]
    fn writable_file_opens_for_append_only() {
        let store_dir = tempdir().unwrap();
        let store = MountedStore::new(store_dir.path());
        store.write_file("/cat/a.bz2", "payload").unwrap();

        assert!(store.is_writable("/cat/a.bz2"));
        assert_eq!(fs::read_to_string(store.path("/cat/a.bz2")).unwrap(), "payload");
    }
}
