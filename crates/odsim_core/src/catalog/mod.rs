//! Knowledge of one logical run.
//!
//! `TaskCatalog` turns sub-jobs into artifact descriptors and store ids and
//! answers whether a sub-job's outputs are already published. It holds no
//! mutable state and is shared read-only by all workers.

mod artifact;
pub mod ids;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::jobs::SubJob;
use crate::metadata::{ActivityWindow, MetadataDocument, Placeholder, Placeholders, TemplateSet};
use crate::models::RunParameters;
use crate::store::CatalogStore;

pub use artifact::{ArtifactKind, ArtifactRecord};

/// Errors in catalog descriptors.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// A descriptor carries no usable `@id`.
    #[error("Descriptor for {0} has no @id")]
    MissingId(String),
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Identifier derivation and descriptor assembly for one catalog.
#[derive(Debug, Clone)]
pub struct TaskCatalog {
    name: String,
    work_dir: PathBuf,
    templates: Arc<TemplateSet>,
    placeholders: Placeholders,
}

impl TaskCatalog {
    /// Create the catalog view for `params`.
    ///
    /// `work_dir` is where sub-jobs run and leave their outputs under
    /// `<work_dir>/<catalog>/`.
    pub fn new(params: &RunParameters, work_dir: impl Into<PathBuf>, templates: Arc<TemplateSet>) -> Self {
        Self {
            name: params.catalog_name.clone(),
            work_dir: work_dir.into(),
            templates,
            placeholders: params.placeholders(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store id of the catalog directory.
    pub fn id(&self) -> String {
        ids::catalog_id(&self.name)
    }

    /// Store id of the catalog sidecar.
    pub fn sidecar_id(&self) -> String {
        ids::catalog_sidecar_id(&self.name)
    }

    /// Store id of the catalog's hidden metadata directory.
    pub fn metadata_dir_id(&self) -> String {
        format!("{}/{}", self.id(), ids::METADATA_DIR)
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    /// Where a sub-job leaves the file with store id `id`.
    pub fn local_path(&self, id: &str) -> PathBuf {
        ids::resolve(&self.work_dir, id)
    }

    /// Descriptor of one artifact of `job`, stamped with `window`.
    pub fn artifact_document(
        &self,
        kind: ArtifactKind,
        job: &SubJob,
        window: &ActivityWindow,
    ) -> MetadataDocument {
        let placeholders = self
            .placeholders
            .clone()
            .with(Placeholder::FileName, kind.file_name(job))
            .with(Placeholder::RunCode, job.file_code())
            .with(Placeholder::StartDate, &window.start)
            .with(Placeholder::EndDate, &window.end);
        self.templates.compose(kind.fragments(), &placeholders)
    }

    /// The three artifacts `job` is expected to produce.
    pub fn expected_artifacts(&self, job: &SubJob, window: &ActivityWindow) -> Vec<ArtifactRecord> {
        let file_code = job.file_code();
        ArtifactKind::ALL
            .iter()
            .map(|kind| {
                ArtifactRecord::new(*kind, &file_code, self.artifact_document(*kind, job, window))
            })
            .collect()
    }

    /// First artifact id not yet present in `store`, or `None` when all are.
    ///
    /// An artifact without an `@id` counts as missing.
    pub fn first_missing(
        &self,
        artifacts: &[ArtifactRecord],
        store: &dyn CatalogStore,
    ) -> Option<String> {
        artifacts.iter().find_map(|artifact| match artifact.id() {
            Some(id) if store.exists(id) => None,
            Some(id) => Some(id.to_string()),
            None => Some(format!("<{} without @id>", artifact.kind)),
        })
    }

    /// Root document of a new catalog: templates plus the provenance fragment.
    pub fn root_document(&self, provenance: &MetadataDocument) -> MetadataDocument {
        self.templates
            .catalog_document(&self.placeholders)
            .merge(provenance.clone())
    }

    /// Activity document covering `window`.
    pub fn activity_document(&self, window: &ActivityWindow) -> MetadataDocument {
        self.templates
            .activity_document(&window.start, &window.end, &self.placeholders)
    }

    /// Dataset ids for the visible entries of the catalog directory, sorted.
    pub fn dataset_list<I, S>(&self, entries: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list: Vec<String> = entries
            .into_iter()
            .filter(|e| !ids::is_hidden(e.as_ref()))
            .map(|e| ids::artifact_id(&self.name, e.as_ref()))
            .collect();
        list.sort();
        list
    }
}
