//! Error types for the orchestrator pipeline.
//!
//! Two layers: `StageError` is the outcome of one task attempt and is
//! absorbed by the retry loop; `PipelineError` ends the run.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::metadata::MetadataError;
use crate::process::ProcessError;
use crate::store::StoreError;

/// Fatal error of a catalog run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The store root is not present.
    #[error("Store is not mounted at {path}")]
    StoreNotMounted { path: PathBuf },

    /// The catalog exists but this run cannot write to it.
    #[error("Catalog '{catalog}' exists and is not writable")]
    CatalogLocked { catalog: String },

    /// Creating or attaching the catalog failed.
    #[error("Catalog '{catalog}' setup failed: {source}")]
    SetupFailed {
        catalog: String,
        #[source]
        source: StoreError,
    },

    /// The job enumerator failed.
    #[error("Enumerating sub-jobs of '{catalog}' failed: {source}")]
    EnumerationFailed {
        catalog: String,
        #[source]
        source: ProcessError,
    },

    /// A worker thread could not be started.
    #[error("Failed to spawn worker '{worker}': {source}")]
    SpawnFailed {
        worker: String,
        #[source]
        source: io::Error,
    },

    /// A worker thread panicked outside a task.
    #[error("Worker '{worker}' panicked")]
    WorkerPanicked { worker: String },

    /// Writing the final catalog metadata failed.
    #[error("Finalizing catalog '{catalog}' failed: {source}")]
    FinalizeFailed {
        catalog: String,
        #[source]
        source: StoreError,
    },
}

impl PipelineError {
    /// Create a setup failed error.
    pub fn setup_failed(catalog: impl Into<String>, source: impl Into<StoreError>) -> Self {
        Self::SetupFailed {
            catalog: catalog.into(),
            source: source.into(),
        }
    }

    /// Create a finalize failed error.
    pub fn finalize_failed(catalog: impl Into<String>, source: impl Into<StoreError>) -> Self {
        Self::FinalizeFailed {
            catalog: catalog.into(),
            source: source.into(),
        }
    }

    /// Create an enumeration failed error.
    pub fn enumeration_failed(catalog: impl Into<String>, source: ProcessError) -> Self {
        Self::EnumerationFailed {
            catalog: catalog.into(),
            source,
        }
    }

    /// Create a spawn failed error.
    pub fn spawn_failed(worker: impl Into<String>, source: io::Error) -> Self {
        Self::SpawnFailed {
            worker: worker.into(),
            source,
        }
    }
}

/// Failure of one task attempt.
#[derive(Error, Debug)]
pub enum StageError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The stage panicked while processing the task.
    #[error("Task panicked: {0}")]
    Panicked(String),
}

/// Result type for stage operations.
pub type StageResult<T> = Result<T, StageError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
