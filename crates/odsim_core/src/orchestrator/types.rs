//! Core types for the orchestrator pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::catalog::{ArtifactRecord, TaskCatalog};
use crate::jobs::{JobEnumerator, SubJob, WorkQueue};
use crate::logging::RunLogger;
use crate::metadata::{MetadataDocument, TemplateSet};
use crate::process::ProcessRunner;
use crate::store::CatalogStore;

use super::retry::RetryPolicy;
use super::stage::StageSummary;

/// External collaborators of a run.
///
/// The core only sees the traits; the binary decides the implementations.
#[derive(Clone)]
pub struct Collaborators {
    pub enumerator: Arc<dyn JobEnumerator>,
    pub runner: Arc<dyn ProcessRunner>,
    pub store: Arc<dyn CatalogStore>,
    pub templates: Arc<TemplateSet>,
    pub logger: Arc<RunLogger>,
}

/// Tunables of a run that are not run parameters.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Directory sub-jobs run in; outputs land in `<work_dir>/<catalog>/`.
    pub work_dir: PathBuf,
    pub execution_retry: RetryPolicy,
    pub publish_retry: RetryPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            execution_retry: RetryPolicy::execution_default(),
            publish_retry: RetryPolicy::publish_default(),
        }
    }
}

/// State shared read-only by every worker of one run.
///
/// The two queues are owned here and handed to workers by reference.
pub struct PipelineContext {
    pub catalog: TaskCatalog,
    pub store: Arc<dyn CatalogStore>,
    pub runner: Arc<dyn ProcessRunner>,
    pub execution_queue: WorkQueue<SubJob>,
    pub publish_queue: WorkQueue<ArtifactRecord>,
    pub logger: Arc<RunLogger>,
}

impl PipelineContext {
    pub fn new(catalog: TaskCatalog, collaborators: &Collaborators) -> Self {
        Self {
            catalog,
            store: Arc::clone(&collaborators.store),
            runner: Arc::clone(&collaborators.runner),
            execution_queue: WorkQueue::new("execution"),
            publish_queue: WorkQueue::new("publish"),
            logger: Arc::clone(&collaborators.logger),
        }
    }

    /// Close both queues so idle workers exit.
    pub fn close_queues(&self) {
        self.execution_queue.close();
        self.publish_queue.close();
    }
}

/// Lifecycle of a catalog within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogState {
    Unattached,
    Active,
    Finalizing,
    Done,
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Whether this run created the catalog.
    pub catalog_created: bool,
    pub jobs_discovered: usize,
    /// Enumeration lines that could not be parsed.
    pub lines_rejected: usize,
    pub execution: StageSummary,
    pub publish: StageSummary,
}

impl RunStats {
    /// Items given up on by either stage.
    pub fn abandoned(&self) -> usize {
        self.execution.abandoned + self.publish.abandoned
    }
}

/// Outcome of `run_catalog`.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// `0` when every item was processed, `1` when any was abandoned.
    pub exit_code: i32,
    /// Final catalog document as written to the store.
    pub catalog_metadata: MetadataDocument,
    pub stats: RunStats,
}
