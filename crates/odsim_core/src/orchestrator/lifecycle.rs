//! Catalog lifecycle: attach or create, run both stages, finalize.

use std::sync::Arc;
use std::thread::{self, Scope, ScopedJoinHandle};

use serde_json::Value;

use crate::catalog::TaskCatalog;
use crate::jobs::{discover_jobs, WorkQueue};
use crate::logging::RunLogger;
use crate::metadata::{xsd_datetime, ActivityWindow, MetadataDocument};
use crate::models::{CatalogRecord, RunParameters};
use crate::store::StoreError;

use super::errors::{PipelineError, PipelineResult};
use super::execution::ExecutionStage;
use super::publish::PublishStage;
use super::retry::RetryPolicy;
use super::stage::{run_worker, Stage, StageStats};
use super::types::{CatalogState, Collaborators, PipelineContext, PipelineOptions, RunReport, RunStats};

/// Drives one catalog through `Unattached → Active → Finalizing → Done`.
pub struct CatalogLifecycle {
    params: RunParameters,
    collaborators: Collaborators,
    options: PipelineOptions,
    state: CatalogState,
    record: CatalogRecord,
}

impl CatalogLifecycle {
    pub fn new(params: RunParameters, collaborators: Collaborators, options: PipelineOptions) -> Self {
        let record = CatalogRecord::new(&params.catalog_name, collaborators.store.root());
        Self {
            params,
            collaborators,
            options,
            state: CatalogState::Unattached,
            record,
        }
    }

    pub fn state(&self) -> CatalogState {
        self.state
    }

    pub fn record(&self) -> &CatalogRecord {
        &self.record
    }

    /// Fresh pipeline context (catalog view and empty queues) for this run.
    pub fn context(&self) -> PipelineContext {
        let catalog = TaskCatalog::new(
            &self.params,
            self.options.work_dir.clone(),
            Arc::clone(&self.collaborators.templates),
        );
        PipelineContext::new(catalog, &self.collaborators)
    }

    /// Run the whole lifecycle.
    ///
    /// On a fatal error the logger's tail of sub-job output is written out
    /// before the error is returned.
    pub fn run(&mut self) -> PipelineResult<RunReport> {
        let result = self.run_phases();
        if let Err(ref e) = result {
            let logger = &self.collaborators.logger;
            logger.error(&e.to_string());
            logger.show_tail(&self.params.catalog_name);
        }
        self.collaborators.logger.flush();
        result
    }

    fn run_phases(&mut self) -> PipelineResult<RunReport> {
        let started = xsd_datetime();
        let ctx = self.context();
        let logger = Arc::clone(&self.collaborators.logger);

        logger.phase(&format!("Catalog {}", ctx.catalog.id()));
        self.attach_or_create(&ctx.catalog)?;

        logger.phase("Processing");
        let mut stats = self.run_stages(&ctx)?;
        stats.catalog_created = self.record.created;

        logger.phase("Finalizing");
        let window = ActivityWindow::new(started, xsd_datetime());
        let catalog_metadata = self.finalize(&ctx.catalog, &window)?;

        let exit_code = if stats.abandoned() > 0 {
            logger.warn(&format!("{} item(s) were abandoned", stats.abandoned()));
            1
        } else {
            logger.success(&format!("Catalog {} done", ctx.catalog.id()));
            0
        };

        Ok(RunReport {
            exit_code,
            catalog_metadata,
            stats,
        })
    }

    /// Attach to the catalog directory, creating it (and its root metadata)
    /// when absent.
    ///
    /// Touches nothing when the catalog exists but is not writable.
    pub fn attach_or_create(&mut self, catalog: &TaskCatalog) -> PipelineResult<()> {
        if self.state != CatalogState::Unattached {
            return Ok(());
        }
        let store = Arc::clone(&self.collaborators.store);
        let logger = &self.collaborators.logger;

        if !store.is_mounted() {
            return Err(PipelineError::StoreNotMounted {
                path: store.root().to_path_buf(),
            });
        }

        let id = catalog.id();
        if store.exists(&id) {
            if !store.is_writable(&id) {
                return Err(PipelineError::CatalogLocked {
                    catalog: catalog.name().to_string(),
                });
            }
            logger.info(&format!("Resuming existing catalog {}", id));
            self.record.creation_metadata = store.get_tag(&id).ok();
        } else {
            logger.info(&format!("Creating catalog {}", id));
            let setup = |e: StoreError| PipelineError::setup_failed(catalog.name(), e);

            let doc = catalog.root_document(&self.params.provenance);
            let text = doc.to_json_string().map_err(|e| setup(e.into()))?;
            store.create_dir(&catalog.metadata_dir_id()).map_err(setup)?;
            store.write_file(&catalog.sidecar_id(), &text).map_err(setup)?;
            store.set_tag(&id, &doc).map_err(setup)?;

            self.record.created = true;
            self.record.creation_metadata = Some(doc);
        }

        self.state = CatalogState::Active;
        Ok(())
    }

    /// Spawn the workers, feed the execution queue and wait for both queues
    /// to drain. Both queues are closed and every worker joined on return.
    pub fn run_stages(&self, ctx: &PipelineContext) -> PipelineResult<RunStats> {
        let execution_stats = StageStats::new();
        let publish_stats = StageStats::new();
        let processors = self.params.processors.max(1);

        let fed = thread::scope(|scope| {
            let mut workers = Vec::with_capacity(processors + 1);
            let mut spawned = Ok(());

            for index in 0..processors {
                let name = format!("execution-{}", index);
                match spawn_worker(
                    scope,
                    &name,
                    ExecutionStage::new(ctx),
                    &ctx.execution_queue,
                    &self.options.execution_retry,
                    &execution_stats,
                    &ctx.logger,
                ) {
                    Ok(handle) => workers.push((name, handle)),
                    Err(e) => {
                        spawned = Err(e);
                        break;
                    }
                }
            }
            if spawned.is_ok() {
                let name = "publish".to_string();
                match spawn_worker(
                    scope,
                    &name,
                    PublishStage::new(ctx),
                    &ctx.publish_queue,
                    &self.options.publish_retry,
                    &publish_stats,
                    &ctx.logger,
                ) {
                    Ok(handle) => workers.push((name, handle)),
                    Err(e) => spawned = Err(e),
                }
            }

            let fed = spawned.and_then(|()| self.feed(ctx));
            if fed.is_ok() {
                ctx.execution_queue.join();
                ctx.publish_queue.join();
            }
            ctx.close_queues();

            for (name, handle) in workers {
                if handle.join().is_err() {
                    return Err(PipelineError::WorkerPanicked { worker: name });
                }
            }
            fed
        })?;

        Ok(RunStats {
            catalog_created: false,
            jobs_discovered: fed.0,
            lines_rejected: fed.1,
            execution: execution_stats.summary(),
            publish: publish_stats.summary(),
        })
    }

    /// Enumerate sub-jobs and put them on the execution queue.
    ///
    /// Returns the number of jobs queued and of lines rejected.
    fn feed(&self, ctx: &PipelineContext) -> PipelineResult<(usize, usize)> {
        let lines = self
            .collaborators
            .enumerator
            .enumerate(&self.params)
            .map_err(|e| PipelineError::enumeration_failed(ctx.catalog.name(), e))?;

        let (jobs, rejected) = discover_jobs(&lines, ctx.catalog.name());
        for (line, err) in &rejected {
            ctx.logger.warn(&format!("Skipping enumeration line {:?}: {}", line, err));
        }

        let count = jobs.len();
        ctx.logger.info(&format!("Queueing {} sub-job(s)", count));
        for job in jobs {
            ctx.execution_queue.put(job);
        }
        Ok((count, rejected.len()))
    }

    /// Rewrite the catalog document: dataset list, run activity, sidecar, tag.
    pub fn finalize(
        &mut self,
        catalog: &TaskCatalog,
        window: &ActivityWindow,
    ) -> PipelineResult<MetadataDocument> {
        self.state = CatalogState::Finalizing;
        let store = Arc::clone(&self.collaborators.store);
        let fail = |e: StoreError| PipelineError::finalize_failed(catalog.name(), e);
        let id = catalog.id();

        let mut doc = match store.get_tag(&id) {
            Ok(doc) => doc,
            Err(StoreError::MissingTag(_)) => {
                self.collaborators
                    .logger
                    .warn(&format!("{} has no metadata tag, rebuilding it", id));
                catalog.root_document(&self.params.provenance)
            }
            Err(e) => return Err(fail(e)),
        };

        let datasets = catalog.dataset_list(store.list_dir(&id).map_err(fail)?);
        doc.set_field(
            "dataset",
            Value::Array(datasets.iter().cloned().map(Value::String).collect()),
        );
        let doc = doc.merge(catalog.activity_document(window));

        let text = doc.to_json_string().map_err(|e| fail(e.into()))?;
        store.write_file(&catalog.sidecar_id(), &text).map_err(fail)?;
        store.set_tag(&id, &doc).map_err(fail)?;

        self.collaborators
            .logger
            .info(&format!("Catalog lists {} dataset(s)", datasets.len()));
        self.record.dataset_list = datasets;
        self.state = CatalogState::Done;
        Ok(doc)
    }
}

fn spawn_worker<'scope, 'env, S>(
    scope: &'scope Scope<'scope, 'env>,
    name: &str,
    stage: S,
    queue: &'scope WorkQueue<S::Item>,
    policy: &'scope RetryPolicy,
    stats: &'scope StageStats,
    logger: &'scope RunLogger,
) -> PipelineResult<ScopedJoinHandle<'scope, ()>>
where
    S: Stage + 'scope,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn_scoped(scope, move || run_worker(&stage, queue, policy, stats, logger))
        .map_err(|e| PipelineError::spawn_failed(name, e))
}

/// Run one catalog with default options.
pub fn run_catalog(params: RunParameters, collaborators: Collaborators) -> PipelineResult<RunReport> {
    run_catalog_with_options(params, collaborators, PipelineOptions::default())
}

/// Run one catalog.
pub fn run_catalog_with_options(
    params: RunParameters,
    collaborators: Collaborators,
    options: PipelineOptions,
) -> PipelineResult<RunReport> {
    CatalogLifecycle::new(params, collaborators, options).run()
}
