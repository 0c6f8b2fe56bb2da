//! Execution stage: run sub-jobs and hand their artifacts to publishing.

use crate::jobs::SubJob;
use crate::metadata::{xsd_datetime, ActivityWindow};

use super::errors::StageResult;
use super::stage::{Stage, TaskOutcome};
use super::types::PipelineContext;

/// Runs one sub-job per item, skipping jobs whose outputs are all in the store.
pub struct ExecutionStage<'a> {
    ctx: &'a PipelineContext,
}

impl<'a> ExecutionStage<'a> {
    pub fn new(ctx: &'a PipelineContext) -> Self {
        Self { ctx }
    }
}

impl Stage for ExecutionStage<'_> {
    type Item = SubJob;

    fn name(&self) -> &str {
        "execution"
    }

    fn process(&self, job: &SubJob) -> StageResult<TaskOutcome> {
        let ctx = self.ctx;
        let catalog = &ctx.catalog;

        let planned = catalog.expected_artifacts(job, &ActivityWindow::now());
        match catalog.first_missing(&planned, ctx.store.as_ref()) {
            None => return Ok(TaskOutcome::Skipped("all outputs already published".into())),
            Some(missing) => tracing::debug!("{} not in store, running {}", missing, job),
        }

        let start = xsd_datetime();
        ctx.logger.command(job.command());
        let output = ctx.runner.run(job.command(), catalog.work_dir())?;
        ctx.logger.output_lines(&output);
        let end = xsd_datetime();

        let window = ActivityWindow::new(start, end);
        for artifact in catalog.expected_artifacts(job, &window) {
            ctx.publish_queue.put(artifact);
        }
        ctx.logger.success(&format!("Completed {}", job.run_number()));
        Ok(TaskOutcome::Completed)
    }
}
