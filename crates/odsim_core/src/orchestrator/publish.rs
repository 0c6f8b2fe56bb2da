//! Publish stage: move artifacts into the store and attach their metadata.

use crate::catalog::{ids, ArtifactRecord};
use crate::store::StoreError;

use super::errors::StageResult;
use super::stage::{Stage, TaskOutcome};
use super::types::PipelineContext;

/// Relocates one artifact per item, then tags it and writes its sidecar.
///
/// Safe to repeat: an artifact already moved by an earlier attempt is not
/// moved again, and tag and sidecar writes overwrite.
pub struct PublishStage<'a> {
    ctx: &'a PipelineContext,
}

impl<'a> PublishStage<'a> {
    pub fn new(ctx: &'a PipelineContext) -> Self {
        Self { ctx }
    }
}

impl Stage for PublishStage<'_> {
    type Item = ArtifactRecord;

    fn name(&self) -> &str {
        "publish"
    }

    fn process(&self, artifact: &ArtifactRecord) -> StageResult<TaskOutcome> {
        let ctx = self.ctx;
        let id = artifact.require_id()?;
        let local = ctx.catalog.local_path(id);

        if local.exists() {
            ctx.store.relocate(&local, id)?;
        } else if ctx.store.exists(id) {
            tracing::debug!("{} already relocated", id);
        } else {
            return Err(StoreError::NotFound(local).into());
        }

        ctx.store.set_tag(id, &artifact.metadata)?;
        let sidecar = artifact.metadata.to_json_string()?;
        ctx.store.write_file(&ids::sidecar_id(id), &sidecar)?;

        ctx.logger.debug(&format!("Published {}", id));
        Ok(TaskOutcome::Completed)
    }
}
