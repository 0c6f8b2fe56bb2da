//! Run command - execute and publish one catalog.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use odsim_core::config::{ConfigManager, Settings, TagBackendKind};
use odsim_core::jobs::ScriptEnumerator;
use odsim_core::logging::RunLoggerBuilder;
use odsim_core::metadata::{MetadataDocument, TemplateSet};
use odsim_core::models::RunParameters;
use odsim_core::orchestrator::{run_catalog_with_options, Collaborators, PipelineOptions, RunReport};
use odsim_core::process::{ProcessRunner, ShellRunner};
#[cfg(feature = "xattr")]
use odsim_core::store::XattrTags;
use odsim_core::store::{CompanionFileTags, MountedStore, TagBackend};

use crate::OutputFormat;

/// Arguments for the run command.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Catalog name (directory in the store).
    #[arg(long, short = 'p')]
    pub catalog: String,

    /// Number of execution workers (overrides `[execution] processors`).
    #[arg(long, short = 'j')]
    pub processors: Option<usize>,

    /// ORCID of the operator.
    #[arg(long, short = 'u', default_value = "")]
    pub orcid: String,

    /// Commit of the simulation toolkit.
    #[arg(long, env = "ODSIM_ARTI_COMMIT", default_value = "")]
    pub arti_commit: String,

    /// Commit of this tool.
    #[arg(long, env = "ODSIM_COMMIT", default_value = "")]
    pub odsim_commit: String,

    /// Catalog handle in the store's JSON API.
    #[arg(long, default_value = "")]
    pub handle_json_api: String,

    /// Catalog handle in the store's CDMI API.
    #[arg(long, default_value = "")]
    pub handle_cdmi: String,

    /// Landing page of the catalog.
    #[arg(long, default_value = "")]
    pub landing_page: String,

    /// JSON file merged into the catalog's root metadata.
    #[arg(long)]
    pub provenance: Option<PathBuf>,

    /// Store mount point (overrides `[store] mount_path`).
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Working directory (overrides `[store] work_dir`).
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Report format.
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Arguments for the simulation driver, after `--`.
    #[arg(last = true)]
    pub sim_args: Vec<String>,
}

/// Execute the run command and return the process exit code.
///
/// # Errors
///
/// Returns an error if setup fails or the run hits a fatal pipeline error.
pub fn execute(args: RunArgs, manager: &ConfigManager) -> Result<i32> {
    let settings = manager.settings();
    let params = parameters(&args, settings)?;

    let work_dir = args
        .work_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&settings.store.work_dir));
    let mount_path = args
        .store
        .clone()
        .unwrap_or_else(|| PathBuf::from(&settings.store.mount_path));

    let runner: Arc<dyn ProcessRunner> = Arc::new(ShellRunner::new());
    let store = MountedStore::new(&mount_path)
        .with_tags(tag_backend(settings.store.tag_backend)?)
        .with_mv_fallback(Arc::clone(&runner));
    let enumerator = ScriptEnumerator::new(
        Arc::clone(&runner),
        work_dir.clone(),
        settings.enumeration.setup_commands.clone(),
        settings.enumeration.listing_command.clone(),
    )
    .with_clean_work_dir(settings.enumeration.clean_work_dir);

    let templates = match &settings.templates.dir {
        Some(dir) => TemplateSet::from_dir(Path::new(dir))
            .with_context(|| format!("Failed to load templates from {}", dir))?,
        None => TemplateSet::embedded()?,
    };

    let logger = RunLoggerBuilder::new(&params.catalog_name)
        .log_dir(manager.logs_folder())
        .config(settings.logging.log_config())
        .build()
        .context("Failed to create the run log")?;

    let collaborators = Collaborators {
        enumerator: Arc::new(enumerator),
        runner,
        store: Arc::new(store),
        templates: Arc::new(templates),
        logger: Arc::new(logger),
    };
    let options = PipelineOptions {
        work_dir,
        execution_retry: settings.execution.retry_policy(),
        publish_retry: settings.publish.retry_policy(),
    };

    tracing::info!(
        "Running catalog {} into {}",
        params.catalog_name,
        mount_path.display()
    );
    let report = run_catalog_with_options(params, collaborators, options)?;
    print_report(&report, args.format)?;
    Ok(report.exit_code)
}

fn parameters(args: &RunArgs, settings: &Settings) -> Result<RunParameters> {
    let provenance = match &args.provenance {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            MetadataDocument::from_json_str(&text)
                .with_context(|| format!("Invalid provenance JSON in {}", path.display()))?
        }
        None => MetadataDocument::empty(),
    };

    Ok(RunParameters::new(
        &args.catalog,
        args.processors.unwrap_or(settings.execution.processors),
    )
    .with_orcid(&args.orcid)
    .with_commits(&args.arti_commit, &args.odsim_commit)
    .with_handles(&args.handle_json_api, &args.handle_cdmi, &args.landing_page)
    .with_sim_args(args.sim_args.clone())
    .with_provenance(provenance))
}

fn tag_backend(kind: TagBackendKind) -> Result<Box<dyn TagBackend>> {
    match kind {
        TagBackendKind::Companion => Ok(Box::new(CompanionFileTags::new())),
        #[cfg(feature = "xattr")]
        TagBackendKind::Xattr => Ok(Box::new(XattrTags::new())),
        #[cfg(not(feature = "xattr"))]
        TagBackendKind::Xattr => {
            anyhow::bail!("tag_backend = \"xattr\" requires odsim built with the `xattr` feature")
        }
    }
}

fn print_report(report: &RunReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "exitCode": report.exit_code,
                    "stats": report.stats,
                    "catalog": report.catalog_metadata,
                }))
                .context("Failed to serialize report")?
            );
        }
        OutputFormat::Text => {
            let stats = &report.stats;
            println!(
                "Catalog {}",
                report.catalog_metadata.id().unwrap_or("(no @id)")
            );
            println!("  Created:    {}", stats.catalog_created);
            println!(
                "  Sub-jobs:   {} queued, {} rejected",
                stats.jobs_discovered, stats.lines_rejected
            );
            println!(
                "  Executed:   {} run, {} skipped, {} retries, {} abandoned",
                stats.execution.completed,
                stats.execution.skipped,
                stats.execution.retries,
                stats.execution.abandoned
            );
            println!(
                "  Published:  {} artifacts, {} retries, {} abandoned",
                stats.publish.completed, stats.publish.retries, stats.publish.abandoned
            );
        }
    }
    Ok(())
}
