//! Sub-job discovery.
//!
//! The enumerator drives the external simulation tool to generate per-run
//! scripts and prints one `"<runNumber>:<shellCommand>"` line per sub-job.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::models::RunParameters;
use crate::process::{shell_quote, ProcessError, ProcessResult, ProcessRunner};

use super::types::{JobLineError, SubJob};

/// Produces the raw enumeration lines for a run.
pub trait JobEnumerator: Send + Sync {
    /// Generate the sub-jobs of `params` and return one line per sub-job.
    fn enumerate(&self, params: &RunParameters) -> ProcessResult<Vec<String>>;
}

/// Enumerator backed by shell scripts run in the working directory.
///
/// Setup commands run first (generate and patch the run scripts), then the
/// listing command, whose stdout is the enumeration. Commands may contain
/// `{args}` (the quoted simulation arguments) and `{catalog}`.
pub struct ScriptEnumerator {
    runner: Arc<dyn ProcessRunner>,
    work_dir: PathBuf,
    setup_commands: Vec<String>,
    listing_command: String,
    clean_work_dir: bool,
}

impl ScriptEnumerator {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        work_dir: impl Into<PathBuf>,
        setup_commands: Vec<String>,
        listing_command: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            work_dir: work_dir.into(),
            setup_commands,
            listing_command: listing_command.into(),
            clean_work_dir: true,
        }
    }

    /// Whether to remove a stale `<work_dir>/<catalog>` before generating.
    pub fn with_clean_work_dir(mut self, clean: bool) -> Self {
        self.clean_work_dir = clean;
        self
    }

    fn expand(&self, command: &str, params: &RunParameters) -> String {
        let args = params
            .sim_args
            .iter()
            .map(|a| shell_quote(a))
            .collect::<Vec<_>>()
            .join(" ");
        command
            .replace("{args}", &args)
            .replace("{catalog}", &shell_quote(&params.catalog_name))
    }

    fn clean_previous_run(&self, catalog_name: &str) -> ProcessResult<()> {
        let stale = self.work_dir.join(catalog_name);
        if stale.exists() {
            tracing::info!("Removing previous local run at {}", stale.display());
            fs::remove_dir_all(&stale).map_err(|source| ProcessError::Io {
                operation: format!("removing {}", stale.display()),
                source,
            })?;
        }
        Ok(())
    }
}

impl JobEnumerator for ScriptEnumerator {
    fn enumerate(&self, params: &RunParameters) -> ProcessResult<Vec<String>> {
        if self.clean_work_dir {
            self.clean_previous_run(&params.catalog_name)?;
        }

        for command in &self.setup_commands {
            let command = self.expand(command, params);
            self.runner.run(&command, &self.work_dir)?;
        }

        let listing = self.expand(&self.listing_command, params);
        let stdout = self.runner.run(&listing, &self.work_dir)?;
        Ok(split_lines(&stdout))
    }
}

/// Non-empty lines of an enumeration output.
pub fn split_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse enumeration lines, separating valid sub-jobs from rejected lines.
pub fn discover_jobs(
    lines: &[String],
    catalog_name: &str,
) -> (Vec<SubJob>, Vec<(String, JobLineError)>) {
    let mut jobs = Vec::with_capacity(lines.len());
    let mut rejected = Vec::new();
    for line in lines {
        match SubJob::parse(line, catalog_name) {
            Ok(job) => jobs.push(job),
            Err(e) => rejected.push((line.clone(), e)),
        }
    }
    (jobs, rejected)
}
