//! Sub-job descriptors and identifier derivation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Extension of the per-run steering scripts written by the enumerator.
const RUN_SCRIPT_EXTENSION: &str = ".run";

/// Width of the parameter code accepted by the simulation tool.
const PARAM_CODE_WIDTH: usize = 4;

/// Errors raised while parsing an enumeration line.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum JobLineError {
    #[error("Line has no '<run>:<command>' separator: {0:?}")]
    MissingSeparator(String),

    #[error("Run number {0:?} is not an integer")]
    InvalidRunNumber(String),

    #[error("Command does not reference catalog '{catalog}': {command:?}")]
    CatalogNotInCommand { catalog: String, command: String },

    #[error("No run suffix after catalog '{catalog}' in {command:?}")]
    EmptySuffix { catalog: String, command: String },
}

/// One independent simulation sub-job.
///
/// Immutable once parsed; identity is its [`SubJob::file_code`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubJob {
    run_number: String,
    param_code: String,
    suffix: String,
    command: String,
}

impl SubJob {
    /// Parse a `"<runNumber>:<shellCommand>"` line produced by the enumerator.
    ///
    /// Only the first `:` separates the run number, the command may contain more.
    pub fn parse(line: &str, catalog_name: &str) -> Result<Self, JobLineError> {
        let (run_number, command) = line
            .split_once(':')
            .ok_or_else(|| JobLineError::MissingSeparator(line.to_string()))?;
        let run_number = run_number.trim();
        let command = command.trim();

        let param_code = param_code(run_number)?;
        let suffix = run_suffix(command, catalog_name)?;

        Ok(Self {
            run_number: run_number.to_string(),
            param_code,
            suffix,
            command: command.to_string(),
        })
    }

    /// Run number as written by the enumerator.
    pub fn run_number(&self) -> &str {
        &self.run_number
    }

    /// Four-character parameter code.
    pub fn param_code(&self) -> &str {
        &self.param_code
    }

    /// Suffix taken from the run script name.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Shell command that runs this sub-job.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// `runNumber-paramCode-suffix`.
    pub fn file_code(&self) -> String {
        format!("{}-{}-{}", self.run_number, self.param_code, self.suffix)
    }
}

impl fmt::Display for SubJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_code())
    }
}

/// Zero-pad the run number to four digits and keep the last four.
///
/// `7 -> "0007"`, `12345 -> "2345"`.
pub fn param_code(run_number: &str) -> Result<String, JobLineError> {
    let number: u64 = run_number
        .trim()
        .parse()
        .map_err(|_| JobLineError::InvalidRunNumber(run_number.to_string()))?;
    let padded = format!("{:0width$}", number, width = PARAM_CODE_WIDTH);
    Ok(padded[padded.len() - PARAM_CODE_WIDTH..].to_string())
}

/// Extract the run suffix from the path token following the catalog name.
///
/// The token after `<catalog>` has its separators and the `.run` extension
/// removed. Script names of the form `NAME-CODE-...` keep only their second
/// `-` field.
fn run_suffix(command: &str, catalog_name: &str) -> Result<String, JobLineError> {
    let not_found = || JobLineError::CatalogNotInCommand {
        catalog: catalog_name.to_string(),
        command: command.to_string(),
    };
    if catalog_name.is_empty() {
        return Err(not_found());
    }

    // Prefer the catalog name used as a directory segment.
    let segment = format!("{}/", catalog_name);
    let start = match command.find(&segment) {
        Some(pos) => pos + catalog_name.len(),
        None => command.find(catalog_name).ok_or_else(not_found)? + catalog_name.len(),
    };

    let tail = &command[start..];
    let token_end = tail
        .find(|c: char| c.is_whitespace())
        .unwrap_or(tail.len());
    let token: String = tail[..token_end].chars().filter(|c| *c != '/').collect();
    let token = token.strip_suffix(RUN_SCRIPT_EXTENSION).unwrap_or(&token);

    let suffix = match token.split('-').nth(1) {
        Some(field) => field,
        None => token,
    };

    if suffix.is_empty() {
        return Err(JobLineError::EmptySuffix {
            catalog: catalog_name.to_string(),
            command: command.to_string(),
        });
    }
    Ok(suffix.to_string())
}
