//! Sub-jobs, their queue and their discovery.
//!
//! This module provides:
//! - `SubJob`: one simulation sub-job and its `fileCode`
//! - `WorkQueue`: blocking FIFO with a join barrier, shared by the stages
//! - `JobEnumerator` / `ScriptEnumerator`: sub-job discovery

mod discovery;
mod queue;
mod types;

pub use discovery::{discover_jobs, split_lines, JobEnumerator, ScriptEnumerator};
pub use queue::{Task, WorkQueue};
pub use types::{param_code, JobLineError, SubJob};
