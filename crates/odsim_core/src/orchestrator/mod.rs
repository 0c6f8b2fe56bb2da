//! Dual-stage pipeline for one catalog run.
//!
//! # Architecture
//!
//! ```text
//! CatalogLifecycle
//!     ├── attach_or_create
//!     ├── enumerator ──▶ execution queue ──▶ ExecutionStage × N
//!     │                                          │
//!     │                  publish queue ◀─────────┘
//!     │                      │
//!     │                      └──▶ PublishStage × 1
//!     └── finalize
//! ```
//!
//! Workers run `run_worker`, which applies each stage's `RetryPolicy`.
//! The lifecycle waits on both queues' join barriers, closes them and
//! joins the worker threads before finalizing.

mod errors;
mod execution;
mod lifecycle;
mod publish;
mod retry;
mod stage;
mod types;

pub use errors::{PipelineError, PipelineResult, StageError, StageResult};
pub use execution::ExecutionStage;
pub use lifecycle::{run_catalog, run_catalog_with_options, CatalogLifecycle};
pub use publish::PublishStage;
pub use retry::{Backoff, MaxAttempts, RetryPolicy};
pub use stage::{run_worker, Stage, StageStats, StageSummary, TaskOutcome};
pub use types::{CatalogState, Collaborators, PipelineContext, PipelineOptions, RunReport, RunStats};
