//! Stage trait and the supervisor loop that drives it.
//!
//! A stage processes one queue item per call and reports a `Result`. The
//! supervisor (`run_worker`) owns every queue interaction: it marks items
//! done, requeues failures according to the stage's `RetryPolicy` and
//! abandons them once the policy is exhausted.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use serde::Serialize;

use crate::jobs::WorkQueue;
use crate::logging::RunLogger;

use super::errors::{StageError, StageResult};
use super::retry::RetryPolicy;

/// Result of successfully processing one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The item's work was done.
    Completed,
    /// Nothing to do, with the reason.
    Skipped(String),
}

/// One consumer stage of the pipeline.
pub trait Stage: Send + Sync {
    /// Queue item type.
    type Item: fmt::Display + Send;

    /// Stage name (for logging).
    fn name(&self) -> &str;

    /// Process one item. Errors are retried by the supervisor.
    fn process(&self, item: &Self::Item) -> StageResult<TaskOutcome>;
}

/// Counters shared by all workers of a stage.
#[derive(Debug, Default)]
pub struct StageStats {
    completed: AtomicUsize,
    skipped: AtomicUsize,
    retries: AtomicUsize,
    abandoned: AtomicUsize,
}

impl StageStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self) -> StageSummary {
        StageSummary {
            completed: self.completed.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
            retries: self.retries.load(Ordering::SeqCst),
            abandoned: self.abandoned.load(Ordering::SeqCst),
        }
    }
}

/// Point-in-time copy of `StageStats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageSummary {
    pub completed: usize,
    pub skipped: usize,
    /// Failed attempts that were put back on the queue.
    pub retries: usize,
    /// Items given up on after exhausting the retry policy.
    pub abandoned: usize,
}

/// Consume `queue` with `stage` until the queue is closed and empty.
///
/// Every item taken is either marked done (completed, skipped or abandoned)
/// or requeued, so the queue's join barrier stays accurate.
pub fn run_worker<S: Stage>(
    stage: &S,
    queue: &WorkQueue<S::Item>,
    policy: &RetryPolicy,
    stats: &StageStats,
    logger: &RunLogger,
) {
    while let Some(mut task) = queue.get() {
        task.attempts = task.attempts.saturating_add(1);

        match process_guarded(stage, &task.item) {
            Ok(TaskOutcome::Completed) => {
                stats.completed.fetch_add(1, Ordering::SeqCst);
                queue.task_done();
            }
            Ok(TaskOutcome::Skipped(reason)) => {
                logger.info(&format!("{}: skipped {} ({})", stage.name(), task.item, reason));
                stats.skipped.fetch_add(1, Ordering::SeqCst);
                queue.task_done();
            }
            Err(e) if policy.max_attempts.allows_another(task.attempts) => {
                logger.retry(&format!(
                    "{}: {} failed on attempt {}: {}",
                    stage.name(),
                    task.item,
                    task.attempts,
                    e
                ));
                stats.retries.fetch_add(1, Ordering::SeqCst);
                queue.requeue(task);
                if let Some(delay) = policy.backoff.delay() {
                    thread::sleep(delay);
                }
            }
            Err(e) => {
                logger.error(&format!(
                    "{}: abandoning {} after {} attempts: {}",
                    stage.name(),
                    task.item,
                    task.attempts,
                    e
                ));
                stats.abandoned.fetch_add(1, Ordering::SeqCst);
                queue.task_done();
            }
        }
    }
    tracing::debug!("{} worker exiting, queue '{}' closed", stage.name(), queue.name());
}

/// Turn a panic inside `process` into a retryable error so the item is
/// still accounted for.
fn process_guarded<S: Stage>(stage: &S, item: &S::Item) -> StageResult<TaskOutcome> {
    match panic::catch_unwind(AssertUnwindSafe(|| stage.process(item))) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(StageError::Panicked(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogConfig;
    use crate::orchestrator::retry::{Backoff, MaxAttempts};
    use crate::process::ProcessError;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Fails each item a configured number of times, then succeeds.
    struct FlakyStage {
        failures: HashMap<u32, u32>,
        attempts: Mutex<HashMap<u32, u32>>,
    }

    impl FlakyStage {
        fn new(failures: &[(u32, u32)]) -> Self {
            Self {
                failures: failures.iter().copied().collect(),
                attempts: Mutex::new(HashMap::new()),
            }
        }

        fn attempts(&self, item: u32) -> u32 {
            self.attempts.lock().get(&item).copied().unwrap_or(0)
        }
    }

    impl Stage for FlakyStage {
        type Item = u32;

        fn name(&self) -> &str {
            "flaky"
        }

        fn process(&self, item: &u32) -> StageResult<TaskOutcome> {
            let mut attempts = self.attempts.lock();
            let count = attempts.entry(*item).or_insert(0);
            *count += 1;
            if *item == 99 {
                return Ok(TaskOutcome::Skipped("nothing to do".into()));
            }
            if *count <= self.failures.get(item).copied().unwrap_or(0) {
                return Err(ProcessError::failed("job", 1, "transient").into());
            }
            Ok(TaskOutcome::Completed)
        }
    }

    fn drive(stage: &FlakyStage, items: &[u32], policy: RetryPolicy) -> StageSummary {
        let queue = WorkQueue::new("test");
        let stats = StageStats::new();
        let logger = RunLogger::detached("test", LogConfig::default(), None);
        for item in items {
            queue.put(*item);
        }
        thread::scope(|s| {
            s.spawn(|| run_worker(stage, &queue, &policy, &stats, &logger));
            queue.join();
            queue.close();
        });
        assert_eq!(queue.unfinished(), 0);
        stats.summary()
    }

    #[test]
    fn unbounded_policy_retries_until_success() {
        let stage = FlakyStage::new(&[(1, 5)]);
        let summary = drive(&stage, &[1, 2], RetryPolicy::execution_default());
        assert_eq!(stage.attempts(1), 6);
        assert_eq!(stage.attempts(2), 1);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.retries, 5);
        assert_eq!(summary.abandoned, 0);
    }

    #[test]
    fn limited_policy_abandons() {
        let stage = FlakyStage::new(&[(1, 10)]);
        let policy = RetryPolicy::new(MaxAttempts::Limited(3), Backoff::None);
        let summary = drive(&stage, &[1, 2], policy);
        assert_eq!(stage.attempts(1), 3);
        assert_eq!(summary.abandoned, 1);
        assert_eq!(summary.retries, 2);
        assert_eq!(summary.completed, 1);
    }

    #[test]
    fn skipped_items_are_done() {
        let stage = FlakyStage::new(&[]);
        let summary = drive(&stage, &[99], RetryPolicy::execution_default());
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.completed, 0);
    }

    struct PanickingStage;

    impl Stage for PanickingStage {
        type Item = u32;

        fn name(&self) -> &str {
            "panicking"
        }

        fn process(&self, _item: &u32) -> StageResult<TaskOutcome> {
            panic!("kaboom");
        }
    }

    #[test]
    fn panics_become_errors() {
        let err = process_guarded(&PanickingStage, &1).unwrap_err();
        assert!(matches!(err, StageError::Panicked(ref m) if m == "kaboom"));
    }
}
