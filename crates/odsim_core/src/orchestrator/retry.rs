//! Retry policies for the stage supervisors.

use std::time::Duration;

/// How many attempts a task gets before it is abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxAttempts {
    /// Retry forever.
    Unbounded,
    /// Give up after this many attempts.
    Limited(u32),
}

impl MaxAttempts {
    /// Config encoding: `0` means unbounded.
    pub fn from_count(count: u32) -> Self {
        if count == 0 {
            MaxAttempts::Unbounded
        } else {
            MaxAttempts::Limited(count)
        }
    }

    /// Whether another attempt is allowed after `attempts_made` failures.
    pub fn allows_another(self, attempts_made: u32) -> bool {
        match self {
            MaxAttempts::Unbounded => true,
            MaxAttempts::Limited(limit) => attempts_made < limit,
        }
    }
}

/// Pause taken by a worker after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    None,
    Fixed(Duration),
}

impl Backoff {
    /// Config encoding: `0` means no pause.
    pub fn from_millis(millis: u64) -> Self {
        if millis == 0 {
            Backoff::None
        } else {
            Backoff::Fixed(Duration::from_millis(millis))
        }
    }

    pub fn delay(self) -> Option<Duration> {
        match self {
            Backoff::None => None,
            Backoff::Fixed(delay) => Some(delay),
        }
    }
}

/// Requeue decision inputs for one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: MaxAttempts,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: MaxAttempts, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Execution stage default: retry forever, immediately.
    pub fn execution_default() -> Self {
        Self::new(MaxAttempts::Unbounded, Backoff::None)
    }

    /// Publish stage default: retry forever, two seconds apart.
    pub fn publish_default() -> Self {
        Self::new(MaxAttempts::Unbounded, Backoff::Fixed(Duration::from_secs(2)))
    }

    /// Build from the config encoding (`0` attempts = unbounded, `0` ms = no pause).
    pub fn from_config(max_attempts: u32, backoff_ms: u64) -> Self {
        Self::new(
            MaxAttempts::from_count(max_attempts),
            Backoff::from_millis(backoff_ms),
        )
    }
}
