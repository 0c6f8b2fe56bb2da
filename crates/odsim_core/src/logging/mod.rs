//! Logging for odsim runs.
//!
//! Two layers: process-wide `tracing` output set up by `init_tracing`, and a
//! `RunLogger` per catalog run that writes `<logs>/<catalog>.log`, keeps a
//! tail of sub-job output for failure reports and mirrors its lines into
//! `tracing`.
//!
//! # Example
//!
//! ```no_run
//! use odsim_core::logging::{LogConfig, RunLogger};
//!
//! let logger = RunLogger::new("myrun", "/path/to/logs", LogConfig::default(), None).unwrap();
//!
//! logger.phase("Execution");
//! logger.command("bash go-myrun-3.sh");
//! logger.success("Completed 3-0003-DAT0003");
//! ```

mod run_logger;
mod types;

pub use run_logger::{RunLogger, RunLoggerBuilder};
pub use types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global `tracing` subscriber on stderr.
///
/// `RUST_LOG` wins over `default_level`. Call once, from the binary.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_str()));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_names(true),
        )
        .with(filter)
        .init();
}

/// Warnings and above, captured per test.
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
