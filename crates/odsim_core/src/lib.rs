//! odsim core - batch simulation execution and catalog publishing
//!
//! This crate runs a batch of independent simulation sub-jobs on a worker
//! pool and publishes every output artifact, with merged JSON-LD metadata,
//! into a catalog on a mounted OneData space. It has no CLI dependencies;
//! the `odsim` binary wires concrete collaborators into [`orchestrator::run_catalog`].

pub mod catalog;
pub mod config;
pub mod jobs;
pub mod logging;
pub mod metadata;
pub mod models;
pub mod orchestrator;
pub mod process;
pub mod store;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
