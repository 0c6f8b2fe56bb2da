//! # odsim
//!
//! Command-line interface for running a simulation batch and publishing it
//! as a catalog on a mounted OneData space.
//!
//! ## Commands
//!
//! - `odsim run` - Run every sub-job of a catalog and publish the outputs
//! - `odsim init-config` - Write a configuration file with the defaults
//!
//! ## Configuration
//!
//! Settings come from a TOML file (`--config`, `ODSIM_CONFIG`, default
//! `odsim.toml`); command-line flags override it. `RUST_LOG` overrides the
//! configured log level.

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use odsim_core::logging::LogLevel;

/// odsim - simulation batch execution and catalog publishing.
#[derive(Debug, Parser)]
#[command(name = "odsim")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file.
    #[arg(long, env = "ODSIM_CONFIG", default_value = "odsim.toml")]
    pub config: PathBuf,

    /// Log level (overrides the config file).
    #[arg(long)]
    pub log_level: Option<LevelArg>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a catalog.
    Run(commands::run::RunArgs),
    /// Write a default configuration file.
    InitConfig(commands::init_config::InitConfigArgs),
}

/// Log level accepted on the command line.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LevelArg {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LevelArg> for LogLevel {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::Trace => LogLevel::Trace,
            LevelArg::Debug => LogLevel::Debug,
            LevelArg::Info => LogLevel::Info,
            LevelArg::Warn => LogLevel::Warn,
            LevelArg::Error => LogLevel::Error,
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary.
    #[default]
    Text,
    /// Run report as JSON.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_sim_args() {
        let cli = Cli::parse_from([
            "odsim",
            "--config",
            "/etc/odsim.toml",
            "run",
            "--catalog",
            "myrun",
            "--processors",
            "4",
            "--orcid",
            "0000-0001-6497-753X",
            "--",
            "-p",
            "myrun",
            "-t",
            "100",
        ]);

        assert_eq!(cli.config, PathBuf::from("/etc/odsim.toml"));
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.catalog, "myrun");
                assert_eq!(args.processors, Some(4));
                assert_eq!(args.orcid, "0000-0001-6497-753X");
                assert_eq!(args.sim_args, vec!["-p", "myrun", "-t", "100"]);
                assert!(matches!(args.format, OutputFormat::Text));
            }
            Commands::InitConfig(_) => panic!("expected run"),
        }
    }

    #[test]
    fn parses_init_config() {
        let cli = Cli::parse_from(["odsim", "--log-level", "debug", "init-config", "--force"]);
        assert!(matches!(cli.log_level, Some(LevelArg::Debug)));
        assert!(matches!(
            cli.command,
            Commands::InitConfig(ref args) if args.force
        ));
    }
}
