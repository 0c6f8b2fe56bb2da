//! odsim - run a simulation batch and publish it into a OneData catalog.
//!
//! Usage:
//!   odsim init-config
//!   odsim run --catalog myrun --processors 4 -- <simulation arguments>

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use odsim_app::{commands, Cli, Commands};
use odsim_core::config::ConfigManager;
use odsim_core::logging::{init_tracing, LogLevel};

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let mut manager = ConfigManager::new(&cli.config);

    if let Commands::InitConfig(args) = &cli.command {
        init_tracing(cli.log_level.map(LogLevel::from).unwrap_or_default());
        commands::init_config::execute(args, &manager)?;
        return Ok(0);
    }

    manager
        .load_or_create()
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;
    let level = cli
        .log_level
        .map(LogLevel::from)
        .unwrap_or(manager.settings().logging.level);
    init_tracing(level);
    tracing::debug!("odsim {} using {}", odsim_core::version(), manager.path().display());

    match cli.command {
        Commands::Run(args) => commands::run::execute(args, &manager),
        Commands::InitConfig(_) => Ok(0),
    }
}
