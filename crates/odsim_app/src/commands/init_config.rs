//! Init-config command - write a configuration file with the defaults.

use anyhow::{bail, Result};
use clap::Args;
use odsim_core::config::ConfigManager;

/// Arguments for the init-config command.
#[derive(Debug, Args)]
pub struct InitConfigArgs {
    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

/// Execute the init-config command.
///
/// # Errors
///
/// Returns an error if the file exists (without `--force`) or cannot be written.
pub fn execute(args: &InitConfigArgs, manager: &ConfigManager) -> Result<()> {
    if manager.path().exists() && !args.force {
        bail!(
            "{} already exists, use --force to overwrite it",
            manager.path().display()
        );
    }
    manager.save()?;
    println!("Wrote {}", manager.path().display());
    Ok(())
}
