//! Subcommand implementations.

pub mod init_config;
pub mod run;
