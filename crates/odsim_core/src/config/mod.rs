//! Configuration management for odsim.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Repair of files with missing or unknown tables
//! - Defaults for every missing key
//!
//! # Example
//!
//! ```no_run
//! use odsim_core::config::ConfigManager;
//!
//! let mut config = ConfigManager::new("odsim.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Store: {}", config.settings().store.mount_path);
//!
//! config.settings_mut().execution.processors = 4;
//! config.save().unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult, LoadOutcome};
pub use settings::{
    ConfigSection, EnumerationSettings, ExecutionSettings, LoggingSettings, PublishSettings,
    Settings, StoreSettings, TagBackendKind, TemplateSettings,
};
