//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use serde::{Deserialize, Serialize};

use crate::logging::{LogConfig, LogLevel};
use crate::orchestrator::RetryPolicy;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Remote store and local working directory.
    #[serde(default)]
    pub store: StoreSettings,

    /// Execution worker pool.
    #[serde(default)]
    pub execution: ExecutionSettings,

    /// Publish worker.
    #[serde(default)]
    pub publish: PublishSettings,

    /// Sub-job enumeration scripts.
    #[serde(default)]
    pub enumeration: EnumerationSettings,

    /// Metadata template overrides.
    #[serde(default)]
    pub templates: TemplateSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// How metadata tags are attached to store paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagBackendKind {
    /// Native `onedata_json` extended attribute, as the OneData client reads it.
    #[default]
    Xattr,
    /// Hidden companion files, for mounts without extended attributes.
    Companion,
}

/// Store location settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Mount point of the OneData space.
    #[serde(default = "default_mount_path")]
    pub mount_path: String,

    #[serde(default)]
    pub tag_backend: TagBackendKind,

    /// Directory sub-jobs run in.
    #[serde(default = "default_work_dir")]
    pub work_dir: String,
}

fn default_mount_path() -> String {
    "/mnt/datahub.egi.eu/LAGOsim".to_string()
}

fn default_work_dir() -> String {
    ".".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            mount_path: default_mount_path(),
            tag_backend: TagBackendKind::default(),
            work_dir: default_work_dir(),
        }
    }
}

/// Execution stage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSettings {
    /// Number of execution workers.
    #[serde(default = "default_processors")]
    pub processors: usize,

    /// Attempts per sub-job before it is abandoned (0 = unbounded).
    #[serde(default)]
    pub max_attempts: u32,

    /// Pause after a failed attempt, in milliseconds.
    #[serde(default)]
    pub backoff_ms: u64,
}

fn default_processors() -> usize {
    1
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            processors: default_processors(),
            max_attempts: 0,
            backoff_ms: 0,
        }
    }
}

impl ExecutionSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_config(self.max_attempts, self.backoff_ms)
    }
}

/// Publish stage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishSettings {
    /// Attempts per artifact before it is abandoned (0 = unbounded).
    #[serde(default)]
    pub max_attempts: u32,

    /// Pause after a failed attempt, in milliseconds.
    #[serde(default = "default_publish_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_publish_backoff_ms() -> u64 {
    2000
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            backoff_ms: default_publish_backoff_ms(),
        }
    }
}

impl PublishSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_config(self.max_attempts, self.backoff_ms)
    }
}

/// Commands that generate and list the sub-jobs.
///
/// `{args}` expands to the quoted simulation arguments and `{catalog}` to
/// the catalog name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumerationSettings {
    /// Run in order before the listing command.
    #[serde(default = "default_setup_commands")]
    pub setup_commands: Vec<String>,

    /// Prints one `<run>:<command>` line per sub-job.
    #[serde(default = "default_listing_command")]
    pub listing_command: String,

    /// Remove `<work_dir>/<catalog>` left by a previous run first.
    #[serde(default = "default_true")]
    pub clean_work_dir: bool,
}

fn default_setup_commands() -> Vec<String> {
    vec![
        "do_sims.sh {args}".to_string(),
        // rain.pl must run the script in the foreground, not under screen
        r"sed 's/screen -d -m -a -S \$name \$script; screen -ls/\$script/' rain.pl -i".to_string(),
        // and must not produce .long files
        r"sed 's/\$llongi /F /' rain.pl -i".to_string(),
        r"sed 's/\.\/rain.pl/echo \$i: \.\/rain.pl /' go-*.sh -i".to_string(),
    ]
}

fn default_listing_command() -> String {
    "cat go-*.sh | bash 2>/dev/null".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for EnumerationSettings {
    fn default() -> Self {
        Self {
            setup_commands: default_setup_commands(),
            listing_command: default_listing_command(),
            clean_work_dir: true,
        }
    }
}

/// Template overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateSettings {
    /// Directory with replacement fragment files; missing files fall back
    /// to the embedded ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default)]
    pub level: LogLevel,

    /// Folder for per-run log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// Number of sub-job output lines to show after a fatal error.
    #[serde(default = "default_error_tail")]
    pub error_tail: usize,

    #[serde(default = "default_true")]
    pub show_timestamps: bool,
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

fn default_error_tail() -> usize {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            logs_folder: default_logs_folder(),
            error_tail: default_error_tail(),
            show_timestamps: true,
        }
    }
}

impl LoggingSettings {
    /// Per-run logger configuration.
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            error_tail: self.error_tail,
            show_timestamps: self.show_timestamps,
            ..LogConfig::default()
        }
    }
}

/// Config sections for atomic updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Store,
    Execution,
    Publish,
    Enumeration,
    Templates,
    Logging,
}

impl ConfigSection {
    /// All sections in file order.
    pub const ALL: [ConfigSection; 6] = [
        ConfigSection::Store,
        ConfigSection::Execution,
        ConfigSection::Publish,
        ConfigSection::Enumeration,
        ConfigSection::Templates,
        ConfigSection::Logging,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Store => "store",
            ConfigSection::Execution => "execution",
            ConfigSection::Publish => "publish",
            ConfigSection::Enumeration => "enumeration",
            ConfigSection::Templates => "templates",
            ConfigSection::Logging => "logging",
        }
    }

    /// Comment written above the section.
    pub fn description(&self) -> &'static str {
        match self {
            ConfigSection::Store => "Remote store mount point and local working directory",
            ConfigSection::Execution => "Execution workers (max_attempts = 0 retries forever)",
            ConfigSection::Publish => "Publish worker (max_attempts = 0 retries forever)",
            ConfigSection::Enumeration => "Sub-job generation; {args} and {catalog} are expanded",
            ConfigSection::Templates => "Directory overriding the embedded metadata fragments",
            ConfigSection::Logging => "Logging configuration",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::{Backoff, MaxAttempts};
    use std::time::Duration;

    #[test]
    fn default_settings_serializes() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        assert!(toml.contains("[store]"));
        assert!(toml.contains("[publish]"));
        assert!(toml.contains("mount_path"));
    }

    #[test]
    fn settings_round_trip() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.store.mount_path, settings.store.mount_path);
        assert_eq!(
            parsed.enumeration.setup_commands,
            settings.enumeration.setup_commands
        );
    }

    #[test]
    fn tags_default_to_extended_attributes() {
        assert_eq!(Settings::default().store.tag_backend, TagBackendKind::Xattr);
        let settings: Settings = toml::from_str("[store]\nwork_dir = \"/tmp\"\n").unwrap();
        assert_eq!(settings.store.tag_backend, TagBackendKind::Xattr);
    }

    #[test]
    fn retry_defaults() {
        let settings = Settings::default();
        assert_eq!(
            settings.execution.retry_policy(),
            RetryPolicy::execution_default()
        );
        let publish = settings.publish.retry_policy();
        assert_eq!(publish.max_attempts, MaxAttempts::Unbounded);
        assert_eq!(publish.backoff, Backoff::Fixed(Duration::from_secs(2)));
    }

    #[test]
    fn partial_sections_use_defaults() {
        let settings: Settings =
            toml::from_str("[store]\ntag_backend = \"companion\"\n[execution]\nmax_attempts = 3\n").unwrap();
        assert_eq!(settings.store.tag_backend, TagBackendKind::Companion);
        assert_eq!(settings.store.work_dir, ".");
        assert_eq!(
            settings.execution.retry_policy().max_attempts,
            MaxAttempts::Limited(3)
        );
        assert_eq!(settings.execution.processors, 1);
    }
}
