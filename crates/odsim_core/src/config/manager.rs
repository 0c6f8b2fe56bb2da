//! Reading, repairing and rewriting `odsim.toml`.
//!
//! The file is always regenerated from `Settings`, with a comment above
//! each table. `toml_edit` is only used to inspect which tables a file on
//! disk carries. Every write goes to `<name>.toml.tmp` first and is renamed
//! over the file.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::DocumentMut;

use super::settings::{ConfigSection, Settings};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config in {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Cannot edit config {path}: {source}")]
    Edit {
        path: PathBuf,
        #[source]
        source: toml_edit::TomlError,
    },

    #[error("Cannot encode settings: {0}")]
    Encode(#[from] toml::ser::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// What `load_or_create` had to do to produce usable settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The file was read as is.
    Loaded,
    /// The file was read, then rewritten to add or drop these tables.
    Repaired(Vec<String>),
    /// No file existed; one was written with the defaults.
    Created,
}

/// Owns the settings of one config file.
pub struct ConfigManager {
    path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Settings start at their defaults until `load_or_create`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// In-memory only until `save`.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Read the file, writing the defaults first when it does not exist.
    ///
    /// Tables that are absent are filled with defaults and tables odsim does
    /// not know are dropped; either case rewrites the file.
    pub fn load_or_create(&mut self) -> ConfigResult<LoadOutcome> {
        if !self.path.exists() {
            self.settings = Settings::default();
            self.save()?;
            tracing::info!("Wrote default config to {}", self.path.display());
            return Ok(LoadOutcome::Created);
        }

        let text = self.read()?;
        self.settings = self.decode(&text)?;

        let stale = self.stale_tables(&text)?;
        if stale.is_empty() {
            return Ok(LoadOutcome::Loaded);
        }
        tracing::info!(
            "Repairing config {} (tables: {})",
            self.path.display(),
            stale.join(", ")
        );
        self.save()?;
        Ok(LoadOutcome::Repaired(stale))
    }

    /// Directory the per-run log files go to.
    pub fn logs_folder(&self) -> PathBuf {
        PathBuf::from(&self.settings.logging.logs_folder)
    }

    /// Regenerate the whole file from the current settings.
    pub fn save(&self) -> ConfigResult<()> {
        let text = self.render()?;
        self.write_atomically(&text)
    }

    fn read(&self) -> ConfigResult<String> {
        fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn decode(&self, text: &str) -> ConfigResult<Settings> {
        toml::from_str(text).map_err(|source| ConfigError::Invalid {
            path: self.path.clone(),
            source,
        })
    }

    fn edit_doc(&self, text: &str) -> ConfigResult<DocumentMut> {
        text.parse().map_err(|source| ConfigError::Edit {
            path: self.path.clone(),
            source,
        })
    }

    /// Names of tables that are missing from or unknown to `text`.
    fn stale_tables(&self, text: &str) -> ConfigResult<Vec<String>> {
        let doc = self.edit_doc(text)?;
        let known: Vec<&str> = ConfigSection::ALL.iter().map(|s| s.table_name()).collect();

        let missing = known
            .iter()
            .filter(|name| !doc.contains_key(name))
            .map(|name| name.to_string());
        let unknown = doc
            .iter()
            .map(|(key, _)| key)
            .filter(|key| !known.contains(key))
            .map(str::to_string);

        Ok(missing.chain(unknown).collect())
    }

    fn section_toml(&self, section: ConfigSection) -> ConfigResult<String> {
        let s = &self.settings;
        let text = match section {
            ConfigSection::Store => toml::to_string_pretty(&s.store)?,
            ConfigSection::Execution => toml::to_string_pretty(&s.execution)?,
            ConfigSection::Publish => toml::to_string_pretty(&s.publish)?,
            ConfigSection::Enumeration => toml::to_string_pretty(&s.enumeration)?,
            ConfigSection::Templates => toml::to_string_pretty(&s.templates)?,
            ConfigSection::Logging => toml::to_string_pretty(&s.logging)?,
        };
        Ok(text)
    }

    fn render(&self) -> ConfigResult<String> {
        let mut out = String::from(
            "# odsim configuration\n# Command-line flags override values in this file.\n",
        );
        for section in ConfigSection::ALL {
            out.push_str(&format!(
                "\n# {}\n[{}]\n",
                section.description(),
                section.table_name()
            ));
            out.push_str(&self.section_toml(section)?);
            if !out.ends_with('\n') {
                out.push('\n');
            }
        }
        Ok(out)
    }

    fn write_atomically(&self, text: &str) -> ConfigResult<()> {
        let io_err = |source| ConfigError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let staging = self.path.with_extension("toml.tmp");
        let mut file = fs::File::create(&staging).map_err(io_err)?;
        file.write_all(text.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);

        fs::rename(&staging, &self.path).map_err(io_err)
    }
}
