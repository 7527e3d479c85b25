use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::default_tag_categories;
use crate::error::MetagrateError;

pub const DEFAULT_CONFIG_FILE: &str = "metagrate.json";
pub const DEFAULT_OUTPUT: &str = "metadata_migrated.csv";
pub const SCHEMA_VERSION: u32 = 1;

/// On-disk `metagrate.json`; every field is optional.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub rename_sites: Option<bool>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub tag_categories: Option<Vec<String>>,
    #[serde(default)]
    pub allow_unmatched_template: Option<bool>,
}

/// Settings handed to the migrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrateConfig {
    pub rename_sites: bool,
    pub output_path: Option<Utf8PathBuf>,
    pub tag_categories: Vec<String>,
    pub allow_unmatched_template: bool,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            rename_sites: true,
            output_path: None,
            tag_categories: default_tag_categories(),
            allow_unmatched_template: false,
        }
    }
}

impl MigrateConfig {
    pub fn output_path_or_default(&self) -> Utf8PathBuf {
        self.output_path
            .clone()
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_OUTPUT))
    }

    pub fn apply(mut self, overrides: ConfigOverrides) -> Self {
        if overrides.no_rename_sites {
            self.rename_sites = false;
        }
        if let Some(output) = overrides.output {
            self.output_path = Some(output);
        }
        if !overrides.tag_categories.is_empty() {
            self.tag_categories = overrides.tag_categories;
        }
        if overrides.allow_unmatched_template {
            self.allow_unmatched_template = true;
        }
        self
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output: Option<Utf8PathBuf>,
    pub no_rename_sites: bool,
    pub tag_categories: Vec<String>,
    pub allow_unmatched_template: bool,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// An explicit `path` must be readable; the default file is optional.
    pub fn resolve(path: Option<&str>) -> Result<MigrateConfig, MetagrateError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(MigrateConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| MetagrateError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| MetagrateError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<MigrateConfig, MetagrateError> {
        let schema_version = config.schema_version.unwrap_or(SCHEMA_VERSION);
        if schema_version != SCHEMA_VERSION {
            return Err(MetagrateError::UnsupportedSchemaVersion {
                found: schema_version,
                expected: SCHEMA_VERSION,
            });
        }

        let defaults = MigrateConfig::default();
        Ok(MigrateConfig {
            rename_sites: config.rename_sites.unwrap_or(defaults.rename_sites),
            output_path: config.output.map(Utf8PathBuf::from),
            tag_categories: config
                .tag_categories
                .filter(|categories| !categories.is_empty())
                .unwrap_or(defaults.tag_categories),
            allow_unmatched_template: config
                .allow_unmatched_template
                .unwrap_or(defaults.allow_unmatched_template),
        })
    }
}
