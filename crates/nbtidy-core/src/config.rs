use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::align::MarkerTags;
use crate::errors::{io_error, serde_error, NbError};

/// YAML-configurable settings for a processing run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Additional tags marking engine-inserted cells (added to the defaults).
    #[serde(default)]
    pub marker_tags: Vec<String>,
    /// What to do when alignment fails and the engine itself succeeded.
    #[serde(default)]
    pub alignment: AlignmentPolicy,
    /// External execution engine invocation.
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Config {
    /// Loads a configuration file.
    pub fn load(path: &Path) -> Result<Self, NbError> {
        let contents = fs::read_to_string(path).map_err(|err| io_error("nbtidy.config_read", err))?;
        Self::from_yaml_str(&contents)
    }

    /// Parses a configuration from YAML text.
    pub fn from_yaml_str(contents: &str) -> Result<Self, NbError> {
        serde_yaml::from_str(contents).map_err(|err| serde_error("nbtidy.config_parse", err))
    }

    /// Default marker tags plus the configured extras.
    pub fn marker_set(&self) -> MarkerTags {
        MarkerTags::default().extend(self.marker_tags.iter().cloned())
    }
}

/// Behaviour when cells cannot be aligned and no execution failure is pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlignmentPolicy {
    /// Return the best-effort document together with the alignment error.
    #[default]
    Defer,
    /// Return the alignment error alone; no document is produced.
    Abort,
}

/// Program used to execute notebooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Executable name or path.
    #[serde(default = "default_program")]
    pub program: String,
    /// Extra arguments placed before the input and output paths.
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_program() -> String {
    "papermill".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
        }
    }
}
