//! Engine configuration.
//!
//! Configuration is read from `sift.yaml` (or a path given on the command
//! line) and includes:
//! - The debounce quiescence window
//! - Default page size and sort order
//! - Extra structural flags the query may carry
//! - Column aliases used for text search keys
//! - The prefix for exported file names

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SiftError};
use crate::query::{PageSize, QueryState, SHOW_ALL, Sort};

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE: &str = "sift.yaml";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Debounce quiescence window in milliseconds (default: 800)
    #[serde(default = "default_quiescence_window_ms")]
    pub quiescence_window_ms: u64,

    /// Page size used when a view mounts (default: 20)
    #[serde(default)]
    pub default_page_size: PageSize,

    /// Sort applied when a view mounts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_sort: Option<Sort>,

    /// Extra structural flags and their initial values
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub flags: BTreeMap<String, bool>,

    /// Column key -> server-side search key
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub search_aliases: BTreeMap<String, String>,

    /// Prefix for exported file names (default: "export")
    #[serde(default = "default_export_prefix")]
    pub export_prefix: String,
}

fn default_quiescence_window_ms() -> u64 {
    800
}

fn default_export_prefix() -> String {
    "export".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            quiescence_window_ms: default_quiescence_window_ms(),
            default_page_size: PageSize::default(),
            default_sort: None,
            flags: BTreeMap::new(),
            search_aliases: BTreeMap::new(),
            export_prefix: default_export_prefix(),
        }
    }
}

impl EngineConfig {
    /// Get the path to the config file in the working directory
    pub fn config_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE)
    }

    /// Load configuration from `path`, or from `sift.yaml` if it exists,
    /// or return the default.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = Self::config_path();
                if !default.exists() {
                    return Ok(EngineConfig::default());
                }
                default
            }
        };

        let content = fs::read_to_string(&path).map_err(|e| {
            SiftError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config at {}: {}", path.display(), e),
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = serde_yaml_ng::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.quiescence_window_ms == 0 {
            return Err(SiftError::Config(
                "quiescence_window_ms must be greater than zero".to_string(),
            ));
        }
        if self.export_prefix.trim().is_empty() {
            return Err(SiftError::Config("export_prefix cannot be empty".to_string()));
        }
        if self.flags.contains_key(SHOW_ALL) {
            return Err(SiftError::Config(format!(
                "'{SHOW_ALL}' is built in and cannot be declared under flags"
            )));
        }
        Ok(())
    }

    pub fn quiescence_window(&self) -> Duration {
        Duration::from_millis(self.quiescence_window_ms)
    }

    /// The query a freshly mounted view starts from.
    pub fn initial_query(&self) -> QueryState {
        self.flags.iter().fold(
            QueryState::new(self.default_page_size).with_sort(self.default_sort.clone()),
            |state, (key, value)| state.with_flag(key.clone(), *value),
        )
    }
}
