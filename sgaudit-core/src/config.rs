//! Audit configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audit::{Check, Severity};

/// Errors that can occur when loading an audit configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Audit options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AuditConfig {
    /// Checks to run (default: all)
    pub checks: Vec<Check>,

    /// Group ids that are never reported
    pub ignored_groups: Vec<String>,

    /// Lowest severity that fails a strict run (default: high)
    pub fail_on: Severity,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            checks: Check::ALL.to_vec(),
            ignored_groups: Vec::new(),
            fail_on: Severity::High,
        }
    }
}

impl AuditConfig {
    /// Load a JSON configuration file; missing keys take their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded audit config from {}", path.display());
        Ok(config)
    }

    pub fn is_enabled(&self, check: Check) -> bool {
        self.checks.contains(&check)
    }

    pub fn is_ignored(&self, group_id: &str) -> bool {
        self.ignored_groups.iter().any(|id| id == group_id)
    }
}
