//! Engine configuration (`~/.config/infragraph/config.toml`)
//!
//! ```toml
//! [transaction]
//! jobs = 8
//! yield_levels = true
//!
//! [state]
//! directory = "~/infra/state"
//!
//! [log]
//! level = "info"
//! ```

use anyhow::{Context, Result};
use declarative::TransactionOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("infragraph"))
}

/// Get the default state directory (~/.local/state/infragraph)
pub fn default_state_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".local").join("state").join("infragraph"))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub transaction: TransactionOptions,
    pub state: StateConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Where state snapshots live; `~` is expanded
    pub directory: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// One of error, warn, info, debug, trace
    pub level: Option<String>,
}

impl EngineConfig {
    /// Path of the default config file
    pub fn default_path() -> Result<PathBuf> {
        Ok(config_dir()?.join("config.toml"))
    }

    /// Load from `path`, or from the default location
    ///
    /// A missing default file yields the default config; a missing explicit
    /// file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = Self::default_path()?;
                if !default.exists() {
                    log::debug!("No config at {}, using defaults", default.display());
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        anyhow::ensure!(config.transaction.jobs > 0, "transaction.jobs must be at least 1");
        config.log_level()?;
        Ok(config)
    }

    /// Expanded state directory
    pub fn state_dir(&self) -> Result<PathBuf> {
        match &self.state.directory {
            Some(dir) => Ok(PathBuf::from(shellexpand::tilde(dir).as_ref())),
            None => default_state_dir(),
        }
    }

    pub fn log_level(&self) -> Result<Option<log::LevelFilter>> {
        self.log
            .level
            .as_deref()
            .map(|level| {
                log::LevelFilter::from_str(level)
                    .with_context(|| format!("Unknown log level: {level}"))
            })
            .transpose()
    }
}
