//! Run settings
//!
//! All fields default, so a settings file only needs the keys it changes:
//!
//! ```toml
//! output_dir = "notes/research"
//!
//! [research]
//! max_depth = 2
//! delay_secs = 0.5
//!
//! [network]
//! proxies = []
//! timeout_secs = 15
//!
//! [network.retry]
//! max_retries = 4
//!
//! [processor]
//! max_queries = 3
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use burrow_agents::SubQueryRules;
use burrow_net::NetConfig;

use crate::ResearchConfig;

/// Errors loading settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid settings: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Orchestrator, network, sub-query and output settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub research: ResearchConfig,
    pub network: NetConfig,
    /// Sub-query selection limits for either processor
    pub processor: SubQueryRules,
    /// Prefix of the per-run output directory
    pub output_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            research: ResearchConfig::default(),
            network: NetConfig::default(),
            processor: SubQueryRules::default(),
            output_dir: PathBuf::from("research_results"),
        }
    }
}

impl Settings {
    pub fn from_toml_str(src: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(src)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Delays must be finite; negative values are treated as zero
    pub fn validate(&self) -> Result<(), SettingsError> {
        let delays = [
            ("research.delay_secs", self.research.delay_secs),
            ("research.delay_jitter_secs", self.research.delay_jitter_secs),
        ];

        for (field, value) in delays {
            if !value.is_finite() {
                return Err(SettingsError::OutOfRange { field, value });
            }
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&src)
    }
}
