//! Operator configuration.
//!
//! The rc file is TOML:
//!
//! ```toml
//! [main]
//! openai_token = "..."
//!
//! [buckets]
//! fishes = 3
//! meta = 1
//!
//! [selection]
//! content_length_cap = 300
//! internal_fetch_ratio = 0.1
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::selection::{DEFAULT_CONTENT_LENGTH_CAP, DEFAULT_FETCH_RATIO};
use crate::store::EpigramStore;
use crate::types::error::EpigramError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid configuration file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to render configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error(transparent)]
    Store(#[from] EpigramError),
}

/// Tunables for the selection engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Items must be strictly shorter than this many characters to be shown.
    #[serde(default = "default_length_cap")]
    pub content_length_cap: usize,
    /// Share of the candidate list the jitter may skip over.
    #[serde(default = "default_fetch_ratio")]
    pub internal_fetch_ratio: f64,
}

fn default_length_cap() -> usize {
    DEFAULT_CONTENT_LENGTH_CAP
}

fn default_fetch_ratio() -> f64 {
    DEFAULT_FETCH_RATIO
}

impl SelectionConfig {
    pub fn v0() -> Self {
        Self {
            content_length_cap: DEFAULT_CONTENT_LENGTH_CAP,
            internal_fetch_ratio: DEFAULT_FETCH_RATIO,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.content_length_cap == 0 {
            return Err(ConfigError::Invalid("content_length_cap must be positive".into()));
        }
        if !(self.internal_fetch_ratio > 0.0 && self.internal_fetch_ratio <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "internal_fetch_ratio must be in (0, 1], got {}",
                self.internal_fetch_ratio
            )));
        }
        Ok(())
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self::v0()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MainSection {
    /// Credential for the external annotation service. Opaque to the core.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_token: Option<String>,
}

/// The operator rc file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RcFile {
    #[serde(default)]
    pub main: MainSection,
    /// Category name to weight.
    #[serde(default)]
    pub buckets: BTreeMap<String, i64>,
    #[serde(default)]
    pub selection: SelectionConfig,
}

/// Outcome of pushing rc-file weights into a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedWeights {
    pub updated: Vec<String>,
    pub skipped: Vec<(String, String)>,
}

impl RcFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let rc: RcFile = toml::from_str(text)?;
        rc.selection.validate()?;
        Ok(rc)
    }

    /// Update each listed category's weight.
    ///
    /// Entries that cannot be applied (unknown category, non-positive weight)
    /// are logged and reported back; the rest still go through.
    pub fn apply_weights(&self, store: &EpigramStore) -> AppliedWeights {
        let mut applied = AppliedWeights::default();
        for (name, &weight) in &self.buckets {
            match store.update_category_weight(name, weight) {
                Ok(()) => {
                    tracing::debug!(bucket = %name, weight, "applied configured weight");
                    applied.updated.push(name.clone());
                }
                Err(e) => {
                    tracing::warn!(bucket = %name, weight, error = %e, "unable to apply configured weight");
                    applied.skipped.push((name.clone(), e.to_string()));
                }
            }
        }
        applied
    }

    /// An rc file reflecting the store's current categories and weights.
    pub fn from_store(store: &EpigramStore, openai_token: Option<String>) -> Result<Self, ConfigError> {
        let buckets = store
            .list_categories()?
            .into_iter()
            .map(|c| (c.name, i64::from(c.weight)))
            .collect();
        Ok(Self {
            main: MainSection { openai_token },
            buckets,
            selection: SelectionConfig::v0(),
        })
    }

    pub fn render(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
