use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read verifier config {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid verifier config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// What to do once a rule fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Stop at the first failure.
    #[default]
    FirstFailure,
    /// Keep walking and record every failure until a fatal one.
    CollectAll,
}

/// Verifier settings, usually read from a `Verifier.toml`:
/// ```toml
/// mode = "collect_all"
/// max_failures = 20
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifierConfig {
    pub mode: FailureMode,
    /// Upper bound on recorded failures, 0 means no bound.
    pub max_failures: usize,
}

impl VerifierConfig {
    pub fn collect_all() -> Self {
        Self {
            mode: FailureMode::CollectAll,
            max_failures: 0,
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("loaded verifier config from {}", path.display());
        Self::from_toml_str(&source)
    }

    /// The effective failure limit, first-failure mode always keeps one.
    pub fn failure_limit(&self) -> usize {
        match self.mode {
            FailureMode::FirstFailure => 1,
            FailureMode::CollectAll => self.max_failures,
        }
    }
}
