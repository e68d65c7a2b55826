//! Core configuration.
//!
//! # Responsibility
//! - Hold tunables for taxonomy deletion, analytics and logging.
//! - Load them from JSON text or a JSON file with defaults for missing keys.
//!
//! # Invariants
//! - `analytics.top_n` is at least 1.
//! - `logging.level` is one of `trace|debug|info|warn|error`.

use crate::analytics::cooccurrence::ProximityCounting;
use crate::logging::{default_log_level, parse_level};
use crate::service::taxonomy_service::CodeDeletePolicy;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Default number of codes/documents shown in analytics views.
pub const DEFAULT_TOP_N: usize = 10;
/// Default proximity window (chars) for segment-mode co-occurrence.
pub const DEFAULT_PROXIMITY_WINDOW: usize = 100;

/// Taxonomy tunables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaxonomyConfig {
    pub delete_policy: CodeDeletePolicy,
}

/// Analytics tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsConfig {
    pub top_n: usize,
    pub proximity_window: usize,
    pub proximity_counting: ProximityCounting,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            proximity_window: DEFAULT_PROXIMITY_WINDOW,
            proximity_counting: ProximityCounting::default(),
        }
    }
}

/// Logging tunables consumed by `init_logging_from_config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    pub level: String,
    /// Absolute log directory. `None` leaves logging uninitialized.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: None,
        }
    }
}

/// Root configuration object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoreConfig {
    pub taxonomy: TaxonomyConfig,
    pub analytics: AnalyticsConfig,
    pub logging: LoggingConfig,
}

/// Errors from loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl CoreConfig {
    /// Parses and validates JSON config text. Missing keys take defaults.
    pub fn from_json_str(value: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(value).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analytics.top_n == 0 {
            return Err(ConfigError::Invalid(
                "analytics.topN must be at least 1".to_string(),
            ));
        }
        parse_level(&self.logging.level)
            .map(|_| ())
            .map_err(|err| ConfigError::Invalid(format!("logging.level: {err}")))
    }
}
