//! Pipeline configuration.
//!
//! A [`PipelineConfig`] is read from JSON, validated at load time, and used
//! to seed a [`crate::Pipeline`]. Stages themselves are code, not
//! configuration; the config carries the run-level knobs and, for
//! command-line use, the default items a source should emit.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Item, PipelineName};

/// Run-level settings for one pipeline.
///
/// ```json
/// {
///   "name": "numbers",
///   "debug": true,
///   "max_invocations": 10000,
///   "items": [1, 2, 3, 4, 5]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Pipeline name, used in every diagnostic event.
    pub name: String,

    /// Emit one event before and after every stage invocation.
    #[serde(default)]
    pub debug: bool,

    /// Upper bound on stage invocations per run. `None` means unbounded.
    #[serde(default)]
    pub max_invocations: Option<u64>,

    /// Items for a data source built from this configuration.
    #[serde(default)]
    pub items: Vec<Item>,
}

impl PipelineConfig {
    /// Creates a configuration with defaults for everything except the name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            debug: false,
            max_invocations: None,
            items: Vec::new(),
        }
    }

    /// Parses and validates a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON or unknown fields and
    /// [`ConfigError::Invalid`] when a constraint is violated.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`PipelineConfig::from_json_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Checks the configuration constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the name is empty or the invocation
    /// budget is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "pipeline name must not be empty".to_string(),
            });
        }
        if self.max_invocations == Some(0) {
            return Err(ConfigError::Invalid {
                message: "max_invocations must be greater than zero when set".to_string(),
            });
        }
        Ok(())
    }

    /// Returns the validated pipeline name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the name is empty.
    pub fn pipeline_name(&self) -> Result<PipelineName, ConfigError> {
        PipelineName::new(self.name.trim()).ok_or_else(|| ConfigError::Invalid {
            message: "pipeline name must not be empty".to_string(),
        })
    }
}
