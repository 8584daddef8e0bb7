//! Error types for the pipeline domain.
//!
//! [`StageError`] is what a stage (or a callback supplied to one) raises.
//! [`PipelineError`] is what `Pipeline::execute` surfaces: the first stage
//! failure aborts the run, wrapped with the pipeline and stage names for
//! diagnostics. There is no retry and no partial-result salvage.
//!
//! [`ConfigError`] covers loading and validating a [`crate::PipelineConfig`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{PipelineName, StageName};

// ---------------------------------------------------------------------------
// Stage-level errors
// ---------------------------------------------------------------------------

/// Errors raised inside a stage while processing one item.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum StageError {
    /// A predicate, mapper, folder, or consumer reported a failure.
    #[error("Stage callback failed: {message}")]
    Callback {
        /// Human-readable description supplied by the callback.
        message: String,
    },

    /// The stage received an item whose shape it cannot handle
    /// (e.g. a numeric fold fed a string).
    #[error("Invalid item: expected {expected}, found {found}")]
    InvalidItem {
        /// Description of the shape the stage accepts.
        expected: String,
        /// Serialized form of the offending item.
        found: String,
    },
}

impl StageError {
    /// Convenience constructor for [`StageError::Callback`].
    pub fn callback(message: impl Into<String>) -> Self {
        Self::Callback {
            message: message.into(),
        }
    }

    /// Convenience constructor for [`StageError::InvalidItem`].
    pub fn invalid_item(expected: impl Into<String>, found: &serde_json::Value) -> Self {
        Self::InvalidItem {
            expected: expected.into(),
            found: found.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline-level errors
// ---------------------------------------------------------------------------

/// Errors that abort a pipeline run.
///
/// Every variant is fatal for the run that produced it. The pipeline object
/// itself remains usable: reset the source and call `execute` again.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum PipelineError {
    /// A stage failed while processing an item.
    #[error("Stage '{stage}' in pipeline '{pipeline}' failed: {source}")]
    StageFailed {
        /// Pipeline the stage belongs to.
        pipeline: PipelineName,
        /// Stage that raised the error.
        stage: StageName,
        /// The underlying stage error.
        source: StageError,
    },

    /// The run performed more stage invocations than the configured budget.
    #[error("Pipeline '{pipeline}' exceeded its budget of {limit} stage invocations")]
    InvocationBudgetExceeded {
        /// Pipeline that ran out of budget.
        pipeline: PipelineName,
        /// Configured maximum number of invocations per run.
        limit: u64,
    },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors produced while loading or validating a pipeline configuration.
///
/// Produced at load time; a pipeline is never built from an invalid config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read configuration from '{path}': {source}")]
    Io {
        /// Path that was being read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration text is not valid JSON for [`crate::PipelineConfig`].
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configuration parsed but violates a constraint.
    #[error("Invalid configuration: {message}")]
    Invalid {
        /// Description of the violated constraint.
        message: String,
    },
}
