//! Shared value types for the pipeline domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values that participate in execution bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::PipelineRunId;

/// A single data item flowing between stages.
///
/// Items are dynamically shaped: a sink finalizes into a list and an aggregate
/// may produce a value of a different shape than the items it folded.
pub type Item = serde_json::Value;

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// Number of times something happened during a run (stage invocations,
/// source pulls, skips).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InvocationCount(u64);

impl InvocationCount {
    /// Creates an [`InvocationCount`] from a raw integer.
    pub fn new(count: u64) -> Self {
        Self(count)
    }

    /// Returns the underlying integer value.
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns `true` if this count is zero.
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Increments the count by one.
    pub fn increment(&mut self) {
        self.0 += 1;
    }
}

impl std::fmt::Display for InvocationCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Add for InvocationCount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ---------------------------------------------------------------------------
// Run bookkeeping
// ---------------------------------------------------------------------------

/// How a pipeline run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The chain ran to completion and produced a result (possibly empty).
    Completed,
    /// A stage failed; the run was aborted.
    Failed,
    /// The configured invocation budget ran out before the chain completed.
    BudgetExceeded,
}

/// Statistics recorded for one call to `Pipeline::execute`.
///
/// The pipeline keeps the statistics of its most recent run, whether that run
/// succeeded or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Identifier of the run; matches the `run_id` field on its tracing span.
    pub run_id: PipelineRunId,

    /// When the run started.
    pub started_at: Timestamp,

    /// When the run ended.
    pub finished_at: Timestamp,

    /// Total number of `process` calls across all stages, source included,
    /// plus the `pull` calls made when the chain wraps around to the source.
    pub invocations: InvocationCount,

    /// Items the source produced (end-of-stream answers are not counted).
    pub items_pulled: InvocationCount,

    /// Number of times a stage rejected an item and the chain restarted.
    pub skips: InvocationCount,

    /// Number of times a stage consumed an item without passing it on.
    pub continues: InvocationCount,

    /// How the run ended.
    pub outcome: RunOutcome,
}

impl RunStats {
    /// Wall-clock duration of the run.
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at.as_datetime() - self.started_at.as_datetime()
    }
}
