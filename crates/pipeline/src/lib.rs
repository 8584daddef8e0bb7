//! Core orchestration domain for Sluice.
//!
//! This crate contains every domain concept shared across the workspace: the
//! newtype identifiers, the stage contract, the control-flow outcome a stage
//! returns, the error types, the configuration, and the [`Pipeline`]
//! orchestrator itself. Concrete stages live in the `stages` crate and only
//! implement the traits defined here.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** Apart from reading a configuration
//! file this crate performs no I/O; sources and sinks are supplied by callers.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`PipelineName`, `StageName`, `PipelineRunId`) |
//! | [`types`] | Shared value types (`Item`, `InvocationCount`, `Timestamp`, `RunStats`) |
//! | [`stage`] | The `Stage` / `SourceStage` contract and `StageOutput` |
//! | [`errors`] | Stage, pipeline, and configuration errors |
//! | [`config`] | `PipelineConfig` loading and validation |
//! | [`executor`] | The `Pipeline` orchestrator |

pub mod config;
pub mod errors;
pub mod executor;
pub mod identifiers;
pub mod stage;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::PipelineConfig;
pub use errors::{ConfigError, PipelineError, StageError};
pub use executor::{ChainWarning, Pipeline};
pub use identifiers::{PipelineName, PipelineRunId, StageName};
pub use stage::{SourceStage, Stage, StageOutput};
pub use types::{InvocationCount, Item, RunOutcome, RunStats, Timestamp};
