//! The stage contract and the control-flow outcome a stage returns.
//!
//! A stage is invoked once per hop with `Some(item)` (a payload) or `None`
//! (no payload: "pull next" for a source, "finalize" for folding and
//! buffering stages, plain absence for everything else). It answers with a
//! [`StageOutput`], which the orchestrator matches on exhaustively.
//!
//! ## Control flow
//!
//! | Output | Orchestrator reaction |
//! |--------|-----------------------|
//! | [`StageOutput::Value`] | Pass the payload to the next stage. |
//! | [`StageOutput::Skip`] | Discard the item and restart from the source. |
//! | [`StageOutput::Continue`] | Advance one stage without a payload. |
//! | [`StageOutput::EndOfStream`] | Advance one stage without a payload. |
//!
//! Control outcomes are enum variants rather than reserved payload values, so
//! a payload can never be mistaken for one (the string `"SKIP"` is just data).

use crate::{Item, StageError, StageName};

/// What a stage produced for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutput {
    /// A real payload for the next stage.
    Value(Item),
    /// The item was rejected; the orchestrator restarts from the source.
    Skip,
    /// The item was consumed for a side effect or accumulation; nothing is
    /// passed to the next stage.
    Continue,
    /// No data: the source is exhausted, or absence passed straight through.
    EndOfStream,
}

impl StageOutput {
    /// Wraps an optional item: `Some` becomes [`StageOutput::Value`] and
    /// `None` becomes [`StageOutput::EndOfStream`].
    pub fn from_option(item: Option<Item>) -> Self {
        match item {
            Some(item) => Self::Value(item),
            None => Self::EndOfStream,
        }
    }

    /// Returns the payload, if this output carries one.
    pub fn into_value(self) -> Option<Item> {
        match self {
            Self::Value(item) => Some(item),
            Self::Skip | Self::Continue | Self::EndOfStream => None,
        }
    }

    /// Returns `true` for [`StageOutput::Value`].
    pub fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Short label used in diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Value(_) => "value",
            Self::Skip => "skip",
            Self::Continue => "continue",
            Self::EndOfStream => "end_of_stream",
        }
    }
}

/// A unit of work in a pipeline.
///
/// Stages are created once and reused for every item of a run. Private state
/// (accumulators, buffers) persists between invocations and is reset by the
/// stage itself when it sees end-of-stream, so the same pipeline can run again.
///
/// `process` has no default body: a stage type that does not provide one is
/// rejected by the compiler.
pub trait Stage {
    /// Identifier used in diagnostics. Has no effect on execution.
    fn name(&self) -> &StageName;

    /// Processes one item (`Some`) or an absence of payload (`None`).
    ///
    /// # Errors
    ///
    /// Returns a [`StageError`] when the stage's own logic or one of its
    /// callbacks fails. The orchestrator aborts the run on the first error.
    fn process(&mut self, input: Option<Item>) -> Result<StageOutput, StageError>;

    /// Returns `true` if this stage swallows payloads (answers
    /// [`StageOutput::Continue`]) and only emits a value when finalized.
    ///
    /// Used for configuration warnings only.
    fn consumes_items(&self) -> bool {
        false
    }
}

/// A stage that produces items on demand and ignores its input.
///
/// A pipeline holds at most one source, always at the head of the chain. Only
/// a pipeline with a source streams multiple items per run.
pub trait SourceStage: Stage {
    /// Returns the next item, or `None` once exhausted.
    ///
    /// Keeps returning `None` after exhaustion until [`SourceStage::reset`].
    fn pull(&mut self) -> Option<Item>;

    /// Rewinds the source so the next pull yields its first item again.
    fn reset(&mut self);
}

impl<S: Stage + ?Sized> Stage for Box<S> {
    fn name(&self) -> &StageName {
        (**self).name()
    }

    fn process(&mut self, input: Option<Item>) -> Result<StageOutput, StageError> {
        (**self).process(input)
    }

    fn consumes_items(&self) -> bool {
        (**self).consumes_items()
    }
}
