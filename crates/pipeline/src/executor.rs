//! The pipeline orchestrator.
//!
//! A [`Pipeline`] owns an optional [`SourceStage`] at the head of the chain and
//! an ordered list of [`Stage`]s behind it. [`Pipeline::execute`] drives the
//! chain as a state machine over `(stage index, current input)`:
//!
//! - [`StageOutput::Value`] moves the payload one stage forward.
//! - [`StageOutput::Skip`] restarts at index 0 with no input, so the source
//!   yields its next item and the rejected one is fully discarded.
//! - [`StageOutput::Continue`] and [`StageOutput::EndOfStream`] move one stage
//!   forward with no payload.
//! - Reaching the end of the chain with a live source wraps around: the next
//!   item is pulled and fed to the first stage after the source. Once the
//!   source is exhausted, a final pass with no payload flushes end-of-stream
//!   through the chain so aggregates and sinks finalize exactly once.
//!
//! The run returns the last value the chain produced: the finalized result of
//! a terminal sink or aggregate, or the last item a pass-through chain emitted.
//!
//! Execution is synchronous and strictly sequential. The first stage error
//! aborts the run; nothing is retried.

use tracing::{debug, error, info, info_span, trace, warn};

use crate::{
    ConfigError, InvocationCount, Item, PipelineConfig, PipelineError, PipelineName,
    PipelineRunId, RunOutcome, RunStats, SourceStage, Stage, StageName, StageOutput, Timestamp,
};

/// Longest rendering of an item included in a diagnostic event.
const MAX_SUMMARY_CHARS: usize = 200;

// ---------------------------------------------------------------------------
// Configuration warnings
// ---------------------------------------------------------------------------

/// A chain shape that is legal but probably not what the author intended.
///
/// Warnings never change execution; they are logged at the start of every run
/// and can be inspected with [`Pipeline::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainWarning {
    /// The chain has stages but no source, so it makes a single pass over the
    /// initial input.
    MissingSource,

    /// A stage that swallows payloads is followed by more stages; those stages
    /// see no payload until the consumer is finalized.
    StagesAfterConsumer {
        /// The payload-swallowing stage.
        consumer: StageName,
        /// How many stages follow it.
        following: usize,
    },
}

impl std::fmt::Display for ChainWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingSource => {
                write!(f, "pipeline has no source stage; it will make a single pass")
            }
            Self::StagesAfterConsumer {
                consumer,
                following,
            } => write!(
                f,
                "stage '{consumer}' consumes items but is followed by {following} more stage(s)"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// An ordered chain of stages plus the driver loop that advances, restarts, or
/// wraps around it.
///
/// Built with chained calls:
///
/// ```ignore
/// let mut pipeline = Pipeline::new(PipelineName::new("numbers").unwrap())
///     .with_source(DataSource::new(name("numbers"), items))
///     .add_stage(FilterStage::new(name("even"), |x| x.as_i64().is_some_and(|n| n % 2 == 0)))
///     .add_stage(SinkStage::collect(name("collect")))
///     .set_debug(true);
/// let result = pipeline.execute(None)?;
/// ```
pub struct Pipeline {
    name: PipelineName,
    source: Option<Box<dyn SourceStage>>,
    stages: Vec<Box<dyn Stage>>,
    debug: bool,
    max_invocations: Option<u64>,
    last_run: Option<RunStats>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    pub fn new(name: PipelineName) -> Self {
        Self {
            name,
            source: None,
            stages: Vec::new(),
            debug: false,
            max_invocations: None,
            last_run: None,
        }
    }

    /// Creates an empty pipeline with the name, debug flag, and invocation
    /// budget from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the configuration fails validation.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut pipeline = Self::new(config.pipeline_name()?).set_debug(config.debug);
        pipeline.max_invocations = config.max_invocations;
        Ok(pipeline)
    }

    /// Places `source` at the head of the chain, replacing any earlier source.
    pub fn with_source(mut self, source: impl SourceStage + 'static) -> Self {
        if let Some(previous) = &self.source {
            debug!(
                pipeline = %self.name,
                previous = %previous.name(),
                replacement = %source.name(),
                "Replacing pipeline source"
            );
        }
        self.source = Some(Box::new(source));
        self
    }

    /// Appends `stage` to the chain. Insertion order is execution order.
    pub fn add_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Enables or disables per-stage diagnostic events.
    pub fn set_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Caps the number of stage invocations a single run may perform.
    pub fn with_max_invocations(mut self, limit: Option<u64>) -> Self {
        self.max_invocations = limit;
        self
    }

    /// The pipeline's name.
    pub fn name(&self) -> &PipelineName {
        &self.name
    }

    /// Whether per-stage diagnostic events are enabled.
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Whether the chain is headed by a source.
    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Number of stages in the chain, the source included.
    pub fn len(&self) -> usize {
        self.stages.len() + usize::from(self.source.is_some())
    }

    /// Returns `true` if the chain has neither a source nor any stages.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stage names in execution order, the source first.
    pub fn stage_names(&self) -> Vec<&StageName> {
        self.source
            .iter()
            .map(|source| source.name())
            .chain(self.stages.iter().map(|stage| stage.name()))
            .collect()
    }

    /// Statistics of the most recent run, if any.
    pub fn last_run(&self) -> Option<&RunStats> {
        self.last_run.as_ref()
    }

    /// Rewinds the source so the next run starts from its first item.
    pub fn reset_source(&mut self) {
        if let Some(source) = self.source.as_mut() {
            source.reset();
        }
    }

    /// Reports chain shapes that are legal but suspicious.
    pub fn validate(&self) -> Vec<ChainWarning> {
        let mut warnings = Vec::new();
        if self.source.is_none() && !self.stages.is_empty() {
            warnings.push(ChainWarning::MissingSource);
        }
        let last = self.stages.len().saturating_sub(1);
        for (position, stage) in self.stages.iter().enumerate() {
            if stage.consumes_items() && position < last {
                warnings.push(ChainWarning::StagesAfterConsumer {
                    consumer: stage.name().clone(),
                    following: last - position,
                });
            }
        }
        warnings
    }

    /// Runs the chain to completion.
    ///
    /// `initial` is handed to the first stage; a source ignores it. Returns
    /// the last non-control value produced: the terminal stage's finalized
    /// result for a streaming pipeline, the last item a pass-through chain
    /// emitted, or `None` if the chain is empty or never produced a value.
    ///
    /// A source that answers `Skip` or `Continue` is treated as exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::StageFailed`] for the first stage error and
    /// [`PipelineError::InvocationBudgetExceeded`] if the configured budget
    /// runs out. Stage state is left as it was at the point of failure.
    pub fn execute(&mut self, initial: Option<Item>) -> Result<Option<Item>, PipelineError> {
        let mut run = RunCounters::start();
        let span = info_span!("pipeline_run", pipeline = %self.name, run_id = %run.run_id);
        let _guard = span.enter();

        for warning in self.validate() {
            warn!(%warning, "Pipeline chain configuration warning");
        }

        let result = self.drive(initial, &mut run);
        let outcome = match &result {
            Ok(_) => RunOutcome::Completed,
            Err(PipelineError::StageFailed { .. }) => RunOutcome::Failed,
            Err(PipelineError::InvocationBudgetExceeded { .. }) => RunOutcome::BudgetExceeded,
        };
        let stats = run.finish(outcome);

        match &result {
            Ok(output) => debug!(
                invocations = %stats.invocations,
                items_pulled = %stats.items_pulled,
                skips = %stats.skips,
                continues = %stats.continues,
                output = %summarize(output.as_ref()),
                "Pipeline run completed"
            ),
            Err(err) => error!(error = %err, invocations = %stats.invocations, "Pipeline run aborted"),
        }

        self.last_run = Some(stats);
        result
    }

    // -----------------------------------------------------------------------
    // Driver loop
    // -----------------------------------------------------------------------

    fn drive(
        &mut self,
        initial: Option<Item>,
        run: &mut RunCounters,
    ) -> Result<Option<Item>, PipelineError> {
        let len = self.len();
        if len == 0 {
            return Ok(None);
        }

        let has_source = self.source.is_some();
        let mut input = initial;
        let mut last_value: Option<Item> = None;
        let mut index = 0;
        let mut drained = false;

        loop {
            if index < len {
                let mut output = self.invoke(index, input, run)?;
                let from_source = has_source && index == 0;
                if from_source {
                    match output {
                        StageOutput::Value(_) => run.items_pulled.increment(),
                        StageOutput::EndOfStream => drained = true,
                        StageOutput::Skip | StageOutput::Continue => {
                            // A source only produces or ends; anything else would
                            // restart it forever.
                            warn!(
                                outcome = output.label(),
                                "Source answered a control outcome; treating it as end-of-stream"
                            );
                            output = StageOutput::EndOfStream;
                            drained = true;
                        }
                    }
                }

                match output {
                    StageOutput::Skip => {
                        run.skips.increment();
                        index = 0;
                        input = None;
                    }
                    StageOutput::Continue => {
                        run.continues.increment();
                        index += 1;
                        input = None;
                    }
                    StageOutput::Value(item) => {
                        if !from_source || len == 1 {
                            last_value = Some(item.clone());
                        }
                        index += 1;
                        input = Some(item);
                    }
                    StageOutput::EndOfStream => {
                        index += 1;
                        input = None;
                    }
                }
                continue;
            }

            // End of chain: wrap around to the first stage after the source.
            if drained || !has_source {
                break;
            }
            match self.pull_source(run)? {
                Some(item) => {
                    run.items_pulled.increment();
                    if len == 1 {
                        last_value = Some(item.clone());
                    }
                    input = Some(item);
                }
                None => {
                    drained = true;
                    if len == 1 {
                        break;
                    }
                    input = None;
                }
            }
            index = 1;
        }

        // A finalizing stage leaves its result as the input; pass-through
        // chains end on absence, so fall back to the last value produced.
        Ok(input.or(last_value))
    }

    /// Charges one invocation against the run's budget.
    fn charge(&self, run: &mut RunCounters) -> Result<(), PipelineError> {
        if let Some(limit) = self.max_invocations {
            if run.invocations.as_u64() >= limit {
                return Err(PipelineError::InvocationBudgetExceeded {
                    pipeline: self.name.clone(),
                    limit,
                });
            }
        }
        run.invocations.increment();
        Ok(())
    }

    fn stage_at(&mut self, index: usize) -> &mut dyn Stage {
        let offset = usize::from(self.source.is_some());
        match self.source.as_mut() {
            Some(source) if index == 0 => source,
            _ => self.stages[index - offset].as_mut(),
        }
    }

    fn invoke(
        &mut self,
        index: usize,
        input: Option<Item>,
        run: &mut RunCounters,
    ) -> Result<StageOutput, PipelineError> {
        self.charge(run)?;
        let verbose = self.debug;
        let stage = self.stage_at(index);

        if verbose {
            info!(stage = %stage.name(), index, input = %summarize(input.as_ref()), "Stage input");
        } else {
            trace!(stage = %stage.name(), index, input = %summarize(input.as_ref()), "Stage input");
        }

        match stage.process(input) {
            Ok(output) => {
                if verbose {
                    info!(
                        stage = %stage.name(),
                        index,
                        outcome = output.label(),
                        output = %summarize_output(&output),
                        "Stage output"
                    );
                } else {
                    trace!(
                        stage = %stage.name(),
                        index,
                        outcome = output.label(),
                        output = %summarize_output(&output),
                        "Stage output"
                    );
                }
                Ok(output)
            }
            Err(source) => {
                let stage = stage.name().clone();
                error!(%stage, index, error = %source, "Stage failed");
                Err(PipelineError::StageFailed {
                    pipeline: self.name.clone(),
                    stage,
                    source,
                })
            }
        }
    }

    /// Pulls the next item during wraparound.
    fn pull_source(&mut self, run: &mut RunCounters) -> Result<Option<Item>, PipelineError> {
        self.charge(run)?;
        let verbose = self.debug;
        let Some(source) = self.source.as_mut() else {
            return Ok(None);
        };

        let item = source.pull();
        if verbose {
            info!(stage = %source.name(), index = 0, output = %summarize(item.as_ref()), "Source pulled");
        } else {
            trace!(stage = %source.name(), index = 0, output = %summarize(item.as_ref()), "Source pulled");
        }
        Ok(item)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("stages", &self.stage_names())
            .field("debug", &self.debug)
            .field("max_invocations", &self.max_invocations)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Run bookkeeping
// ---------------------------------------------------------------------------

struct RunCounters {
    run_id: PipelineRunId,
    started_at: Timestamp,
    invocations: InvocationCount,
    items_pulled: InvocationCount,
    skips: InvocationCount,
    continues: InvocationCount,
}

impl RunCounters {
    fn start() -> Self {
        Self {
            run_id: PipelineRunId::new_random(),
            started_at: Timestamp::now(),
            invocations: InvocationCount::default(),
            items_pulled: InvocationCount::default(),
            skips: InvocationCount::default(),
            continues: InvocationCount::default(),
        }
    }

    fn finish(self, outcome: RunOutcome) -> RunStats {
        RunStats {
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: Timestamp::now(),
            invocations: self.invocations,
            items_pulled: self.items_pulled,
            skips: self.skips,
            continues: self.continues,
            outcome,
        }
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

fn summarize(item: Option<&Item>) -> String {
    let Some(item) = item else {
        return "<none>".to_string();
    };
    let rendered = item.to_string();
    if rendered.chars().count() <= MAX_SUMMARY_CHARS {
        return rendered;
    }
    let mut truncated: String = rendered.chars().take(MAX_SUMMARY_CHARS).collect();
    truncated.push_str("...");
    truncated
}

fn summarize_output(output: &StageOutput) -> String {
    match output {
        StageOutput::Value(item) => summarize(Some(item)),
        other => format!("<{}>", other.label()),
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
