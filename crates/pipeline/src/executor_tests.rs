use super::*;
use crate::StageError;
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Minimal stages for driving the state machine
// ---------------------------------------------------------------------------

fn stage_name(name: &str) -> StageName {
    StageName::new(name).unwrap()
}

fn pipeline_name(name: &str) -> PipelineName {
    PipelineName::new(name).unwrap()
}

struct ListSource {
    name: StageName,
    items: Vec<Item>,
    cursor: usize,
}

impl ListSource {
    fn new(items: Vec<Item>) -> Self {
        Self {
            name: stage_name("list"),
            items,
            cursor: 0,
        }
    }
}

impl Stage for ListSource {
    fn name(&self) -> &StageName {
        &self.name
    }

    fn process(&mut self, _input: Option<Item>) -> Result<StageOutput, StageError> {
        Ok(StageOutput::from_option(self.pull()))
    }
}

impl SourceStage for ListSource {
    fn pull(&mut self) -> Option<Item> {
        let item = self.items.get(self.cursor).cloned()?;
        self.cursor += 1;
        Some(item)
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }
}

/// Rejects odd integers.
struct EvenOnly(StageName);

impl Stage for EvenOnly {
    fn name(&self) -> &StageName {
        &self.0
    }

    fn process(&mut self, input: Option<Item>) -> Result<StageOutput, StageError> {
        Ok(match input {
            None => StageOutput::EndOfStream,
            Some(item) if item.as_i64().is_some_and(|n| n % 2 == 0) => StageOutput::Value(item),
            Some(_) => StageOutput::Skip,
        })
    }
}

/// Multiplies integers by ten; fails on anything else.
struct TimesTen(StageName);

impl Stage for TimesTen {
    fn name(&self) -> &StageName {
        &self.0
    }

    fn process(&mut self, input: Option<Item>) -> Result<StageOutput, StageError> {
        match input {
            None => Ok(StageOutput::EndOfStream),
            Some(item) => {
                let n = item
                    .as_i64()
                    .ok_or_else(|| StageError::invalid_item("an integer", &item))?;
                Ok(StageOutput::Value(json!(n * 10)))
            }
        }
    }
}

/// Buffers items and emits them as a list on end-of-stream.
struct Collect {
    name: StageName,
    buffer: Vec<Item>,
}

impl Collect {
    fn new() -> Self {
        Self {
            name: stage_name("collect"),
            buffer: Vec::new(),
        }
    }
}

impl Stage for Collect {
    fn name(&self) -> &StageName {
        &self.name
    }

    fn process(&mut self, input: Option<Item>) -> Result<StageOutput, StageError> {
        match input {
            Some(item) => {
                self.buffer.push(item);
                Ok(StageOutput::Continue)
            }
            None => Ok(StageOutput::Value(Value::Array(std::mem::take(&mut self.buffer)))),
        }
    }

    fn consumes_items(&self) -> bool {
        true
    }
}

fn numbers(items: &[i64]) -> Vec<Item> {
    items.iter().map(|n| json!(n)).collect()
}

fn even_tens(items: &[i64]) -> Pipeline {
    Pipeline::new(pipeline_name("even-tens"))
        .with_source(ListSource::new(numbers(items)))
        .add_stage(EvenOnly(stage_name("even")))
        .add_stage(TimesTen(stage_name("times-ten")))
        .add_stage(Collect::new())
}

// ---------------------------------------------------------------------------
// Driver behaviour
// ---------------------------------------------------------------------------

#[test]
fn empty_pipeline_returns_none() {
    let mut pipeline = Pipeline::new(pipeline_name("empty"));
    assert!(pipeline.is_empty());
    assert_eq!(pipeline.execute(Some(json!(1))).unwrap(), None);
}

#[test]
fn streams_filters_maps_and_collects() {
    let mut pipeline = even_tens(&[1, 2, 3, 4, 5]);
    assert_eq!(pipeline.execute(None).unwrap(), Some(json!([20, 40])));
}

#[test]
fn finalizes_when_last_item_passes_the_filter() {
    let mut pipeline = even_tens(&[1, 2, 3, 4]);
    assert_eq!(pipeline.execute(None).unwrap(), Some(json!([20, 40])));
}

#[test]
fn all_items_rejected_yields_empty_list() {
    let mut pipeline = even_tens(&[1, 3, 5]);
    assert_eq!(pipeline.execute(None).unwrap(), Some(json!([])));
}

#[test]
fn empty_source_yields_empty_list() {
    let mut pipeline = Pipeline::new(pipeline_name("nothing"))
        .with_source(ListSource::new(Vec::new()))
        .add_stage(Collect::new());
    assert_eq!(pipeline.execute(None).unwrap(), Some(json!([])));
}

#[test]
fn rerun_after_reset_is_identical() {
    let mut pipeline = even_tens(&[1, 2, 3, 4, 5, 6]);
    let first = pipeline.execute(None).unwrap();
    pipeline.reset_source();
    let second = pipeline.execute(None).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, Some(json!([20, 40, 60])));
}

#[test]
fn rerun_without_reset_sees_exhausted_source() {
    let mut pipeline = even_tens(&[2]);
    assert_eq!(pipeline.execute(None).unwrap(), Some(json!([20])));
    assert_eq!(pipeline.execute(None).unwrap(), Some(json!([])));
}

#[test]
fn lone_source_returns_its_last_item() {
    let mut pipeline =
        Pipeline::new(pipeline_name("lone")).with_source(ListSource::new(numbers(&[7, 8, 9])));
    assert_eq!(pipeline.execute(None).unwrap(), Some(json!(9)));
    assert_eq!(pipeline.last_run().unwrap().items_pulled.as_u64(), 3);
}

#[test]
fn pass_through_chain_returns_last_value() {
    let mut pipeline = Pipeline::new(pipeline_name("mapped"))
        .with_source(ListSource::new(numbers(&[1, 2, 3])))
        .add_stage(TimesTen(stage_name("times-ten")));
    assert_eq!(pipeline.execute(None).unwrap(), Some(json!(30)));
}

#[test]
fn pass_through_filter_returns_last_accepted_item() {
    let mut pipeline = Pipeline::new(pipeline_name("filtered"))
        .with_source(ListSource::new(numbers(&[2, 3, 4, 5])))
        .add_stage(EvenOnly(stage_name("even")));
    assert_eq!(pipeline.execute(None).unwrap(), Some(json!(4)));
}

#[test]
fn source_answering_skip_is_treated_as_exhausted() {
    struct Stubborn(StageName);
    impl Stage for Stubborn {
        fn name(&self) -> &StageName {
            &self.0
        }
        fn process(&mut self, _input: Option<Item>) -> Result<StageOutput, StageError> {
            Ok(StageOutput::Skip)
        }
    }
    impl SourceStage for Stubborn {
        fn pull(&mut self) -> Option<Item> {
            Some(json!(1))
        }
        fn reset(&mut self) {}
    }

    let mut pipeline = Pipeline::new(pipeline_name("stubborn"))
        .with_source(Stubborn(stage_name("stubborn")))
        .add_stage(Collect::new());
    assert_eq!(pipeline.execute(None).unwrap(), Some(json!([])));

    let stats = pipeline.last_run().unwrap();
    assert_eq!(stats.invocations.as_u64(), 2);
    assert!(stats.skips.is_zero());
}

#[test]
fn sourceless_pipeline_makes_a_single_pass() {
    let mut pipeline =
        Pipeline::new(pipeline_name("single")).add_stage(TimesTen(stage_name("times-ten")));
    assert_eq!(pipeline.execute(Some(json!(4))).unwrap(), Some(json!(40)));
}

#[test]
fn sourceless_skip_restarts_with_no_input() {
    let mut pipeline = Pipeline::new(pipeline_name("single"))
        .add_stage(EvenOnly(stage_name("even")))
        .add_stage(TimesTen(stage_name("times-ten")));
    assert_eq!(pipeline.execute(Some(json!(3))).unwrap(), None);
}

#[test]
fn sentinel_lookalike_payload_is_data() {
    struct Echo(StageName);
    impl Stage for Echo {
        fn name(&self) -> &StageName {
            &self.0
        }
        fn process(&mut self, input: Option<Item>) -> Result<StageOutput, StageError> {
            Ok(StageOutput::from_option(input))
        }
    }

    let mut pipeline = Pipeline::new(pipeline_name("strings"))
        .with_source(ListSource::new(vec![json!("SKIP"), json!("CONTINUE")]))
        .add_stage(Echo(stage_name("echo")))
        .add_stage(Collect::new());
    assert_eq!(
        pipeline.execute(None).unwrap(),
        Some(json!(["SKIP", "CONTINUE"]))
    );
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn stage_error_aborts_with_stage_name() {
    let mut pipeline = Pipeline::new(pipeline_name("mixed"))
        .with_source(ListSource::new(vec![json!(1), json!("x"), json!(3)]))
        .add_stage(TimesTen(stage_name("times-ten")))
        .add_stage(Collect::new());

    let err = pipeline.execute(None).unwrap_err();
    match err {
        PipelineError::StageFailed {
            pipeline,
            stage,
            source,
        } => {
            assert_eq!(pipeline.as_str(), "mixed");
            assert_eq!(stage.as_str(), "times-ten");
            assert!(matches!(source, StageError::InvalidItem { .. }));
        }
        other => panic!("expected StageFailed, got {other:?}"),
    }
    assert_eq!(pipeline.last_run().unwrap().outcome, RunOutcome::Failed);
}

#[test]
fn invocation_budget_aborts_run() {
    let mut pipeline = even_tens(&[1, 2, 3, 4, 5]).with_max_invocations(Some(3));

    let err = pipeline.execute(None).unwrap_err();
    assert_eq!(
        err,
        PipelineError::InvocationBudgetExceeded {
            pipeline: pipeline_name("even-tens"),
            limit: 3,
        }
    );
    let stats = pipeline.last_run().unwrap();
    assert_eq!(stats.outcome, RunOutcome::BudgetExceeded);
    assert_eq!(stats.invocations.as_u64(), 3);
}

// ---------------------------------------------------------------------------
// Bookkeeping and configuration
// ---------------------------------------------------------------------------

#[test]
fn run_stats_count_pulls_skips_and_continues() {
    let mut pipeline = even_tens(&[1, 2, 3, 4, 5]);
    pipeline.execute(None).unwrap();

    let stats = pipeline.last_run().unwrap();
    assert_eq!(stats.outcome, RunOutcome::Completed);
    assert_eq!(stats.items_pulled.as_u64(), 5);
    assert_eq!(stats.skips.as_u64(), 3);
    assert_eq!(stats.continues.as_u64(), 2);
    assert!(stats.finished_at >= stats.started_at);
}

#[test]
fn each_run_gets_a_fresh_id() {
    let mut pipeline = even_tens(&[2]);
    pipeline.execute(None).unwrap();
    let first = pipeline.last_run().unwrap().run_id;
    pipeline.reset_source();
    pipeline.execute(None).unwrap();
    assert_ne!(pipeline.last_run().unwrap().run_id, first);
}

#[test]
fn stage_names_list_source_first() {
    let pipeline = even_tens(&[]);
    let names: Vec<&str> = pipeline.stage_names().into_iter().map(StageName::as_str).collect();
    assert_eq!(names, vec!["list", "even", "times-ten", "collect"]);
    assert_eq!(pipeline.len(), 4);
    assert!(pipeline.has_source());
}

#[test]
fn source_can_be_attached_after_stages() {
    let mut pipeline = Pipeline::new(pipeline_name("late-source"))
        .add_stage(Collect::new())
        .with_source(ListSource::new(numbers(&[1, 2])));
    assert_eq!(pipeline.execute(None).unwrap(), Some(json!([1, 2])));
}

#[test]
fn validate_flags_missing_source() {
    let pipeline = Pipeline::new(pipeline_name("p")).add_stage(Collect::new());
    assert_eq!(pipeline.validate(), vec![ChainWarning::MissingSource]);
}

#[test]
fn validate_flags_stages_after_consumer() {
    let pipeline = Pipeline::new(pipeline_name("p"))
        .with_source(ListSource::new(Vec::new()))
        .add_stage(Collect::new())
        .add_stage(TimesTen(stage_name("times-ten")));
    assert_eq!(
        pipeline.validate(),
        vec![ChainWarning::StagesAfterConsumer {
            consumer: stage_name("collect"),
            following: 1,
        }]
    );
}

#[test]
fn well_formed_chain_has_no_warnings() {
    assert!(even_tens(&[1]).validate().is_empty());
}

#[test]
fn from_config_applies_settings() {
    let config = PipelineConfig {
        name: "configured".to_string(),
        debug: true,
        max_invocations: Some(10),
        items: Vec::new(),
    };
    let pipeline = Pipeline::from_config(&config).unwrap();
    assert_eq!(pipeline.name().as_str(), "configured");
    assert!(pipeline.debug());
    assert!(format!("{pipeline:?}").contains("max_invocations: Some(10)"));
}

#[test]
fn debug_mode_does_not_change_results() {
    let mut quiet = even_tens(&[1, 2, 3, 4, 5]);
    let mut loud = even_tens(&[1, 2, 3, 4, 5]).set_debug(true);
    assert_eq!(quiet.execute(None).unwrap(), loud.execute(None).unwrap());
}

/// In-memory writer for capturing formatted tracing output.
#[derive(Clone, Default)]
struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn run_with_captured_logs(pipeline: &mut Pipeline) -> String {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::with_default(subscriber, || pipeline.execute(None).unwrap());
    logs.contents()
}

#[test]
fn debug_run_logs_each_stage_invocation() {
    let mut pipeline = even_tens(&[1, 2]).set_debug(true);
    let output = run_with_captured_logs(&mut pipeline);

    assert!(output.contains("Stage input"), "{output}");
    assert!(output.contains("Stage output"), "{output}");
    assert!(output.contains("pipeline=even-tens"), "{output}");
    assert!(output.contains("stage=times-ten"), "{output}");
    assert!(output.contains("input=2"), "{output}");
    assert!(output.contains("output=20"), "{output}");
    assert!(output.contains("output=[20]"), "{output}");
}

#[test]
fn quiet_run_logs_no_stage_events_at_info() {
    let mut pipeline = even_tens(&[1, 2]);
    let output = run_with_captured_logs(&mut pipeline);

    assert!(!output.contains("Stage input"), "{output}");
    assert!(!output.contains("Stage output"), "{output}");
}

#[test]
fn summaries_are_truncated() {
    let long = json!("x".repeat(MAX_SUMMARY_CHARS * 2));
    let summary = summarize(Some(&long));
    assert!(summary.ends_with("..."));
    assert_eq!(summary.chars().count(), MAX_SUMMARY_CHARS + 3);
    assert_eq!(summarize(None), "<none>");
    assert_eq!(summarize_output(&StageOutput::Skip), "<skip>");
}
