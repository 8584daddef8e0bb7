//! Built-in demonstration pipelines.

use clap::ValueEnum;
use pipeline::{ConfigError, Item, Pipeline, PipelineConfig, StageError, StageName};
use stages::{AggregateStage, DataSource, FilterStage, SinkStage, TransformStage};
use tracing::info;

/// A named pipeline shape the CLI knows how to assemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Keep even integers, multiply them by ten, collect them.
    EvenTens,
    /// Sum every item.
    Sum,
    /// Drain an empty source into a sink.
    Empty,
}

impl Scenario {
    /// Every scenario, in listing order.
    pub const ALL: [Scenario; 3] = [Scenario::EvenTens, Scenario::Sum, Scenario::Empty];

    /// Command-line spelling of the scenario.
    pub fn as_str(self) -> &'static str {
        match self {
            Scenario::EvenTens => "even-tens",
            Scenario::Sum => "sum",
            Scenario::Empty => "empty",
        }
    }

    /// One-line summary shown by `sluice scenarios`.
    pub fn description(self) -> &'static str {
        match self {
            Scenario::EvenTens => "keep even integers, multiply by ten, collect",
            Scenario::Sum => "sum all items",
            Scenario::Empty => "drain an empty source into a sink",
        }
    }

    /// Configuration used when no file is given: the scenario's name and the
    /// items 1 through 5.
    pub fn default_config(self) -> PipelineConfig {
        let mut config = PipelineConfig::new(self.as_str());
        config.items = (1..=5).map(Item::from).collect();
        config
    }

    /// Assembles the pipeline, sourcing items from `config.items`.
    pub fn build(self, config: &PipelineConfig) -> Result<Pipeline, ConfigError> {
        let pipeline = Pipeline::from_config(config)?;
        let pipeline = match self {
            Scenario::EvenTens => pipeline
                .with_source(DataSource::new(stage_name("items")?, config.items.clone()))
                .add_stage(FilterStage::new(stage_name("even")?, |item| {
                    item.as_i64().is_some_and(|n| n % 2 == 0)
                }))
                .add_stage(TransformStage::try_new(stage_name("times-ten")?, |item| {
                    item.as_i64()
                        .and_then(|n| n.checked_mul(10))
                        .map(Item::from)
                        .ok_or_else(|| StageError::invalid_item("an integer below i64::MAX / 10", &item))
                }))
                .add_stage(SinkStage::new(stage_name("print")?, |item| {
                    info!(%item, "Collected");
                })),
            Scenario::Sum => pipeline
                .with_source(DataSource::new(stage_name("items")?, config.items.clone()))
                .add_stage(AggregateStage::sum(stage_name("sum")?)),
            Scenario::Empty => pipeline
                .with_source(DataSource::new(stage_name("nothing")?, Vec::new()))
                .add_stage(SinkStage::new(stage_name("noop")?, |_| {})),
        };
        Ok(pipeline)
    }
}

fn stage_name(name: &str) -> Result<StageName, ConfigError> {
    StageName::new(name).ok_or_else(|| ConfigError::Invalid {
        message: "stage name must not be empty".to_string(),
    })
}
