//! Sluice CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse arguments** — `run` executes a demonstration pipeline,
//!    `scenarios` lists them.
//! 2. **Wire observability** — configure `tracing-subscriber` with an
//!    `EnvFilter` (`RUST_LOG`, default `info`) and an optional JSON layer. All
//!    `tracing` spans and events emitted by the workspace flow through it.
//! 3. **Load configuration** — read a [`pipeline::PipelineConfig`] from
//!    `--config`, or fall back to built-in defaults.
//! 4. **Build and run** — assemble the chosen scenario's stages, execute the
//!    pipeline once, and print the result as JSON on stdout.

mod scenario;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pipeline::PipelineConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::scenario::Scenario;

#[derive(Parser)]
#[command(name = "sluice")]
#[command(about = "Run sequential multi-stage data pipelines", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines instead of human-readable text
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a demonstration pipeline and print its result
    Run {
        /// Pipeline configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Log every stage invocation
        #[arg(long)]
        debug: bool,

        /// Which pipeline to build
        #[arg(short, long, value_enum, default_value_t = Scenario::EvenTens)]
        scenario: Scenario,
    },

    /// List the demonstration pipelines
    Scenarios,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match cli.command {
        Command::Run {
            config,
            debug,
            scenario,
        } => run(config, debug, scenario),
        Command::Scenarios => {
            for scenario in Scenario::ALL {
                println!("{:<10} {}", scenario.as_str(), scenario.description());
            }
            Ok(())
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(config_path: Option<PathBuf>, debug: bool, scenario: Scenario) -> Result<()> {
    let mut config = match &config_path {
        Some(path) => PipelineConfig::from_path(path)
            .with_context(|| format!("loading configuration for scenario '{}'", scenario.as_str()))?,
        None => scenario.default_config(),
    };
    config.debug |= debug;

    let mut pipeline = scenario
        .build(&config)
        .context("building pipeline from configuration")?;
    info!(pipeline = %pipeline.name(), stages = pipeline.len(), "Pipeline assembled");

    let result = pipeline.execute(None)?;
    if let Some(stats) = pipeline.last_run() {
        info!(
            run_id = %stats.run_id,
            invocations = %stats.invocations,
            items_pulled = %stats.items_pulled,
            skips = %stats.skips,
            elapsed_us = stats.elapsed().num_microseconds().unwrap_or_default(),
            "Pipeline run finished"
        );
    }

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
