//! Sluice stage implementations.
//!
//! Each type here implements [`pipeline::Stage`] (and, for [`DataSource`],
//! [`pipeline::SourceStage`]). Stages hold their callbacks and private state;
//! they never touch the orchestrator.
//!
//! | Stage | Given an item | Given no payload |
//! |-------|---------------|------------------|
//! | [`DataSource`] | ignores it, yields the next item | yields the next item, or end-of-stream |
//! | [`FilterStage`] | the item, or `Skip` | end-of-stream |
//! | [`TransformStage`] | the mapped item | end-of-stream |
//! | [`AggregateStage`] | folds it, `Continue` | the accumulator, then resets |
//! | [`SinkStage`] | consumes and buffers it, `Continue` | the buffer as a list, then clears |
//!
//! ## Callbacks
//!
//! Every stage that takes a callback has an infallible constructor (`new`) and
//! a fallible one (`try_new`) whose callback returns
//! `Result<_, pipeline::StageError>`. A callback error aborts the pipeline run.

pub mod aggregate;
pub mod filter;
pub mod sink;
pub mod source;
pub mod transform;

pub use aggregate::AggregateStage;
pub use filter::FilterStage;
pub use sink::SinkStage;
pub use source::DataSource;
pub use transform::TransformStage;
