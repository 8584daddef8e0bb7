//! Terminal consumption with buffering.

use pipeline::{Item, Stage, StageError, StageName, StageOutput};
use tracing::debug;

type Consumer = Box<dyn FnMut(&Item) -> Result<(), StageError>>;

/// Hands each item to a consumer and buffers it.
///
/// Each item answers [`StageOutput::Continue`]. A call with no payload answers
/// the buffered items as a list and clears the buffer.
pub struct SinkStage {
    name: StageName,
    consumer: Consumer,
    buffer: Vec<Item>,
}

impl SinkStage {
    /// Creates a sink from an infallible consumer.
    pub fn new(name: StageName, mut consumer: impl FnMut(&Item) + 'static) -> Self {
        Self::try_new(name, move |item| {
            consumer(item);
            Ok(())
        })
    }

    /// Creates a sink from a consumer that may fail.
    ///
    /// An item whose consumer fails is not buffered.
    pub fn try_new(name: StageName, consumer: impl FnMut(&Item) -> Result<(), StageError> + 'static) -> Self {
        Self {
            name,
            consumer: Box::new(consumer),
            buffer: Vec::new(),
        }
    }

    /// Creates a sink that only buffers.
    pub fn collect(name: StageName) -> Self {
        Self::new(name, |_| {})
    }

    /// Items received since the last finalization.
    pub fn buffered(&self) -> &[Item] {
        &self.buffer
    }
}

impl Stage for SinkStage {
    fn name(&self) -> &StageName {
        &self.name
    }

    fn process(&mut self, input: Option<Item>) -> Result<StageOutput, StageError> {
        match input {
            Some(item) => {
                (self.consumer)(&item)?;
                self.buffer.push(item);
                Ok(StageOutput::Continue)
            }
            None => {
                let results = std::mem::take(&mut self.buffer);
                debug!(stage = %self.name, items = results.len(), "Sink finalized");
                Ok(StageOutput::Value(Item::Array(results)))
            }
        }
    }

    fn consumes_items(&self) -> bool {
        true
    }
}

impl std::fmt::Debug for SinkStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkStage")
            .field("name", &self.name)
            .field("buffered", &self.buffer.len())
            .finish_non_exhaustive()
    }
}
