//! Folding a stream into a single value.

use pipeline::{Item, Stage, StageError, StageName, StageOutput};
use serde_json::Number;
use tracing::debug;

type Folder = Box<dyn Fn(Item, Item) -> Result<Item, StageError>>;

/// Folds every item into an accumulator and emits it on end-of-stream.
///
/// Each item answers [`StageOutput::Continue`]. A call with no payload answers
/// the accumulator and resets it to the initial value, so the stage is ready
/// for the next run. A failed fold also resets the accumulator.
pub struct AggregateStage {
    name: StageName,
    folder: Folder,
    initial: Item,
    accumulator: Item,
}

impl AggregateStage {
    /// Creates an aggregate from an infallible folder `(acc, item) -> acc`.
    pub fn new(name: StageName, initial: Item, folder: impl Fn(Item, Item) -> Item + 'static) -> Self {
        Self::try_new(name, initial, move |acc, item| Ok(folder(acc, item)))
    }

    /// Creates an aggregate from a folder that may fail.
    pub fn try_new(
        name: StageName,
        initial: Item,
        folder: impl Fn(Item, Item) -> Result<Item, StageError> + 'static,
    ) -> Self {
        Self {
            name,
            folder: Box::new(folder),
            accumulator: initial.clone(),
            initial,
        }
    }

    /// Sums numeric items, starting from zero.
    ///
    /// Integer sums stay integers until they overflow `i64`, after which the
    /// sum continues as a float. Non-numeric items fail the run.
    pub fn sum(name: StageName) -> Self {
        Self::try_new(name, Item::from(0), add_numbers)
    }

    /// Counts items, starting from zero.
    pub fn count(name: StageName) -> Self {
        Self::new(name, Item::from(0), |acc, _item| {
            Item::from(acc.as_u64().unwrap_or_default() + 1)
        })
    }

    /// The current accumulator (the initial value if nothing has been folded).
    pub fn accumulator(&self) -> &Item {
        &self.accumulator
    }
}

fn add_numbers(acc: Item, item: Item) -> Result<Item, StageError> {
    if let (Some(a), Some(b)) = (acc.as_i64(), item.as_i64()) {
        if let Some(total) = a.checked_add(b) {
            return Ok(Item::from(total));
        }
    }
    let a = acc
        .as_f64()
        .ok_or_else(|| StageError::invalid_item("a number", &acc))?;
    let b = item
        .as_f64()
        .ok_or_else(|| StageError::invalid_item("a number", &item))?;
    Number::from_f64(a + b)
        .map(Item::Number)
        .ok_or_else(|| StageError::callback(format!("sum of {a} and {b} is not finite")))
}

impl Stage for AggregateStage {
    fn name(&self) -> &StageName {
        &self.name
    }

    fn process(&mut self, input: Option<Item>) -> Result<StageOutput, StageError> {
        let acc = std::mem::replace(&mut self.accumulator, self.initial.clone());
        match input {
            Some(item) => {
                self.accumulator = (self.folder)(acc, item)?;
                Ok(StageOutput::Continue)
            }
            None => {
                debug!(stage = %self.name, result = %acc, "Aggregate finalized");
                Ok(StageOutput::Value(acc))
            }
        }
    }

    fn consumes_items(&self) -> bool {
        true
    }
}

impl std::fmt::Debug for AggregateStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateStage")
            .field("name", &self.name)
            .field("initial", &self.initial)
            .field("accumulator", &self.accumulator)
            .finish_non_exhaustive()
    }
}
