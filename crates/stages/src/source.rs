//! A source stage over a fixed, ordered collection of items.

use pipeline::{Item, SourceStage, Stage, StageError, StageName, StageOutput};

/// Yields the items of a fixed collection one at a time.
///
/// Once every item has been yielded the source keeps answering end-of-stream
/// until [`SourceStage::reset`] rewinds it.
#[derive(Debug, Clone)]
pub struct DataSource {
    name: StageName,
    items: Vec<Item>,
    cursor: usize,
}

impl DataSource {
    /// Creates a source over `items`, in order.
    pub fn new(name: StageName, items: Vec<Item>) -> Self {
        Self {
            name,
            items,
            cursor: 0,
        }
    }

    /// Creates a source from anything convertible into items.
    ///
    /// ```ignore
    /// let source = DataSource::from_items(name, [1, 2, 3]);
    /// ```
    pub fn from_items<I, T>(name: StageName, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Item>,
    {
        Self::new(name, items.into_iter().map(Into::into).collect())
    }

    /// Total number of items, yielded or not.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the source has no items at all.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of items not yet yielded.
    pub fn remaining(&self) -> usize {
        self.items.len() - self.cursor
    }

    /// Returns `true` once every item has been yielded.
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.items.len()
    }
}

impl Stage for DataSource {
    fn name(&self) -> &StageName {
        &self.name
    }

    /// Ignores `input`; a source only produces.
    fn process(&mut self, _input: Option<Item>) -> Result<StageOutput, StageError> {
        Ok(StageOutput::from_option(self.pull()))
    }
}

impl SourceStage for DataSource {
    fn pull(&mut self) -> Option<Item> {
        let item = self.items.get(self.cursor).cloned()?;
        self.cursor += 1;
        Some(item)
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }
}
