//! Predicate filtering.

use pipeline::{Item, Stage, StageError, StageName, StageOutput};

type Predicate = Box<dyn Fn(&Item) -> Result<bool, StageError>>;

/// Passes items that satisfy a predicate and rejects the rest.
///
/// A rejected item answers [`StageOutput::Skip`], which makes the pipeline
/// discard it and pull the next item from its source.
pub struct FilterStage {
    name: StageName,
    predicate: Predicate,
}

impl FilterStage {
    /// Creates a filter from an infallible predicate.
    pub fn new(name: StageName, predicate: impl Fn(&Item) -> bool + 'static) -> Self {
        Self::try_new(name, move |item| Ok(predicate(item)))
    }

    /// Creates a filter from a predicate that may fail.
    pub fn try_new(
        name: StageName,
        predicate: impl Fn(&Item) -> Result<bool, StageError> + 'static,
    ) -> Self {
        Self {
            name,
            predicate: Box::new(predicate),
        }
    }
}

impl Stage for FilterStage {
    fn name(&self) -> &StageName {
        &self.name
    }

    fn process(&mut self, input: Option<Item>) -> Result<StageOutput, StageError> {
        let Some(item) = input else {
            return Ok(StageOutput::EndOfStream);
        };
        if (self.predicate)(&item)? {
            Ok(StageOutput::Value(item))
        } else {
            Ok(StageOutput::Skip)
        }
    }
}

impl std::fmt::Debug for FilterStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterStage")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn is_even(item: &Item) -> bool {
        item.as_i64().is_some_and(|n| n % 2 == 0)
    }

    fn even_filter() -> FilterStage {
        FilterStage::new(StageName::new("even").unwrap(), is_even)
    }

    #[test]
    fn absent_input_is_end_of_stream() {
        assert_eq!(even_filter().process(None).unwrap(), StageOutput::EndOfStream);
    }

    #[test]
    fn rejected_item_skips() {
        assert_eq!(even_filter().process(Some(json!(3))).unwrap(), StageOutput::Skip);
    }

    #[test]
    fn predicate_error_propagates() {
        let mut filter = FilterStage::try_new(StageName::new("strict").unwrap(), |item| {
            item.as_i64()
                .map(|n| n > 0)
                .ok_or_else(|| StageError::invalid_item("an integer", item))
        });
        assert!(matches!(
            filter.process(Some(json!("nope"))),
            Err(StageError::InvalidItem { .. })
        ));
    }

    proptest! {
        #[test]
        fn passes_exactly_when_predicate_holds(n in any::<i64>()) {
            let output = even_filter().process(Some(json!(n))).unwrap();
            if n % 2 == 0 {
                prop_assert_eq!(output, StageOutput::Value(json!(n)));
            } else {
                prop_assert_eq!(output, StageOutput::Skip);
            }
        }
    }
}
