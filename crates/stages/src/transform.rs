//! Item mapping.

use pipeline::{Item, Stage, StageError, StageName, StageOutput};

type Mapper = Box<dyn Fn(Item) -> Result<Item, StageError>>;

/// Replaces each item with the result of a mapping function.
pub struct TransformStage {
    name: StageName,
    mapper: Mapper,
}

impl TransformStage {
    /// Creates a transform from an infallible mapper.
    pub fn new(name: StageName, mapper: impl Fn(Item) -> Item + 'static) -> Self {
        Self::try_new(name, move |item| Ok(mapper(item)))
    }

    /// Creates a transform from a mapper that may fail.
    pub fn try_new(
        name: StageName,
        mapper: impl Fn(Item) -> Result<Item, StageError> + 'static,
    ) -> Self {
        Self {
            name,
            mapper: Box::new(mapper),
        }
    }
}

impl Stage for TransformStage {
    fn name(&self) -> &StageName {
        &self.name
    }

    fn process(&mut self, input: Option<Item>) -> Result<StageOutput, StageError> {
        match input {
            Some(item) => Ok(StageOutput::Value((self.mapper)(item)?)),
            None => Ok(StageOutput::EndOfStream),
        }
    }
}

impl std::fmt::Debug for TransformStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformStage")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn times_ten() -> TransformStage {
        TransformStage::new(StageName::new("times-ten").unwrap(), |item| {
            json!(item.as_i64().unwrap_or_default() * 10)
        })
    }

    #[test]
    fn absent_input_passes_through() {
        assert_eq!(times_ten().process(None).unwrap(), StageOutput::EndOfStream);
    }

    #[test]
    fn mapper_may_change_the_item_shape() {
        let mut wrap = TransformStage::new(StageName::new("wrap").unwrap(), |item| {
            json!({ "value": item })
        });
        assert_eq!(
            wrap.process(Some(json!(1))).unwrap(),
            StageOutput::Value(json!({ "value": 1 }))
        );
    }

    #[test]
    fn mapper_error_propagates() {
        let mut strict = TransformStage::try_new(StageName::new("strict").unwrap(), |_| {
            Err(StageError::callback("refused"))
        });
        assert_eq!(
            strict.process(Some(json!(1))),
            Err(StageError::callback("refused"))
        );
    }

    proptest! {
        #[test]
        fn output_is_mapper_of_input(n in -1_000_000i64..1_000_000) {
            prop_assert_eq!(
                times_ten().process(Some(json!(n))).unwrap(),
                StageOutput::Value(json!(n * 10))
            );
        }
    }
}
