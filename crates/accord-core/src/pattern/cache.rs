use crate::error::ContractError;
use crate::pattern::{ExampleGenerator, RegexProperty, SeededGenerator, ValueKind};
use crate::value::text_of;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// How many generator attempts are made before a typed example is given up on.
const TYPED_ATTEMPTS: u32 = 8;

/// Memoized examples keyed by pattern source and value kind.
///
/// The same pattern always yields the same example for the lifetime of the
/// cache, which is what keeps both sides of an interpolated placeholder in
/// agreement. Clones share the underlying map.
#[derive(Debug, Clone)]
pub struct ExampleCache {
    generator: Arc<dyn ExampleGenerator>,
    entries: Arc<RwLock<HashMap<(String, ValueKind), Value>>>,
}

impl Default for ExampleCache {
    fn default() -> Self {
        Self::new(SeededGenerator::default())
    }
}

impl ExampleCache {
    pub fn new(generator: impl ExampleGenerator + 'static) -> Self {
        Self {
            generator: Arc::new(generator),
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// A concrete value for `property`, rendered according to its kind.
    ///
    /// A fixed example on the property wins over generation. Every value
    /// returned matches the property's pattern in its rendered text form.
    pub fn example(&self, property: &RegexProperty) -> Result<Value, ContractError> {
        let pattern = property.pattern();
        let kind = property.kind();

        if let Some(fixed) = property.example() {
            return kind
                .render(fixed)
                .filter(|value| pattern.is_match(&text_of(value)))
                .ok_or_else(|| ContractError::UnsynthesizablePattern {
                    pattern: pattern.as_str().to_string(),
                    reason: format!("example [{fixed}] does not render as {kind:?}"),
                });
        }

        let key = (pattern.as_str().to_string(), kind);
        if let Some(hit) = self.entries.read().get(&key) {
            return Ok(hit.clone());
        }

        for attempt in 0..TYPED_ATTEMPTS {
            let candidate = self.generator.generate(pattern, attempt)?;
            if !pattern.is_match(&candidate) {
                return Err(ContractError::UnsynthesizablePattern {
                    pattern: pattern.as_str().to_string(),
                    reason: format!("generator returned non-matching value [{candidate}]"),
                });
            }
            let Some(rendered) = kind.render(&candidate) else {
                continue;
            };
            if pattern.is_match(&text_of(&rendered)) {
                debug!(pattern = %pattern, example = %rendered, "generated example");
                let mut entries = self.entries.write();
                return Ok(entries.entry(key).or_insert(rendered).clone());
            }
        }

        Err(ContractError::UnsynthesizablePattern {
            pattern: pattern.as_str().to_string(),
            reason: format!("no example renders as {kind:?}"),
        })
    }

    /// Example text for a string-kinded pattern.
    pub fn example_text(&self, property: &RegexProperty) -> Result<String, ContractError> {
        self.example(property).map(|value| text_of(&value))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{NamedPattern, RegexPattern};

    /// Always answers with a fixed table, for checking the cache's own rules.
    #[derive(Debug)]
    struct TableGenerator(HashMap<String, Vec<String>>);

    impl ExampleGenerator for TableGenerator {
        fn generate(&self, pattern: &RegexPattern, attempt: u32) -> Result<String, ContractError> {
            let options = &self.0[pattern.as_str()];
            Ok(options[(attempt as usize).min(options.len() - 1)].clone())
        }
    }

    #[test]
    fn test_example_is_cached() {
        let cache = ExampleCache::default();
        let property = NamedPattern::Uuid.property();
        let first = cache.example(&property).unwrap();
        let second = cache.example(&property).unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = ExampleCache::default();
        let clone = cache.clone();
        let property = NamedPattern::Email.property();
        assert_eq!(cache.example(&property).unwrap(), clone.example(&property).unwrap());
        assert_eq!(clone.len(), 1);
    }

    #[test]
    fn test_typed_example_is_rendered() {
        let cache = ExampleCache::default();
        let value = cache.example(&NamedPattern::PositiveInt.property()).unwrap();
        assert!(value.is_i64(), "{value}");
        let value = cache.example(&NamedPattern::Boolean.property()).unwrap();
        assert!(value.is_boolean());
    }

    #[test]
    fn test_retries_until_kind_renders() {
        let mut table = HashMap::new();
        table.insert(
            "[0-9a]+".to_string(),
            vec!["a1".to_string(), "12".to_string()],
        );
        let cache = ExampleCache::new(TableGenerator(table));
        let property = RegexProperty::compile("[0-9a]+").unwrap().as_integer();
        assert_eq!(cache.example(&property).unwrap(), Value::from(12));
    }

    #[test]
    fn test_non_matching_generator_output_is_an_error() {
        let mut table = HashMap::new();
        table.insert("[0-9]+".to_string(), vec!["abc".to_string()]);
        let cache = ExampleCache::new(TableGenerator(table));
        let property = RegexProperty::compile("[0-9]+").unwrap();
        assert!(matches!(
            cache.example(&property),
            Err(ContractError::UnsynthesizablePattern { .. })
        ));
    }

    #[test]
    fn test_fixed_example_wins() {
        let cache = ExampleCache::default();
        let property = RegexProperty::compile("[0-9]+")
            .unwrap()
            .as_integer()
            .with_example("7")
            .unwrap();
        assert_eq!(cache.example(&property).unwrap(), Value::from(7));
        assert!(cache.is_empty());
    }
}
