//! Regular expression patterns and example generation.
//!
//! - `library`: named patterns shared by contracts (UUID, dates, email, ...)
//! - `property`: a pattern plus its value kind and optional fixed example
//! - `generator`: produces strings that fully match a pattern
//! - `cache`: memoized examples, shared between compilations

mod cache;
mod generator;
mod library;
mod property;

pub use cache::ExampleCache;
pub use generator::{ExampleGenerator, SeededGenerator};
pub use library::{any_of, multipart_file, multipart_param, NamedPattern};
pub use property::RegexProperty;

use crate::error::ContractError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A compiled regular expression that has to match a whole value.
///
/// The source is kept as written; matching always anchors it at both ends.
#[derive(Clone)]
pub struct RegexPattern {
    source: String,
    anchored: Arc<Regex>,
}

impl RegexPattern {
    pub fn new(source: impl Into<String>) -> Result<Self, ContractError> {
        let source = source.into();
        let anchored = Regex::new(&format!("^(?:{source})$")).map_err(|e| {
            ContractError::InvalidPattern {
                pattern: source.clone(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self {
            source,
            anchored: Arc::new(anchored),
        })
    }

    /// A pattern matching exactly `literal`.
    pub fn literal(literal: &str) -> Result<Self, ContractError> {
        Self::new(regex::escape(literal))
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Full match.
    pub fn is_match(&self, text: &str) -> bool {
        self.anchored.is_match(text)
    }

    /// The same pattern, also accepting the empty string.
    pub fn optional(&self) -> Result<RegexPattern, ContractError> {
        Self::new(format!("({})?", self.source))
    }
}

impl PartialEq for RegexPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for RegexPattern {}

impl Hash for RegexPattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
    }
}

impl fmt::Debug for RegexPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RegexPattern").field(&self.source).finish()
    }
}

impl fmt::Display for RegexPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// How a generated example is rendered into JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    #[default]
    String,
    Integer,
    Double,
    Boolean,
}

impl ValueKind {
    /// Render matched text as a JSON value of this kind.
    ///
    /// Returns `None` when the text cannot be read as the kind, e.g. an integer
    /// outside the `i64` range.
    pub fn render(self, text: &str) -> Option<Value> {
        match self {
            ValueKind::String => Some(Value::String(text.to_string())),
            ValueKind::Integer => text.parse::<i64>().ok().map(Value::from),
            ValueKind::Double => text
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),
            ValueKind::Boolean => text.parse::<bool>().ok().map(Value::Bool),
        }
    }
}

impl std::str::FromStr for ValueKind {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" => Ok(ValueKind::String),
            "integer" | "int" | "long" => Ok(ValueKind::Integer),
            "double" | "number" | "decimal" => Ok(ValueKind::Double),
            "boolean" | "bool" => Ok(ValueKind::Boolean),
            other => Err(ContractError::InvalidDocument(format!(
                "unknown value kind [{other}]"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_is_full_match() {
        let pattern = RegexPattern::new("[0-9]+").unwrap();
        assert!(pattern.is_match("123"));
        assert!(!pattern.is_match("a123"));
        assert!(!pattern.is_match("123a"));
    }

    #[test]
    fn test_alternation_is_anchored_as_a_whole() {
        let pattern = RegexPattern::new("a|b").unwrap();
        assert!(pattern.is_match("a"));
        assert!(!pattern.is_match("ab"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = RegexPattern::new("(").unwrap_err();
        assert!(matches!(err, ContractError::InvalidPattern { .. }));
    }

    #[test]
    fn test_literal_escapes() {
        let pattern = RegexPattern::literal("a.b").unwrap();
        assert!(pattern.is_match("a.b"));
        assert!(!pattern.is_match("axb"));
    }

    #[test]
    fn test_optional() {
        let pattern = RegexPattern::new("[a-z]+").unwrap().optional().unwrap();
        assert_eq!(pattern.as_str(), "([a-z]+)?");
        assert!(pattern.is_match(""));
        assert!(pattern.is_match("abc"));
    }

    #[test]
    fn test_value_kind_render() {
        assert_eq!(ValueKind::Integer.render("42"), Some(Value::from(42)));
        assert_eq!(ValueKind::Integer.render("4.2"), None);
        assert_eq!(ValueKind::Double.render("4.5"), Some(Value::from(4.5)));
        assert_eq!(ValueKind::Boolean.render("true"), Some(Value::Bool(true)));
        assert_eq!(
            ValueKind::String.render("x"),
            Some(Value::String("x".to_string()))
        );
    }
}
