use crate::error::ContractError;
use crate::pattern::{RegexPattern, ValueKind};

/// A pattern placeholder: the regex, the kind its examples render as, and an
/// optional fixed example.
#[derive(Debug, Clone, PartialEq)]
pub struct RegexProperty {
    pattern: RegexPattern,
    example: Option<String>,
    kind: ValueKind,
}

impl RegexProperty {
    pub fn new(pattern: RegexPattern) -> Self {
        Self {
            pattern,
            example: None,
            kind: ValueKind::String,
        }
    }

    pub fn compile(source: &str) -> Result<Self, ContractError> {
        RegexPattern::new(source).map(Self::new)
    }

    pub fn with_kind(mut self, kind: ValueKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn as_string(self) -> Self {
        self.with_kind(ValueKind::String)
    }

    pub fn as_integer(self) -> Self {
        self.with_kind(ValueKind::Integer)
    }

    pub fn as_double(self) -> Self {
        self.with_kind(ValueKind::Double)
    }

    pub fn as_boolean(self) -> Self {
        self.with_kind(ValueKind::Boolean)
    }

    /// Fix the example instead of generating one. The example has to match.
    pub fn with_example(mut self, example: impl Into<String>) -> Result<Self, ContractError> {
        let example = example.into();
        if !self.pattern.is_match(&example) {
            return Err(ContractError::SideMismatch {
                pattern: self.pattern.as_str().to_string(),
                value: example,
            });
        }
        self.example = Some(example);
        Ok(self)
    }

    pub fn pattern(&self) -> &RegexPattern {
        &self.pattern
    }

    pub fn example(&self) -> Option<&str> {
        self.example.as_deref()
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_must_match() {
        let property = RegexProperty::compile("[a-f]{3}").unwrap();
        assert_eq!(
            property.clone().with_example("abc").unwrap().example(),
            Some("abc")
        );
        assert!(property.with_example("xyz").is_err());
    }

    #[test]
    fn test_kind_narrowing() {
        let property = RegexProperty::compile("[0-9]+").unwrap().as_integer();
        assert_eq!(property.kind(), ValueKind::Integer);
        assert_eq!(property.as_string().kind(), ValueKind::String);
    }
}
