//! Explicit comparison strategies.

use crate::error::ContractError;
use crate::pattern::RegexPattern;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StrategyType {
    EqualTo,
    Contains,
    Matching,
    NotMatching,
    EqualToJson,
    EqualToXml,
    Absent,
    BinaryEqualTo,
}

impl StrategyType {
    pub fn name(self) -> &'static str {
        match self {
            StrategyType::EqualTo => "equalTo",
            StrategyType::Contains => "contains",
            StrategyType::Matching => "matches",
            StrategyType::NotMatching => "doesNotMatch",
            StrategyType::EqualToJson => "equalToJson",
            StrategyType::EqualToXml => "equalToXml",
            StrategyType::Absent => "absent",
            StrategyType::BinaryEqualTo => "binaryEqualTo",
        }
    }
}

/// A comparison kind plus its payload.
///
/// `BinaryEqualTo` payloads are kept base64 encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingStrategy {
    kind: StrategyType,
    value: Value,
}

impl MatchingStrategy {
    /// Build a strategy from a kind and a raw payload, validating the payload.
    pub fn new(kind: StrategyType, value: Value) -> Result<Self, ContractError> {
        match kind {
            StrategyType::Matching | StrategyType::NotMatching => {
                let source = value.as_str().ok_or_else(|| {
                    ContractError::InvalidDocument(format!("{} needs a string pattern", kind.name()))
                })?;
                RegexPattern::new(source)?;
            }
            StrategyType::Contains | StrategyType::EqualToXml => {
                if !value.is_string() {
                    return Err(ContractError::InvalidDocument(format!(
                        "{} needs a string value",
                        kind.name()
                    )));
                }
            }
            StrategyType::BinaryEqualTo => {
                let encoded = value.as_str().unwrap_or_default();
                base64::engine::general_purpose::STANDARD
                    .decode(encoded)
                    .map_err(|e| {
                        ContractError::InvalidDocument(format!("binaryEqualTo needs base64: {e}"))
                    })?;
            }
            StrategyType::Absent => return Ok(Self::absent()),
            StrategyType::EqualTo | StrategyType::EqualToJson => {}
        }
        Ok(Self { kind, value })
    }

    pub fn equal_to(value: impl Into<Value>) -> Self {
        Self {
            kind: StrategyType::EqualTo,
            value: value.into(),
        }
    }

    pub fn contains(value: impl Into<String>) -> Self {
        Self {
            kind: StrategyType::Contains,
            value: Value::String(value.into()),
        }
    }

    pub fn matching(pattern: &RegexPattern) -> Self {
        Self {
            kind: StrategyType::Matching,
            value: Value::String(pattern.as_str().to_string()),
        }
    }

    pub fn not_matching(pattern: &RegexPattern) -> Self {
        Self {
            kind: StrategyType::NotMatching,
            value: Value::String(pattern.as_str().to_string()),
        }
    }

    pub fn equal_to_json(value: Value) -> Self {
        Self {
            kind: StrategyType::EqualToJson,
            value,
        }
    }

    pub fn equal_to_xml(xml: impl Into<String>) -> Self {
        Self {
            kind: StrategyType::EqualToXml,
            value: Value::String(xml.into()),
        }
    }

    pub fn absent() -> Self {
        Self {
            kind: StrategyType::Absent,
            value: Value::Null,
        }
    }

    pub fn binary_equal_to(bytes: &[u8]) -> Self {
        Self {
            kind: StrategyType::BinaryEqualTo,
            value: Value::String(base64::engine::general_purpose::STANDARD.encode(bytes)),
        }
    }

    pub fn kind(&self) -> StrategyType {
        self.kind
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The compiled pattern of a `Matching`/`NotMatching` strategy.
    pub fn pattern(&self) -> Option<RegexPattern> {
        match self.kind {
            StrategyType::Matching | StrategyType::NotMatching => {
                self.value.as_str().and_then(|s| RegexPattern::new(s).ok())
            }
            _ => None,
        }
    }

    /// Decoded payload of a `BinaryEqualTo` strategy.
    pub fn bytes(&self) -> Option<Vec<u8>> {
        if self.kind != StrategyType::BinaryEqualTo {
            return None;
        }
        base64::engine::general_purpose::STANDARD
            .decode(self.value.as_str()?)
            .ok()
    }
}

impl fmt::Display for MatchingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == StrategyType::Absent {
            f.write_str("absent()")
        } else {
            write!(f, "{}({})", self.kind.name(), self.value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_payload() {
        assert!(MatchingStrategy::new(StrategyType::Matching, Value::from("[a-z]+")).is_ok());
        assert!(MatchingStrategy::new(StrategyType::Matching, Value::from("(")).is_err());
        assert!(MatchingStrategy::new(StrategyType::Contains, Value::from(1)).is_err());
        assert!(MatchingStrategy::new(StrategyType::BinaryEqualTo, Value::from("%%%")).is_err());
    }

    #[test]
    fn test_absent_ignores_payload() {
        let strategy = MatchingStrategy::new(StrategyType::Absent, Value::from("x")).unwrap();
        assert_eq!(strategy, MatchingStrategy::absent());
        assert_eq!(strategy.to_string(), "absent()");
    }

    #[test]
    fn test_binary_round_trip() {
        let strategy = MatchingStrategy::binary_equal_to(&[0, 159, 146, 150]);
        assert_eq!(strategy.bytes(), Some(vec![0, 159, 146, 150]));
        assert_eq!(strategy.value(), &Value::from("AJ+Slg=="));
    }

    #[test]
    fn test_display() {
        assert_eq!(MatchingStrategy::contains("abc").to_string(), "contains(\"abc\")");
    }
}
