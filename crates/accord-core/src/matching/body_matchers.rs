//! Path-addressed overrides for body values.

use crate::error::ContractError;
use crate::pattern::{NamedPattern, RegexPattern};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingType {
    Equality,
    Type,
    Date,
    Time,
    Timestamp,
    Regex,
    Null,
    Command,
}

/// Which path language a matcher is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathKind {
    JsonPath,
    XPath,
}

/// How a selected value is checked, without the path.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingTypeValue {
    matching_type: MatchingType,
    value: Option<String>,
    min_occurs: Option<u32>,
    max_occurs: Option<u32>,
}

impl MatchingTypeValue {
    fn of(matching_type: MatchingType, value: Option<String>) -> Self {
        Self {
            matching_type,
            value,
            min_occurs: None,
            max_occurs: None,
        }
    }

    /// Build from loose parts, e.g. from a contract document.
    pub fn from_parts(
        matching_type: MatchingType,
        value: Option<String>,
        min_occurs: Option<u32>,
        max_occurs: Option<u32>,
    ) -> Result<Self, ContractError> {
        let spec = match matching_type {
            MatchingType::Equality => by_equality(),
            MatchingType::Type => by_type_within(min_occurs, max_occurs)?,
            MatchingType::Date => by_date(),
            MatchingType::Time => by_time(),
            MatchingType::Timestamp => by_timestamp(),
            MatchingType::Null => by_null(),
            MatchingType::Regex => by_regex(value.as_deref().ok_or_else(|| {
                ContractError::InvalidDocument("a regex matcher needs a value".to_string())
            })?)?,
            MatchingType::Command => by_command(value.clone().ok_or_else(|| {
                ContractError::InvalidDocument("a command matcher needs a value".to_string())
            })?),
        };
        if matching_type != MatchingType::Type && (min_occurs.is_some() || max_occurs.is_some()) {
            return Err(ContractError::InvalidDocument(format!(
                "occurrence bounds are only allowed on type matchers, not {matching_type:?}"
            )));
        }
        Ok(spec)
    }

    pub fn matching_type(&self) -> MatchingType {
        self.matching_type
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn min_occurs(&self) -> Option<u32> {
        self.min_occurs
    }

    pub fn max_occurs(&self) -> Option<u32> {
        self.max_occurs
    }

    /// The pattern behind regex-like matching types.
    pub fn pattern(&self) -> Option<RegexPattern> {
        match self.matching_type {
            MatchingType::Regex | MatchingType::Date | MatchingType::Time | MatchingType::Timestamp => {
                self.value.as_deref().and_then(|v| RegexPattern::new(v).ok())
            }
            _ => None,
        }
    }
}

pub fn by_equality() -> MatchingTypeValue {
    MatchingTypeValue::of(MatchingType::Equality, None)
}

pub fn by_regex(source: &str) -> Result<MatchingTypeValue, ContractError> {
    RegexPattern::new(source)?;
    Ok(MatchingTypeValue::of(MatchingType::Regex, Some(source.to_string())))
}

pub fn by_date() -> MatchingTypeValue {
    MatchingTypeValue::of(MatchingType::Date, Some(NamedPattern::Date.source()))
}

pub fn by_time() -> MatchingTypeValue {
    MatchingTypeValue::of(MatchingType::Time, Some(NamedPattern::Time.source()))
}

pub fn by_timestamp() -> MatchingTypeValue {
    MatchingTypeValue::of(MatchingType::Timestamp, Some(NamedPattern::DateTime.source()))
}

pub fn by_type() -> MatchingTypeValue {
    MatchingTypeValue::of(MatchingType::Type, None)
}

/// Type match with occurrence bounds on the selected collection.
pub fn by_type_within(
    min_occurs: Option<u32>,
    max_occurs: Option<u32>,
) -> Result<MatchingTypeValue, ContractError> {
    if let (Some(min), Some(max)) = (min_occurs, max_occurs) {
        if min > max {
            return Err(ContractError::InvalidDocument(format!(
                "min occurrence {min} is greater than max occurrence {max}"
            )));
        }
    }
    Ok(MatchingTypeValue {
        min_occurs,
        max_occurs,
        ..MatchingTypeValue::of(MatchingType::Type, None)
    })
}

pub fn by_null() -> MatchingTypeValue {
    MatchingTypeValue::of(MatchingType::Null, None)
}

pub fn by_command(command: impl Into<String>) -> MatchingTypeValue {
    MatchingTypeValue::of(MatchingType::Command, Some(command.into()))
}

/// A single override: a path plus how the selected values are checked.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyMatcher {
    path: String,
    path_kind: PathKind,
    spec: MatchingTypeValue,
}

impl BodyMatcher {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn path_kind(&self) -> PathKind {
        self.path_kind
    }

    pub fn spec(&self) -> &MatchingTypeValue {
        &self.spec
    }

    pub fn matching_type(&self) -> MatchingType {
        self.spec.matching_type
    }
}

/// Ordered body matchers. Every matcher is applied, in declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BodyMatchers {
    matchers: Vec<BodyMatcher>,
}

impl BodyMatchers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json_path(&mut self, path: impl Into<String>, spec: MatchingTypeValue) -> &mut Self {
        self.matchers.push(BodyMatcher {
            path: path.into(),
            path_kind: PathKind::JsonPath,
            spec,
        });
        self
    }

    pub fn xpath(&mut self, path: impl Into<String>, spec: MatchingTypeValue) -> &mut Self {
        self.matchers.push(BodyMatcher {
            path: path.into(),
            path_kind: PathKind::XPath,
            spec,
        });
        self
    }

    pub fn has_matchers(&self) -> bool {
        !self.matchers.is_empty()
    }

    pub fn matchers(&self) -> &[BodyMatcher] {
        &self.matchers
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BodyMatcher> {
        self.matchers.iter()
    }
}
