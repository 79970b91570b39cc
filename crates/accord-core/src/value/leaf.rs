//! Leaves of the contract value graph.

use crate::error::ContractError;
use crate::matching::{MatchingStrategy, StrategyType};
use crate::pattern::{RegexPattern, RegexProperty};
use crate::value::DualValue;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A single contract value as seen from one side.
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    /// A scalar JSON value: string, number, boolean or null.
    Literal(Value),
    /// A regular expression the actual value has to satisfy.
    Pattern(RegexProperty),
    /// A concrete value generated from a pattern when first needed.
    Generated(RegexProperty),
    /// An explicit comparison such as `contains` or `absent`.
    Strategy(MatchingStrategy),
    /// A pattern that also accepts the value being missing.
    Optional(RegexPattern),
    /// Copied from the matched request when the response is served.
    FromRequest(RequestRef),
    /// A method the generated test calls.
    Execute(String),
    /// A string built from literal text and nested values.
    Interpolated(Vec<Fragment>),
    /// Raw bytes, used for binary bodies.
    Bytes(Vec<u8>),
}

/// One piece of an interpolated string.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Text(String),
    Value(DualValue<Leaf>),
}

impl Leaf {
    /// True for leaves that stand for a set of values rather than one value.
    pub fn is_pattern(&self) -> bool {
        matches!(self, Leaf::Pattern(_) | Leaf::Optional(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Leaf::Strategy(s) if s.kind() == StrategyType::Absent)
    }

    /// The pattern that accepts this leaf's values, if it is a pattern.
    pub fn pattern(&self) -> Option<RegexPattern> {
        match self {
            Leaf::Pattern(property) => Some(property.pattern().clone()),
            Leaf::Optional(pattern) => pattern.optional().ok(),
            _ => None,
        }
    }

    /// The text of a concrete scalar, used when checking it against a pattern.
    pub fn concrete_text(&self) -> Option<String> {
        match self {
            Leaf::Literal(value) => Some(text_of(value)),
            Leaf::Generated(property) => property.example().map(str::to_string),
            Leaf::Interpolated(fragments) => {
                let mut text = String::new();
                for fragment in fragments {
                    match fragment {
                        Fragment::Text(part) => text.push_str(part),
                        Fragment::Value(value) => {
                            let (_, leaf) = value.side_or_other(crate::value::Side::Server);
                            text.push_str(&leaf.concrete_text()?);
                        }
                    }
                }
                Some(text)
            }
            _ => None,
        }
    }

    /// A short description for error messages.
    pub fn describe(&self) -> String {
        match self {
            Leaf::Literal(value) => text_of(value),
            Leaf::Pattern(property) | Leaf::Generated(property) => {
                property.pattern().as_str().to_string()
            }
            Leaf::Strategy(strategy) => strategy.to_string(),
            Leaf::Optional(pattern) => format!("({})?", pattern.as_str()),
            Leaf::FromRequest(reference) => format!("fromRequest({reference})"),
            Leaf::Execute(command) => format!("execute({command})"),
            Leaf::Interpolated(fragments) => fragments
                .iter()
                .map(|fragment| match fragment {
                    Fragment::Text(text) => text.clone(),
                    Fragment::Value(value) => {
                        let (_, leaf) = value.side_or_other(crate::value::Side::Client);
                        format!("${{{}}}", leaf.describe())
                    }
                })
                .collect(),
            Leaf::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
        }
    }
}

/// Text form of a scalar JSON value: strings unquoted, everything else as JSON.
pub fn text_of(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl From<&str> for Leaf {
    fn from(value: &str) -> Self {
        Leaf::Literal(Value::String(value.to_string()))
    }
}

impl From<String> for Leaf {
    fn from(value: String) -> Self {
        Leaf::Literal(Value::String(value))
    }
}

impl From<bool> for Leaf {
    fn from(value: bool) -> Self {
        Leaf::Literal(Value::Bool(value))
    }
}

macro_rules! number_leaf {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Leaf {
            fn from(value: $ty) -> Self {
                Leaf::Literal(Value::from(value))
            }
        })*
    };
}

number_leaf!(i32, i64, u16, u32, u64, f64);

impl From<RegexProperty> for Leaf {
    fn from(value: RegexProperty) -> Self {
        Leaf::Pattern(value)
    }
}

impl From<MatchingStrategy> for Leaf {
    fn from(value: MatchingStrategy) -> Self {
        Leaf::Strategy(value)
    }
}

impl From<RequestRef> for Leaf {
    fn from(value: RequestRef) -> Self {
        Leaf::FromRequest(value)
    }
}

/// A part of the incoming request a response value is copied from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestRef {
    /// Path and query string.
    Url,
    /// Path without the query string.
    Path,
    /// Zero-based path segment.
    PathSegment(usize),
    Query { name: String, index: usize },
    Header { name: String, index: usize },
    Cookie(String),
    Body,
    /// A JSONPath evaluated against the JSON request body.
    BodyPath(String),
}

impl RequestRef {
    pub fn query(name: impl Into<String>) -> Self {
        RequestRef::Query {
            name: name.into(),
            index: 0,
        }
    }

    pub fn header(name: impl Into<String>) -> Self {
        RequestRef::Header {
            name: name.into(),
            index: 0,
        }
    }
}

impl fmt::Display for RequestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestRef::Url => f.write_str("url"),
            RequestRef::Path => f.write_str("path"),
            RequestRef::PathSegment(index) => write!(f, "path:{index}"),
            RequestRef::Query { name, index } => write!(f, "query:{name}:{index}"),
            RequestRef::Header { name, index } => write!(f, "header:{name}:{index}"),
            RequestRef::Cookie(name) => write!(f, "cookie:{name}"),
            RequestRef::Body => f.write_str("body"),
            RequestRef::BodyPath(path) => write!(f, "body:{path}"),
        }
    }
}

/// Parses `url`, `path`, `path:1`, `query:name[:i]`, `header:name[:i]`,
/// `cookie:name`, `body` and `body:$.json.path`.
impl FromStr for RequestRef {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ContractError::InvalidReference(format!("unknown request reference [{s}]"));
        let (kind, rest) = match s.split_once(':') {
            Some((kind, rest)) => (kind, Some(rest)),
            None => (s, None),
        };

        let named = |rest: Option<&str>| -> Result<(String, usize), ContractError> {
            let rest = rest.filter(|r| !r.is_empty()).ok_or_else(invalid)?;
            match rest.rsplit_once(':') {
                Some((name, index)) => {
                    let index = index.parse().map_err(|_| invalid())?;
                    Ok((name.to_string(), index))
                }
                None => Ok((rest.to_string(), 0)),
            }
        };

        match (kind, rest) {
            ("url", None) => Ok(RequestRef::Url),
            ("path", None) => Ok(RequestRef::Path),
            ("path", Some(index)) => index
                .parse()
                .map(RequestRef::PathSegment)
                .map_err(|_| invalid()),
            ("query", rest) => named(rest).map(|(name, index)| RequestRef::Query { name, index }),
            ("header", rest) => {
                named(rest).map(|(name, index)| RequestRef::Header { name, index })
            }
            ("cookie", Some(name)) if !name.is_empty() => Ok(RequestRef::Cookie(name.to_string())),
            ("body", None) => Ok(RequestRef::Body),
            ("body", Some(path)) if path.starts_with('$') => {
                Ok(RequestRef::BodyPath(path.to_string()))
            }
            _ => Err(invalid()),
        }
    }
}
