//! Body matching: a whole-body comparison or a list of path assertions.

use crate::compile::graph::Comparison;
use serde_json::Value;
use serde_json_path::JsonPath;
use std::fmt;

/// JSON value kinds, as checked by type matchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl JsonKind {
    pub fn of(value: &Value) -> JsonKind {
        match value {
            Value::Null => JsonKind::Null,
            Value::Bool(_) => JsonKind::Boolean,
            Value::Number(_) => JsonKind::Number,
            Value::String(_) => JsonKind::String,
            Value::Array(_) => JsonKind::Array,
            Value::Object(_) => JsonKind::Object,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            JsonKind::Null => "null",
            JsonKind::Boolean => "boolean",
            JsonKind::Number => "number",
            JsonKind::String => "string",
            JsonKind::Array => "array",
            JsonKind::Object => "object",
        }
    }
}

/// What is checked at a path.
#[derive(Debug, Clone, PartialEq)]
pub enum PathCheck {
    Compare(Comparison),
    /// Same kind as the example, and an occurrence count within bounds.
    Type {
        kind: Option<JsonKind>,
        min: Option<u32>,
        max: Option<u32>,
    },
    Null,
    /// Handed to the generated test.
    Command(String),
    /// The array at the path has exactly this many elements.
    Size(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathAssertion {
    pub path: String,
    pub check: PathCheck,
}

impl PathAssertion {
    pub fn new(path: impl Into<String>, check: PathCheck) -> Self {
        Self {
            path: path.into(),
            check,
        }
    }

    /// Evaluate against a parsed JSON body. Commands hold here; the
    /// generated test runs them.
    pub fn holds_json(&self, body: &Value) -> bool {
        let Ok(path) = JsonPath::parse(&self.path) else {
            return false;
        };
        let nodes = path.query(body).all();
        match &self.check {
            PathCheck::Compare(Comparison::Absent) => nodes.is_empty(),
            PathCheck::Compare(comparison) => {
                !nodes.is_empty() && nodes.iter().all(|node| comparison.accepts_json(Some(node)))
            }
            PathCheck::Type { kind, min, max } => {
                if nodes.is_empty() {
                    return false;
                }
                if let Some(kind) = kind {
                    if !nodes.iter().all(|node| JsonKind::of(node) == *kind) {
                        return false;
                    }
                }
                let within = |count: usize| {
                    min.is_none_or(|min| count >= min as usize)
                        && max.is_none_or(|max| count <= max as usize)
                };
                let lengths: Option<Vec<usize>> =
                    nodes.iter().map(|node| node.as_array().map(Vec::len)).collect();
                match lengths {
                    Some(lengths) => lengths.into_iter().all(within),
                    None => within(nodes.len()),
                }
            }
            PathCheck::Null => !nodes.is_empty() && nodes.iter().all(|node| node.is_null()),
            PathCheck::Command(_) => true,
            PathCheck::Size(size) => {
                nodes.len() == 1 && nodes[0].as_array().map(Vec::len) == Some(*size)
            }
        }
    }

    /// Evaluate against an XML document.
    pub fn holds_xml(&self, document: &sxd_document::dom::Document<'_>) -> bool {
        let Some(texts) = crate::compile::xml::select(document, &self.path) else {
            return false;
        };
        match &self.check {
            PathCheck::Compare(Comparison::Absent) => texts.is_empty(),
            PathCheck::Compare(comparison) => {
                !texts.is_empty() && texts.iter().all(|text| comparison.accepts_text(Some(text)))
            }
            PathCheck::Type { min, max, .. } => {
                !texts.is_empty()
                    && min.is_none_or(|min| texts.len() >= min as usize)
                    && max.is_none_or(|max| texts.len() <= max as usize)
            }
            PathCheck::Null => texts.iter().all(|text| text.is_empty()),
            PathCheck::Command(_) => true,
            PathCheck::Size(size) => texts.len() == *size,
        }
    }
}

impl fmt::Display for PathAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.check {
            PathCheck::Compare(comparison) => write!(f, "{} {:?}", self.path, comparison),
            PathCheck::Type { kind, min, max } => write!(
                f,
                "{} is {} ({:?}..{:?})",
                self.path,
                kind.map_or("any", JsonKind::name),
                min,
                max
            ),
            PathCheck::Null => write!(f, "{} is null", self.path),
            PathCheck::Command(command) => write!(f, "{} by {}", self.path, command),
            PathCheck::Size(size) => write!(f, "{} has {} elements", self.path, size),
        }
    }
}

/// How a body is verified.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyMatch {
    Whole(Comparison),
    Json(Vec<PathAssertion>),
    Xml(Vec<PathAssertion>),
}

impl BodyMatch {
    /// Check an actual body, `None` meaning no body was sent.
    pub fn accepts(&self, body: Option<&str>) -> bool {
        match self {
            BodyMatch::Whole(comparison) => comparison.accepts_text(body),
            BodyMatch::Json(assertions) => body
                .and_then(|body| serde_json::from_str::<Value>(body).ok())
                .is_some_and(|json| assertions.iter().all(|a| a.holds_json(&json))),
            BodyMatch::Xml(assertions) => {
                let Some(Ok(package)) = body.map(sxd_document::parser::parse) else {
                    return false;
                };
                let document = package.as_document();
                assertions.iter().all(|a| a.holds_xml(&document))
            }
        }
    }

    pub fn assertions(&self) -> &[PathAssertion] {
        match self {
            BodyMatch::Json(assertions) | BodyMatch::Xml(assertions) => assertions,
            BodyMatch::Whole(_) => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::RegexPattern;
    use serde_json::json;

    #[test]
    fn test_compare_and_size() {
        let body = json!({"items": [{"id": 1}, {"id": 2}]});
        assert!(PathAssertion::new("$.items", PathCheck::Size(2)).holds_json(&body));
        assert!(PathAssertion::new(
            "$.items[1].id",
            PathCheck::Compare(Comparison::EqualTo(json!(2)))
        )
        .holds_json(&body));
        assert!(!PathAssertion::new("$.items", PathCheck::Size(3)).holds_json(&body));
    }

    #[test]
    fn test_absent_path() {
        let body = json!({"a": 1});
        let absent = PathAssertion::new("$.b", PathCheck::Compare(Comparison::Absent));
        assert!(absent.holds_json(&body));
        assert!(!PathAssertion::new("$.a", PathCheck::Compare(Comparison::Absent)).holds_json(&body));
    }

    #[test]
    fn test_type_bounds_on_arrays() {
        let body = json!({"tags": ["a", "b", "c"]});
        let check = |min, max| PathAssertion::new(
            "$.tags",
            PathCheck::Type { kind: Some(JsonKind::Array), min, max },
        );
        assert!(check(Some(1), Some(3)).holds_json(&body));
        assert!(!check(Some(4), None).holds_json(&body));
        assert!(!check(None, Some(2)).holds_json(&body));
    }

    #[test]
    fn test_type_kind_mismatch() {
        let body = json!({"id": "7"});
        let check = PathAssertion::new(
            "$.id",
            PathCheck::Type { kind: Some(JsonKind::Number), min: None, max: None },
        );
        assert!(!check.holds_json(&body));
    }

    #[test]
    fn test_body_match_json() {
        let pattern = RegexPattern::new("[0-9]+").unwrap();
        let body = BodyMatch::Json(vec![PathAssertion::new(
            "$.id",
            PathCheck::Compare(Comparison::Matching(pattern)),
        )]);
        assert!(body.accepts(Some(r#"{"id": "123"}"#)));
        assert!(!body.accepts(Some(r#"{"id": "x"}"#)));
        assert!(!body.accepts(Some("not json")));
        assert!(!body.accepts(None));
    }

    #[test]
    fn test_body_match_xml() {
        let body = BodyMatch::Xml(vec![PathAssertion::new(
            "/order/id/text()",
            PathCheck::Compare(Comparison::EqualTo(json!("7"))),
        )]);
        assert!(body.accepts(Some("<order><id>7</id></order>")));
        assert!(!body.accepts(Some("<order><id>8</id></order>")));
    }
}
