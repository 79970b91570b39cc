//! Compiled matcher and template trees.

use crate::pattern::RegexPattern;
use crate::value::{text_of, RequestRef};
use indexmap::IndexMap;
use serde_json::Value;
use sxd_document::dom::{ChildOfElement, ChildOfRoot, Document, Element};
use sxd_document::parser;

/// How one actual value is checked.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    EqualTo(Value),
    Contains(String),
    Matching(RegexPattern),
    NotMatching(RegexPattern),
    EqualToJson(Value),
    EqualToXml(String),
    BinaryEqualTo(Vec<u8>),
    Absent,
    /// Checked by a method the generated test calls.
    Command(String),
}

impl Comparison {
    /// Check a textual value, `None` meaning the value is missing.
    ///
    /// Commands cannot be evaluated here and never match.
    pub fn accepts_text(&self, actual: Option<&str>) -> bool {
        let Some(actual) = actual else {
            return matches!(self, Comparison::Absent)
                || matches!(self, Comparison::Matching(p) if p.is_match(""));
        };
        match self {
            Comparison::EqualTo(expected) => text_of(expected) == actual,
            Comparison::Contains(part) => actual.contains(part.as_str()),
            Comparison::Matching(pattern) => pattern.is_match(actual),
            Comparison::NotMatching(pattern) => !pattern.is_match(actual),
            Comparison::EqualToJson(expected) => serde_json::from_str::<Value>(actual)
                .map(|parsed| values_equal(expected, &parsed))
                .unwrap_or(false),
            Comparison::EqualToXml(expected) => same_xml(expected, actual),
            Comparison::BinaryEqualTo(bytes) => bytes.as_slice() == actual.as_bytes(),
            Comparison::Absent => false,
            Comparison::Command(_) => false,
        }
    }

    /// Check a JSON value selected from a body.
    pub fn accepts_json(&self, actual: Option<&Value>) -> bool {
        match (self, actual) {
            (Comparison::EqualTo(expected), Some(actual)) => values_equal(expected, actual),
            (Comparison::EqualToJson(expected), Some(actual)) => values_equal(expected, actual),
            (_, Some(Value::String(text))) => self.accepts_text(Some(text)),
            (_, Some(other)) => self.accepts_text(Some(&other.to_string())),
            (_, None) => self.accepts_text(None),
        }
    }

    /// The concrete value this comparison expects, when it has one.
    pub fn expected_value(&self) -> Option<&Value> {
        match self {
            Comparison::EqualTo(value) | Comparison::EqualToJson(value) => Some(value),
            _ => None,
        }
    }
}

/// Numbers compare by value so `1` and `1.0` agree.
fn values_equal(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| values_equal(x, y)))
        }
        (a, b) => a == b,
    }
}

/// Documents compare as element trees: names, attributes in any order and
/// non-blank text. Text that does not parse compares as written.
fn same_xml(expected: &str, actual: &str) -> bool {
    let (Ok(left), Ok(right)) = (parser::parse(expected), parser::parse(actual)) else {
        return expected.trim() == actual.trim();
    };
    let (left, right) = (left.as_document(), right.as_document());
    match (root_element(&left), root_element(&right)) {
        (Some(left), Some(right)) => same_element(left, right),
        _ => false,
    }
}

fn root_element<'d>(document: &Document<'d>) -> Option<Element<'d>> {
    document.root().children().into_iter().find_map(|child| match child {
        ChildOfRoot::Element(element) => Some(element),
        _ => None,
    })
}

fn same_element(left: Element<'_>, right: Element<'_>) -> bool {
    let (left_children, right_children) = (child_elements(left), child_elements(right));
    element_name(left) == element_name(right)
        && attributes(left) == attributes(right)
        && element_text(left) == element_text(right)
        && left_children.len() == right_children.len()
        && left_children
            .into_iter()
            .zip(right_children)
            .all(|(left, right)| same_element(left, right))
}

fn element_name(element: Element<'_>) -> (Option<String>, String) {
    let name = element.name();
    (name.namespace_uri().map(str::to_string), name.local_part().to_string())
}

fn attributes(element: Element<'_>) -> Vec<(Option<String>, String, String)> {
    let mut attributes: Vec<(Option<String>, String, String)> = element
        .attributes()
        .iter()
        .map(|attribute| {
            let name = attribute.name();
            (
                name.namespace_uri().map(str::to_string),
                name.local_part().to_string(),
                attribute.value().to_string(),
            )
        })
        .collect();
    attributes.sort();
    attributes
}

fn element_text(element: Element<'_>) -> String {
    element
        .children()
        .into_iter()
        .filter_map(|child| match child {
            ChildOfElement::Text(text) => Some(text.text().to_string()),
            _ => None,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

fn child_elements<'d>(element: Element<'d>) -> Vec<Element<'d>> {
    element
        .children()
        .into_iter()
        .filter_map(|child| match child {
            ChildOfElement::Element(child) => Some(child),
            _ => None,
        })
        .collect()
}

/// Verification tree, shaped like the body it checks.
#[derive(Debug, Clone, PartialEq)]
pub enum MatcherNode {
    Object(IndexMap<String, MatcherNode>),
    Array(Vec<MatcherNode>),
    Leaf(Comparison),
}

/// One piece of an interpolated template string.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Text(String),
    FromRequest(RequestRef),
}

/// A template leaf: what the producing side sends.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateValue {
    Literal(Value),
    Bytes(Vec<u8>),
    /// Resolved against the matched request when served.
    FromRequest(RequestRef),
    Interpolated(Vec<TemplatePart>),
    /// The generated test calls this method to obtain the value.
    Execute(String),
    /// Declared absent: nothing is sent.
    Omitted,
}

impl TemplateValue {
    /// The value when it needs no request to be known.
    pub fn literal(&self) -> Option<&Value> {
        match self {
            TemplateValue::Literal(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(
            self,
            TemplateValue::FromRequest(_) | TemplateValue::Interpolated(_)
        )
    }
}

/// Production tree, shaped like the body it produces.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    Object(IndexMap<String, TemplateNode>),
    Array(Vec<TemplateNode>),
    Leaf(TemplateValue),
}

impl TemplateNode {
    /// True when any leaf is resolved at serve time.
    pub fn has_deferred(&self) -> bool {
        match self {
            TemplateNode::Object(map) => map.values().any(TemplateNode::has_deferred),
            TemplateNode::Array(items) => items.iter().any(TemplateNode::has_deferred),
            TemplateNode::Leaf(value) => value.is_deferred(),
        }
    }

    /// Plain JSON for trees without deferred or omitted parts. Omitted object
    /// members are dropped.
    pub fn to_json(&self) -> Option<Value> {
        match self {
            TemplateNode::Object(map) => {
                let mut out = serde_json::Map::new();
                for (key, node) in map {
                    if matches!(node, TemplateNode::Leaf(TemplateValue::Omitted)) {
                        continue;
                    }
                    out.insert(key.clone(), node.to_json()?);
                }
                Some(Value::Object(out))
            }
            TemplateNode::Array(items) => items
                .iter()
                .map(TemplateNode::to_json)
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            TemplateNode::Leaf(value) => value.literal().cloned(),
        }
    }
}

/// The compiled pair for one body or value.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueGraph {
    pub matcher: MatcherNode,
    pub template: TemplateNode,
}
