//! JSON body assertions.
//!
//! Every leaf of the matcher tree becomes a path assertion and every array a
//! size assertion. Explicit body matchers then replace the derived
//! assertions at or below the nodes they select.

use crate::compile::body::{BodyMatch, JsonKind, PathAssertion, PathCheck};
use crate::compile::graph::{Comparison, MatcherNode};
use crate::error::ContractError;
use crate::matching::{BodyMatcher, MatchingType};
use crate::value::Role;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use serde_json_path::JsonPath;

static PLAIN_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid name pattern"));

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Key(String),
    Index(usize),
}

struct Derived {
    location: Vec<Segment>,
    check: PathCheck,
}

/// Render a location as a JSONPath that selects exactly that node.
fn render(location: &[Segment]) -> String {
    let mut path = String::from("$");
    for segment in location {
        match segment {
            Segment::Key(key) if PLAIN_NAME.is_match(key) => {
                path.push('.');
                path.push_str(key);
            }
            Segment::Key(key) => {
                path.push_str("['");
                for c in key.chars() {
                    match c {
                        '\'' => path.push_str("\\'"),
                        '\\' => path.push_str("\\\\"),
                        c => path.push(c),
                    }
                }
                path.push_str("']");
            }
            Segment::Index(index) => path.push_str(&format!("[{}]", index)),
        }
    }
    path
}

fn derive(node: &MatcherNode, location: &mut Vec<Segment>, out: &mut Vec<Derived>) {
    match node {
        MatcherNode::Object(map) => {
            for (key, child) in map {
                location.push(Segment::Key(key.clone()));
                derive(child, location, out);
                location.pop();
            }
        }
        MatcherNode::Array(items) => {
            out.push(Derived {
                location: location.clone(),
                check: PathCheck::Size(items.len()),
            });
            for (index, child) in items.iter().enumerate() {
                location.push(Segment::Index(index));
                derive(child, location, out);
                location.pop();
            }
        }
        MatcherNode::Leaf(comparison) => out.push(Derived {
            location: location.clone(),
            check: PathCheck::Compare(comparison.clone()),
        }),
    }
}

/// True when the node at `location`, or one of its ancestors, is selected.
fn covered(view: &Value, location: &[Segment], selected: &[&Value]) -> bool {
    let hit = |node: &Value| selected.iter().any(|s| std::ptr::eq(*s, node));
    let mut current = view;
    if hit(current) {
        return true;
    }
    for segment in location {
        let next = match segment {
            Segment::Key(key) => current.get(key),
            Segment::Index(index) => current.get(*index),
        };
        match next {
            Some(node) if hit(node) => return true,
            Some(node) => current = node,
            None => return false,
        }
    }
    false
}

/// The node at `location`, if the view has one.
fn resolve<'a>(view: &'a Value, location: &[Segment]) -> Option<&'a Value> {
    location.iter().try_fold(view, |current, segment| match segment {
        Segment::Key(key) => current.get(key),
        Segment::Index(index) => current.get(*index),
    })
}

/// The location of `target` inside `view`, found by identity.
fn locate(view: &Value, target: &Value) -> Option<Vec<Segment>> {
    if std::ptr::eq(view, target) {
        return Some(Vec::new());
    }
    let prepend = |segment: Segment, mut rest: Vec<Segment>| {
        rest.insert(0, segment);
        rest
    };
    match view {
        Value::Object(map) => map.iter().find_map(|(key, child)| {
            locate(child, target).map(|rest| prepend(Segment::Key(key.clone()), rest))
        }),
        Value::Array(items) => items.iter().enumerate().find_map(|(index, child)| {
            locate(child, target).map(|rest| prepend(Segment::Index(index), rest))
        }),
        _ => None,
    }
}

/// Arrays whose elements a bounded type matcher counts: `$.a[*].b` counts
/// the elements of `$.a`.
fn counted_arrays<'a>(matcher: &BodyMatcher, view: &'a Value) -> Vec<&'a Value> {
    let spec = matcher.spec();
    let bounded = spec.min_occurs().is_some() || spec.max_occurs().is_some();
    if spec.matching_type() != MatchingType::Type || !bounded {
        return Vec::new();
    }
    let Some((array, _)) = matcher.path().rsplit_once("[*]") else {
        return Vec::new();
    };
    match JsonPath::parse(array) {
        Ok(path) => path.query(view).all(),
        Err(_) => Vec::new(),
    }
}

/// Matchers allowed to select nothing in the example: the real response is
/// checked by the generated test.
fn may_be_unreachable(matching_type: MatchingType, role: Role) -> bool {
    role == Role::Response
        && matches!(
            matching_type,
            MatchingType::Null | MatchingType::Command | MatchingType::Type
        )
}

fn explicit_check(matcher: &BodyMatcher, selected: &[&Value]) -> Result<PathCheck, ContractError> {
    let spec = matcher.spec();
    Ok(match spec.matching_type() {
        MatchingType::Equality => PathCheck::Compare(Comparison::EqualTo(
            selected.first().map(|v| (*v).clone()).unwrap_or(Value::Null),
        )),
        MatchingType::Regex | MatchingType::Date | MatchingType::Time | MatchingType::Timestamp => {
            let pattern = spec.pattern().ok_or_else(|| {
                ContractError::UnsupportedMatcher(format!("{:?} without a pattern", spec.matching_type()))
            })?;
            PathCheck::Compare(Comparison::Matching(pattern))
        }
        MatchingType::Type => PathCheck::Type {
            kind: selected
                .first()
                .map(|v| JsonKind::of(v))
                .filter(|kind| *kind != JsonKind::Null),
            min: spec.min_occurs(),
            max: spec.max_occurs(),
        },
        MatchingType::Null => PathCheck::Null,
        MatchingType::Command => PathCheck::Command(spec.value().unwrap_or_default().to_string()),
    })
}

/// Build the assertions for a JSON body. `view` is the concrete body the
/// producing side sends; explicit matchers are resolved against it.
pub(crate) fn json_assertions(
    matcher: &MatcherNode,
    view: &Value,
    matchers: &[&BodyMatcher],
    role: Role,
) -> Result<BodyMatch, ContractError> {
    let mut derived = Vec::new();
    derive(matcher, &mut Vec::new(), &mut derived);

    let mut explicit: Vec<PathAssertion> = Vec::new();
    for body_matcher in matchers {
        let path = JsonPath::parse(body_matcher.path()).map_err(|e| {
            ContractError::InvalidDocument(format!("invalid JSONPath [{}]: {}", body_matcher.path(), e))
        })?;
        let selected = path.query(view).all();
        if selected.is_empty() && !may_be_unreachable(body_matcher.matching_type(), role) {
            return Err(ContractError::UnreachablePath {
                path: body_matcher.path().to_string(),
            });
        }
        derived.retain(|d| !covered(view, &d.location, &selected));

        let counted = counted_arrays(body_matcher, view);
        derived.retain(|d| {
            !(matches!(d.check, PathCheck::Size(_))
                && resolve(view, &d.location)
                    .is_some_and(|node| counted.iter().any(|array| std::ptr::eq(*array, node))))
        });

        // Equality over several nodes holds each one to its own example value.
        let assertions = if body_matcher.matching_type() == MatchingType::Equality && selected.len() > 1 {
            selected
                .iter()
                .map(|node| {
                    let location = locate(view, node).unwrap_or_default();
                    PathAssertion::new(render(&location), PathCheck::Compare(Comparison::EqualTo((*node).clone())))
                })
                .collect()
        } else {
            vec![PathAssertion::new(body_matcher.path(), explicit_check(body_matcher, &selected)?)]
        };
        for assertion in assertions {
            if !explicit.contains(&assertion) {
                explicit.push(assertion);
            }
        }
    }

    let only_sizes = derived.iter().all(|d| matches!(d.check, PathCheck::Size(_)));
    if explicit.is_empty() && only_sizes {
        return Ok(BodyMatch::Whole(Comparison::EqualToJson(view.clone())));
    }

    let mut assertions: Vec<PathAssertion> = derived
        .into_iter()
        .map(|d| PathAssertion::new(render(&d.location), d.check))
        .collect();
    assertions.extend(explicit);
    Ok(BodyMatch::Json(assertions))
}
