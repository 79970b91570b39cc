//! XML body assertions: one XPath per text node and attribute.

use crate::compile::body::{BodyMatch, PathAssertion, PathCheck};
use crate::compile::graph::Comparison;
use crate::error::ContractError;
use crate::matching::{BodyMatcher, MatchingType};
use crate::value::Role;
use serde_json::Value;
use sxd_document::dom::{ChildOfElement, ChildOfRoot, Document, Element};
use sxd_document::parser;
use sxd_xpath::evaluate_xpath;
use std::collections::HashMap;

/// Texts selected by an XPath expression, `None` when it fails to evaluate.
pub(crate) fn select(document: &Document<'_>, path: &str) -> Option<Vec<String>> {
    match evaluate_xpath(document, path) {
        Ok(sxd_xpath::Value::Nodeset(nodes)) => {
            Some(nodes.document_order().iter().map(|node| node.string_value()).collect())
        }
        Ok(sxd_xpath::Value::String(text)) => Some(vec![text]),
        Ok(sxd_xpath::Value::Number(n)) if n.fract() == 0.0 => Some(vec![format!("{}", n as i64)]),
        Ok(sxd_xpath::Value::Number(n)) => Some(vec![n.to_string()]),
        Ok(sxd_xpath::Value::Boolean(b)) => Some(vec![b.to_string()]),
        Err(_) => None,
    }
}

/// Derived assertions, or `None` when the document uses namespaces.
fn derive(document: &Document<'_>) -> Option<Vec<PathAssertion>> {
    let mut out = Vec::new();
    for child in document.root().children() {
        if let ChildOfRoot::Element(element) = child {
            let name = local_name(element)?;
            walk(element, &format!("/{}", name), &mut out)?;
        }
    }
    Some(out)
}

fn local_name(element: Element<'_>) -> Option<&str> {
    let name = element.name();
    match name.namespace_uri() {
        Some(_) => None,
        None => Some(name.local_part()),
    }
}

fn walk(element: Element<'_>, path: &str, out: &mut Vec<PathAssertion>) -> Option<()> {
    for attribute in element.attributes() {
        if attribute.name().namespace_uri().is_some() {
            return None;
        }
        out.push(PathAssertion::new(
            format!("{}/@{}", path, attribute.name().local_part()),
            PathCheck::Compare(Comparison::EqualTo(Value::String(attribute.value().to_string()))),
        ));
    }

    let children: Vec<Element<'_>> = element
        .children()
        .into_iter()
        .filter_map(|child| match child {
            ChildOfElement::Element(child) => Some(child),
            _ => None,
        })
        .collect();

    if children.is_empty() {
        let text: String = element
            .children()
            .into_iter()
            .filter_map(|child| match child {
                ChildOfElement::Text(text) => Some(text.text().to_string()),
                _ => None,
            })
            .collect();
        // Compared exactly as `text()` selects it.
        if !text.trim().is_empty() {
            out.push(PathAssertion::new(
                format!("{}/text()", path),
                PathCheck::Compare(Comparison::EqualTo(Value::String(text))),
            ));
        }
        return Some(());
    }

    let mut totals: HashMap<&str, usize> = HashMap::new();
    for child in &children {
        *totals.entry(local_name(*child)?).or_default() += 1;
    }
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for child in children {
        let name = local_name(child)?;
        let position = seen.entry(name).or_default();
        *position += 1;
        let child_path = if totals[name] > 1 {
            format!("{}/{}[{}]", path, name, position)
        } else {
            format!("{}/{}", path, name)
        };
        walk(child, &child_path, out)?;
    }
    Some(())
}

fn explicit_check(matcher: &BodyMatcher, texts: &[String]) -> Result<PathCheck, ContractError> {
    let spec = matcher.spec();
    Ok(match spec.matching_type() {
        MatchingType::Equality => PathCheck::Compare(Comparison::EqualTo(Value::String(
            texts.first().cloned().unwrap_or_default(),
        ))),
        MatchingType::Regex | MatchingType::Date | MatchingType::Time | MatchingType::Timestamp => {
            let pattern = spec.pattern().ok_or_else(|| {
                ContractError::UnsupportedMatcher(format!("{:?} without a pattern", spec.matching_type()))
            })?;
            PathCheck::Compare(Comparison::Matching(pattern))
        }
        MatchingType::Type => PathCheck::Type {
            kind: None,
            min: spec.min_occurs(),
            max: spec.max_occurs(),
        },
        MatchingType::Null => PathCheck::Null,
        MatchingType::Command => PathCheck::Command(spec.value().unwrap_or_default().to_string()),
    })
}

/// Build the assertions for an XML body given as text.
pub(crate) fn xml_assertions(
    xml: &str,
    matchers: &[&BodyMatcher],
    role: Role,
) -> Result<BodyMatch, ContractError> {
    let package = match parser::parse(xml) {
        Ok(package) => package,
        Err(_) if matchers.is_empty() => {
            return Ok(BodyMatch::Whole(Comparison::EqualTo(Value::String(xml.to_string()))))
        }
        Err(e) => {
            return Err(ContractError::InvalidDocument(format!(
                "XML body cannot carry matchers: {:?}",
                e
            )))
        }
    };
    let document = package.as_document();
    let Some(mut derived) = derive(&document) else {
        return Ok(BodyMatch::Whole(Comparison::EqualToXml(xml.to_string())));
    };

    let mut explicit: Vec<PathAssertion> = Vec::new();
    for matcher in matchers {
        let path = matcher.path();
        let texts = select(&document, path).ok_or_else(|| {
            ContractError::InvalidDocument(format!("invalid XPath [{}]", path))
        })?;
        let unreachable_ok = role == Role::Response
            && matches!(
                matcher.matching_type(),
                MatchingType::Null | MatchingType::Command | MatchingType::Type
            );
        if texts.is_empty() && !unreachable_ok {
            return Err(ContractError::UnreachablePath {
                path: path.to_string(),
            });
        }
        derived.retain(|d| d.path != path && !d.path.starts_with(&format!("{}/", path)));
        let assertion = PathAssertion::new(path, explicit_check(matcher, &texts)?);
        if !explicit.contains(&assertion) {
            explicit.push(assertion);
        }
    }

    if derived.is_empty() && explicit.is_empty() {
        return Ok(BodyMatch::Whole(Comparison::EqualToXml(xml.to_string())));
    }
    derived.extend(explicit);
    Ok(BodyMatch::Xml(derived))
}
