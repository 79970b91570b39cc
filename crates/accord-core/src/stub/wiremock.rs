//! WireMock stub mappings rendered from compiled contracts.

use crate::compile::{
    BodyMatch, CompiledBody, CompiledContract, CompiledEntry, CompiledRequest, CompiledResponse,
    CompiledUrl, Comparison, PathAssertion, PathCheck, TemplateNode, TemplatePart, TemplateValue,
    UrlKind,
};
use crate::config::CompilerConfig;
use crate::error::{CompileError, ContractError};
use crate::stub::{Delay, StubOverrides};
use crate::value::{text_of, RequestRef};
use base64::Engine;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StubMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub request: RequestPattern,
    pub response: ResponseDefinition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_scenario_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_scenario_state: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub metadata: IndexMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPattern {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_path_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub query_parameters: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub cookies: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body_patterns: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDefinition {
    pub status: u16,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_delay_milliseconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_distribution: Option<Delay>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transformers: Vec<String>,
}

impl StubMapping {
    /// Render the stub for an HTTP contract. Ignored contracts and messaging
    /// contracts have none.
    pub fn from_compiled(
        compiled: &CompiledContract,
        config: &CompilerConfig,
    ) -> Result<Option<StubMapping>, CompileError> {
        if compiled.ignored {
            debug!(contract = %compiled.name, "skipping stub for ignored contract");
            return Ok(None);
        }
        let Some(http) = &compiled.http else {
            return Ok(None);
        };
        let fail = |path: &str| {
            let contract = compiled.name.clone();
            let path = path.to_string();
            move |e: ContractError| e.at(contract, path)
        };

        let mut mapping = StubMapping {
            name: Some(compiled.name.clone()),
            request: request_pattern(&http.request).map_err(fail("request"))?,
            response: response_definition(&http.response, config).map_err(fail("response"))?,
            priority: compiled.priority,
            ..StubMapping::default()
        };
        if let Some(step) = &compiled.scenario {
            mapping.scenario_name = Some(step.scenario_name());
            mapping.required_scenario_state = Some(step.required_state());
            mapping.new_scenario_state = step.new_state();
        }
        if let Some(overrides) =
            StubOverrides::from_metadata(&compiled.metadata).map_err(fail("metadata"))?
        {
            overrides.apply(&mut mapping).map_err(fail("metadata"))?;
        }
        Ok(Some(mapping))
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// The WireMock matcher object for one comparison.
pub fn comparison_json(comparison: &Comparison) -> Result<Value, ContractError> {
    Ok(match comparison {
        Comparison::EqualTo(value) => json!({"equalTo": text_of(value)}),
        Comparison::Contains(part) => json!({"contains": part}),
        Comparison::Matching(pattern) => json!({"matches": pattern.as_str()}),
        Comparison::NotMatching(pattern) => json!({"doesNotMatch": pattern.as_str()}),
        Comparison::EqualToJson(value) => json!({"equalToJson": value}),
        Comparison::EqualToXml(xml) => json!({"equalToXml": xml}),
        Comparison::BinaryEqualTo(bytes) => {
            json!({"binaryEqualTo": base64::engine::general_purpose::STANDARD.encode(bytes)})
        }
        Comparison::Absent => json!({"absent": true}),
        Comparison::Command(command) => {
            return Err(ContractError::UnsupportedMatcher(format!(
                "command [{command}] cannot be checked by a stub"
            )))
        }
    })
}

/// Handlebars expression reading a value from the request being served.
pub fn handlebars(reference: &RequestRef) -> String {
    match reference {
        RequestRef::Url => "{{{request.url}}}".to_string(),
        RequestRef::Path => "{{{request.path}}}".to_string(),
        RequestRef::PathSegment(index) => format!("{{{{{{request.path.[{index}]}}}}}}"),
        RequestRef::Query { name, index } => {
            format!("{{{{{{request.query.{name}.[{index}]}}}}}}")
        }
        RequestRef::Header { name, index } => {
            format!("{{{{{{request.headers.{name}.[{index}]}}}}}}")
        }
        RequestRef::Cookie(name) => format!("{{{{{{request.cookies.{name}}}}}}}"),
        RequestRef::Body => "{{{request.body}}}".to_string(),
        RequestRef::BodyPath(path) => format!("{{{{{{jsonPath request.body '{path}'}}}}}}"),
    }
}

/// Entries keyed by name. A name given several times needs each of its
/// matchers satisfied by one of the sent values.
fn entries_json(entries: &[CompiledEntry]) -> Result<IndexMap<String, Value>, ContractError> {
    let mut grouped: IndexMap<String, Vec<Value>> = IndexMap::new();
    for entry in entries {
        grouped
            .entry(entry.name.clone())
            .or_default()
            .push(comparison_json(&entry.value.matcher)?);
    }
    Ok(grouped
        .into_iter()
        .map(|(name, mut matchers)| {
            let matcher = if matchers.len() == 1 {
                matchers.remove(0)
            } else {
                json!({"includes": matchers})
            };
            (name, matcher)
        })
        .collect())
}

fn request_pattern(request: &CompiledRequest) -> Result<RequestPattern, ContractError> {
    let method = match &request.method.matcher {
        Comparison::EqualTo(value) => text_of(value).to_uppercase(),
        other => {
            warn!(matcher = ?other, "method can only be matched exactly, stub accepts any method");
            "ANY".to_string()
        }
    };
    let mut pattern = RequestPattern {
        method: Some(method),
        query_parameters: entries_json(&request.url.query)?,
        headers: entries_json(&request.headers)?,
        cookies: entries_json(&request.cookies)?,
        ..RequestPattern::default()
    };
    set_url(&mut pattern, &request.url)?;

    if let Some(body) = &request.body {
        pattern.body_patterns = body_patterns(body)?;
    }
    for part in &request.multipart {
        pattern
            .body_patterns
            .push(json!({"matches": part.matcher.as_str()}));
    }
    Ok(pattern)
}

fn set_url(pattern: &mut RequestPattern, url: &CompiledUrl) -> Result<(), ContractError> {
    // A full URL with separately matched query parameters is matched by path.
    let by_path = url.kind == UrlKind::Path || !url.query.is_empty();
    match (&url.value.matcher, by_path) {
        (Comparison::EqualTo(value), true) => pattern.url_path = Some(text_of(value)),
        (Comparison::EqualTo(value), false) => pattern.url = Some(text_of(value)),
        (Comparison::Matching(regex), true) => pattern.url_path_pattern = Some(regex.as_str().to_string()),
        (Comparison::Matching(regex), false) => pattern.url_pattern = Some(regex.as_str().to_string()),
        (other, _) => {
            return Err(ContractError::UnsupportedMatcher(format!(
                "url cannot be matched by {other:?}"
            )))
        }
    }
    Ok(())
}

pub(crate) fn body_patterns(body: &CompiledBody) -> Result<Vec<Value>, ContractError> {
    match &body.matcher {
        BodyMatch::Whole(comparison) => Ok(vec![comparison_json(comparison)?]),
        BodyMatch::Json(assertions) => assertions.iter().filter_map(json_path_pattern).collect(),
        BodyMatch::Xml(assertions) => assertions.iter().filter_map(xpath_pattern).collect(),
    }
}

/// Split `$.a.b` into `$.a` and `b` so size and null checks can be written
/// as filters on the parent.
fn split_last_field(path: &str) -> Option<(&str, &str)> {
    let (parent, field) = path.rsplit_once('.')?;
    let plain = !field.is_empty()
        && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    plain.then_some((parent, field))
}

/// A Jayway filter applying `conditions` to the node at `path`, written on
/// its parent. `None` when the last segment is not a plain field.
fn filter_on_parent(path: &str, conditions: &[String]) -> Option<String> {
    let (parent, target) = if path == "$" {
        ("$", "@".to_string())
    } else {
        let (parent, field) = split_last_field(path)?;
        (parent, format!("@.{field}"))
    };
    let conditions: Vec<String> = conditions.iter().map(|c| format!("{target}{c}")).collect();
    Some(format!("{parent}[?({})]", conditions.join(" && ")))
}

fn json_path_pattern(assertion: &PathAssertion) -> Option<Result<Value, ContractError>> {
    let path = assertion.path.as_str();
    Some(Ok(match &assertion.check {
        PathCheck::Compare(Comparison::EqualTo(value @ (Value::Object(_) | Value::Array(_)))) => {
            json!({"matchesJsonPath": {"expression": path, "equalToJson": value}})
        }
        PathCheck::Compare(comparison) => {
            let mut matcher = match comparison_json(comparison) {
                Ok(Value::Object(matcher)) => matcher,
                Ok(_) => Map::new(),
                Err(e) => return Some(Err(e)),
            };
            matcher.insert("expression".to_string(), json!(path));
            json!({"matchesJsonPath": matcher})
        }
        PathCheck::Size(size) => match filter_on_parent(path, &[format!(".size() == {size}")]) {
            Some(filter) => json!({"matchesJsonPath": filter}),
            None => json!({"matchesJsonPath": {
                "expression": format!("{path}.size()"),
                "equalTo": size.to_string()
            }}),
        },
        PathCheck::Type { min, max, .. } => {
            let mut conditions = Vec::new();
            if let Some(min) = min {
                conditions.push(format!(".size() >= {min}"));
            }
            if let Some(max) = max {
                conditions.push(format!(".size() <= {max}"));
            }
            // Occurrences of `$.a[*].b` are counted on the array `$.a`.
            let counted = path.rsplit_once("[*]").map_or(path, |(array, _)| array);
            match filter_on_parent(counted, &conditions) {
                Some(filter) if !conditions.is_empty() => json!({"matchesJsonPath": filter}),
                _ => json!({"matchesJsonPath": path}),
            }
        }
        PathCheck::Null => match filter_on_parent(path, &[" == null".to_string()]) {
            Some(filter) => json!({"matchesJsonPath": filter}),
            None => json!({"matchesJsonPath": path}),
        },
        PathCheck::Command(_) => return None,
    }))
}

fn xpath_pattern(assertion: &PathAssertion) -> Option<Result<Value, ContractError>> {
    let path = assertion.path.as_str();
    Some(Ok(match &assertion.check {
        PathCheck::Compare(comparison) => {
            let mut matcher = match comparison_json(comparison) {
                Ok(Value::Object(matcher)) => matcher,
                Ok(_) => Map::new(),
                Err(e) => return Some(Err(e)),
            };
            matcher.insert("expression".to_string(), json!(path));
            json!({"matchesXPath": matcher})
        }
        PathCheck::Command(_) => return None,
        _ => json!({"matchesXPath": path}),
    }))
}

fn response_definition(
    response: &CompiledResponse,
    config: &CompilerConfig,
) -> Result<ResponseDefinition, ContractError> {
    let status = match &response.status.template {
        TemplateValue::Literal(value) => text_of(value).parse::<u16>().ok(),
        _ => None,
    }
    .ok_or_else(|| ContractError::InvalidDocument("status must be a number".to_string()))?;

    let mut definition = ResponseDefinition {
        status,
        ..ResponseDefinition::default()
    };
    for header in &response.headers {
        if let Some(value) = template_text(&header.value.template) {
            definition.headers.insert(header.name.clone(), Value::String(value));
        }
    }
    let cookies: Vec<String> = response
        .cookies
        .iter()
        .filter_map(|cookie| {
            template_text(&cookie.value.template).map(|value| format!("{}={}", cookie.name, value))
        })
        .collect();
    match cookies.as_slice() {
        [] => {}
        [single] => {
            definition.headers.insert("Set-Cookie".to_string(), json!(single));
        }
        many => {
            definition.headers.insert("Set-Cookie".to_string(), json!(many));
        }
    }

    if let Some(body) = &response.body {
        set_body(&mut definition, &body.template);
    }

    match &response.delay {
        Some(Delay::Fixed { milliseconds }) => definition.fixed_delay_milliseconds = Some(*milliseconds),
        Some(other) => definition.delay_distribution = Some(other.clone()),
        None => {}
    }
    if config.response_templating && response.is_templated() {
        definition.transformers.push("response-template".to_string());
    }
    Ok(definition)
}

/// Text of a template leaf, with request references as handlebars
/// expressions. Omitted values have none.
fn template_text(template: &TemplateValue) -> Option<String> {
    match template {
        TemplateValue::Literal(value) => Some(text_of(value)),
        TemplateValue::Bytes(bytes) => Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
        TemplateValue::FromRequest(reference) => Some(handlebars(reference)),
        TemplateValue::Interpolated(parts) => Some(
            parts
                .iter()
                .map(|part| match part {
                    TemplatePart::Text(text) => text.clone(),
                    TemplatePart::FromRequest(reference) => handlebars(reference),
                })
                .collect(),
        ),
        TemplateValue::Execute(_) | TemplateValue::Omitted => None,
    }
}

/// JSON with deferred leaves as handlebars strings.
fn templated_json(template: &TemplateNode) -> Value {
    match template {
        TemplateNode::Object(fields) => Value::Object(
            fields
                .iter()
                .filter_map(|(key, node)| match node {
                    TemplateNode::Leaf(TemplateValue::Omitted) => None,
                    node => Some((key.clone(), templated_json(node))),
                })
                .collect(),
        ),
        TemplateNode::Array(items) => Value::Array(items.iter().map(templated_json).collect()),
        TemplateNode::Leaf(TemplateValue::Literal(value)) => value.clone(),
        TemplateNode::Leaf(other) => template_text(other).map(Value::String).unwrap_or(Value::Null),
    }
}

fn set_body(definition: &mut ResponseDefinition, template: &TemplateNode) {
    match template {
        TemplateNode::Leaf(TemplateValue::Omitted) => {}
        TemplateNode::Leaf(TemplateValue::Literal(Value::String(text))) => {
            definition.body = Some(text.clone())
        }
        TemplateNode::Leaf(TemplateValue::Literal(value)) => definition.json_body = Some(value.clone()),
        TemplateNode::Leaf(TemplateValue::Bytes(bytes)) => {
            definition.base64_body = Some(base64::engine::general_purpose::STANDARD.encode(bytes))
        }
        TemplateNode::Leaf(other) => definition.body = template_text(other),
        structured if structured.has_deferred() => {
            definition.body = Some(templated_json(structured).to_string())
        }
        structured => definition.json_body = structured.to_json(),
    }
}
