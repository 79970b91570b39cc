//! Test assertions: what a generated test sends and what it expects back.
//!
//! The tree serializes to JSON for test generators. [`verify_response`]
//! runs the same checks directly against a rendered response.

use crate::compile::{
    BodyMatch, CompiledBody, CompiledContract, CompiledEntry, CompiledInput, CompiledOutput,
    CompiledRequest, CompiledResponse, Comparison, PartTemplate, PathAssertion, PathCheck,
    TemplateNode, TemplatePart, TemplateValue,
};
use crate::error::{CompileError, ContractError};
use crate::serve::ServedResponse;
use crate::stub::{comparison_json, handlebars};
use crate::value::text_of;
use base64::Engine;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value};

/// Assertions for one contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestAssertion {
    pub name: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub ignored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestToSend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ExpectedResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messaging: Option<MessageAssertion>,
}

/// A value the test sends: concrete, or obtained by calling a method.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SentValue {
    Value(Value),
    Execute { execute: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestToSend {
    pub method: SentValue,
    pub url: SentValue,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub query: IndexMap<String, SentValue>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, SentValue>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub cookies: IndexMap<String, SentValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<SentValue>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub multipart: IndexMap<String, Value>,
}

/// One check on a body, at a path or on the whole body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyCheck {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub check: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedResponse {
    pub status: Value,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, Value>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub cookies: IndexMap<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub body: Vec<BodyCheck>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_async: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageToSend {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_from: Option<SentValue>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, SentValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<SentValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedMessage {
    pub sent_to: Value,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub body: Vec<BodyCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assert_that: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageAssertion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send: Option<MessageToSend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assert_that: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expect: Option<ExpectedMessage>,
}

impl TestAssertion {
    pub fn from_compiled(compiled: &CompiledContract) -> Result<TestAssertion, CompileError> {
        let fail = |path: &'static str| {
            let contract = compiled.name.clone();
            move |e: ContractError| e.at(contract, path)
        };
        let (request, response) = match &compiled.http {
            Some(http) => (
                Some(request_to_send(&http.request).map_err(fail("request"))?),
                Some(expected_response(&http.response)),
            ),
            None => (None, None),
        };
        let messaging = compiled.messaging.as_ref().map(|messaging| {
            let input = messaging.input.as_ref();
            MessageAssertion {
                triggered_by: input.and_then(|input| input.triggered_by.clone()),
                send: input.and_then(message_to_send),
                assert_that: input.and_then(|input| input.assert_that.clone()),
                expect: messaging.output.as_ref().map(expected_message),
            }
        });
        Ok(TestAssertion {
            name: compiled.name.clone(),
            ignored: compiled.ignored,
            request,
            response,
            messaging,
        })
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A check as JSON: stub-style matchers, plus `execute` for commands.
pub fn check_json(comparison: &Comparison) -> Value {
    match comparison {
        Comparison::Command(command) => json!({"execute": command}),
        other => comparison_json(other).unwrap_or(Value::Null),
    }
}

fn sent(template: &TemplateValue) -> Option<SentValue> {
    Some(match template {
        TemplateValue::Literal(value) => SentValue::Value(value.clone()),
        TemplateValue::Bytes(bytes) => {
            SentValue::Value(json!({"base64": base64::engine::general_purpose::STANDARD.encode(bytes)}))
        }
        TemplateValue::Execute(command) => SentValue::Execute {
            execute: command.clone(),
        },
        TemplateValue::FromRequest(reference) => SentValue::Value(Value::String(handlebars(reference))),
        TemplateValue::Interpolated(parts) => SentValue::Value(Value::String(
            parts
                .iter()
                .map(|part| match part {
                    TemplatePart::Text(text) => text.clone(),
                    TemplatePart::FromRequest(reference) => handlebars(reference),
                })
                .collect(),
        )),
        TemplateValue::Omitted => return None,
    })
}

fn sent_entries(entries: &[CompiledEntry]) -> IndexMap<String, SentValue> {
    entries
        .iter()
        .filter_map(|entry| sent(&entry.value.template).map(|value| (entry.name.clone(), value)))
        .collect()
}

fn sent_body(body: &CompiledBody) -> Option<SentValue> {
    match &body.template {
        TemplateNode::Leaf(value) => sent(value),
        tree => match tree.to_json() {
            Some(json) => Some(SentValue::Value(json)),
            None => Some(SentValue::Value(sent_tree(tree))),
        },
    }
}

/// A body tree with commands left as `{"execute": ...}` markers.
fn sent_tree(tree: &TemplateNode) -> Value {
    match tree {
        TemplateNode::Object(fields) => Value::Object(
            fields
                .iter()
                .filter(|(_, node)| !matches!(node, TemplateNode::Leaf(TemplateValue::Omitted)))
                .map(|(key, node)| (key.clone(), sent_tree(node)))
                .collect(),
        ),
        TemplateNode::Array(items) => Value::Array(items.iter().map(sent_tree).collect()),
        TemplateNode::Leaf(value) => match sent(value) {
            Some(SentValue::Value(value)) => value,
            Some(SentValue::Execute { execute }) => json!({"execute": execute}),
            None => Value::Null,
        },
    }
}

fn request_to_send(request: &CompiledRequest) -> Result<RequestToSend, ContractError> {
    let required = |template: &TemplateValue, what: &str| {
        sent(template).ok_or_else(|| ContractError::InvalidDocument(format!("{what} cannot be absent")))
    };
    let multipart = request
        .multipart
        .iter()
        .map(|part| {
            let value = match &part.template {
                PartTemplate::Param(value) => json!(sent(value)),
                PartTemplate::File {
                    filename,
                    content,
                    content_type,
                } => json!({
                    "filename": sent(filename),
                    "content": sent(content),
                    "contentType": content_type.as_ref().and_then(sent),
                }),
            };
            (part.name.clone(), value)
        })
        .collect();
    Ok(RequestToSend {
        method: required(&request.method.template, "method")?,
        url: required(&request.url.value.template, "url")?,
        query: sent_entries(&request.url.query),
        headers: sent_entries(&request.headers),
        cookies: sent_entries(&request.cookies),
        body: request.body.as_ref().and_then(sent_body),
        multipart,
    })
}

fn checks(entries: &[CompiledEntry]) -> IndexMap<String, Value> {
    entries
        .iter()
        .map(|entry| (entry.name.clone(), check_json(&entry.value.matcher)))
        .collect()
}

fn path_check(assertion: &PathAssertion) -> BodyCheck {
    let check = match &assertion.check {
        PathCheck::Compare(comparison) => check_json(comparison),
        PathCheck::Type { kind, min, max } => {
            let mut check = json!({"type": kind.map(|kind| kind.name())});
            if let Some(min) = min {
                check["minOccurs"] = json!(min);
            }
            if let Some(max) = max {
                check["maxOccurs"] = json!(max);
            }
            check
        }
        PathCheck::Null => json!({"null": true}),
        PathCheck::Command(command) => json!({"execute": command}),
        PathCheck::Size(size) => json!({"size": size}),
    };
    BodyCheck {
        path: Some(assertion.path.clone()),
        check,
    }
}

fn body_checks(body: &CompiledBody) -> Vec<BodyCheck> {
    match &body.matcher {
        BodyMatch::Whole(comparison) => vec![BodyCheck {
            path: None,
            check: check_json(comparison),
        }],
        other => other.assertions().iter().map(path_check).collect(),
    }
}

fn expected_response(response: &CompiledResponse) -> ExpectedResponse {
    ExpectedResponse {
        status: check_json(&response.status.matcher),
        headers: checks(&response.headers),
        cookies: checks(&response.cookies),
        body: response.body.as_ref().map(body_checks).unwrap_or_default(),
        is_async: response.is_async,
    }
}

fn message_to_send(input: &CompiledInput) -> Option<MessageToSend> {
    if input.message_from.is_none() && input.body.is_none() {
        return None;
    }
    Some(MessageToSend {
        message_from: input.message_from.as_ref().and_then(|from| sent(&from.template)),
        headers: sent_entries(&input.headers),
        body: input.body.as_ref().and_then(sent_body),
    })
}

fn expected_message(output: &CompiledOutput) -> ExpectedMessage {
    ExpectedMessage {
        sent_to: check_json(&output.sent_to.matcher),
        headers: checks(&output.headers),
        body: output.body.as_ref().map(body_checks).unwrap_or_default(),
        assert_that: output.assert_that.clone(),
    }
}

/// Check a response the way a generated test would. Returns one message per
/// failed check; commands are left to the test and never fail here.
pub fn verify_response(expected: &CompiledResponse, actual: &ServedResponse) -> Vec<String> {
    let mut failures = Vec::new();
    let mut check = |what: String, comparison: &Comparison, value: Option<&str>| {
        if !matches!(comparison, Comparison::Command(_)) && !comparison.accepts_text(value) {
            failures.push(format!("{what}: expected {}, got {value:?}", check_json(comparison)));
        }
    };

    check("status".to_string(), &expected.status.matcher, Some(&actual.status.to_string()));
    for header in &expected.headers {
        check(format!("header {}", header.name), &header.value.matcher, actual.header(&header.name));
    }
    for cookie in &expected.cookies {
        let sent = actual
            .headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case("Set-Cookie"))
            .filter_map(|(_, value)| value.split_once('='))
            .find(|(name, _)| *name == cookie.name)
            .map(|(_, value)| value.split(';').next().unwrap_or(value));
        check(format!("cookie {}", cookie.name), &cookie.value.matcher, sent);
    }

    if let Some(body) = &expected.body {
        let accepted = match (&body.matcher, &actual.bytes) {
            (BodyMatch::Whole(Comparison::BinaryEqualTo(bytes)), Some(actual)) => bytes == actual,
            (BodyMatch::Whole(Comparison::Command(_)), _) => true,
            (matcher, _) => matcher.accepts(actual.body.as_deref()),
        };
        if !accepted {
            failures.push(format!("body: got {:?}", actual.body.as_deref().map(text_of_body)));
        }
    }
    failures
}

fn text_of_body(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .map(|json| text_of(&json))
        .unwrap_or_else(|_| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::Compiler;
    use crate::contract::{Contract, Request, Response};
    use crate::matching::{by_command, by_type_within, BodyMatchers};
    use crate::pattern::NamedPattern;
    use crate::serve::render_response;
    use crate::value::{Leaf, Node};
    use assert_json_diff::assert_json_eq;
    use indexmap::IndexMap;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn contract() -> Contract {
        let mut matchers = BodyMatchers::new();
        matchers
            .json_path("$.tags", by_type_within(Some(1), Some(3)).unwrap())
            .json_path("$.id", by_command("assertId($it)"));
        Contract::http(
            "get_user",
            Request::new("GET")
                .unwrap()
                .url("/users/1")
                .unwrap()
                .header("Accept", "application/json")
                .unwrap(),
            Response::ok()
                .header("Content-Type", "application/json")
                .unwrap()
                .json_body(json!({"id": 1, "name": "Ann", "tags": ["a", "b"]}))
                .unwrap()
                .body_matchers(matchers),
        )
    }

    #[test]
    fn test_assertion_tree() {
        let compiled = Compiler::default().compile(&contract()).unwrap();
        let assertion = TestAssertion::from_compiled(&compiled).unwrap();
        let request = serde_json::to_value(assertion.request.as_ref().unwrap()).unwrap();
        assert_json_eq!(
            request,
            json!({"method": "GET", "url": "/users/1", "headers": {"Accept": "application/json"}})
        );
        let response = assertion.response.unwrap();
        assert_eq!(response.status, json!({"equalTo": "200"}));
        assert!(response.body.contains(&BodyCheck {
            path: Some("$.name".to_string()),
            check: json!({"equalTo": "Ann"}),
        }));
        assert!(response.body.contains(&BodyCheck {
            path: Some("$.id".to_string()),
            check: json!({"execute": "assertId($it)"}),
        }));
        assert!(response.body.contains(&BodyCheck {
            path: Some("$.tags".to_string()),
            check: json!({"type": "array", "minOccurs": 1, "maxOccurs": 3}),
        }));
    }

    #[test]
    fn test_execute_in_request() {
        let contract = Contract::http(
            "token",
            Request::new("GET")
                .unwrap()
                .url("/token")
                .unwrap()
                .header(
                    "Authorization",
                    crate::value::DualValue::pair(
                        Leaf::from("Bearer abc"),
                        Leaf::Execute("token()".to_string()),
                    ),
                )
                .unwrap(),
            Response::ok(),
        );
        let compiled = Compiler::default().compile(&contract).unwrap();
        let assertion = TestAssertion::from_compiled(&compiled).unwrap();
        let headers = &assertion.request.unwrap().headers;
        assert_eq!(
            headers["Authorization"],
            SentValue::Execute {
                execute: "token()".to_string()
            }
        );
    }

    #[test]
    fn test_stub_response_satisfies_test_checks() {
        let mut fields = IndexMap::new();
        fields.insert("id".to_string(), Node::leaf(Response::any(NamedPattern::Uuid)));
        fields.insert("email".to_string(), Node::leaf(Response::any(NamedPattern::Email)));
        let contract = Contract::http(
            "agreement",
            Request::new("GET").unwrap().url("/me").unwrap(),
            Response::ok().body(Node::Object(fields)).unwrap(),
        );
        let compiled = Compiler::default().compile(&contract).unwrap().http.unwrap();
        let request = compiled.request.served().unwrap();
        let rendered = render_response(&compiled.response, &request, &mut StdRng::seed_from_u64(3));
        assert_eq!(verify_response(&compiled.response, &rendered), Vec::<String>::new());

        let wrong = crate::serve::ServedResponse {
            status: 500,
            body: Some(r#"{"id": "x", "email": "nope"}"#.to_string()),
            ..Default::default()
        };
        assert_eq!(verify_response(&compiled.response, &wrong).len(), 2);
    }
}
