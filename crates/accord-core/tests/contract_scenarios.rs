//! End-to-end compilation of representative contracts into stubs and test
//! assertions.

use accord_core::assertions::{BodyCheck, TestAssertion};
use accord_core::compile::{BodyMatch, Compiler};
use accord_core::contract::{Contract, ContractDocument, DocumentFormat, Request, Response};
use accord_core::matching::{by_type_within, BodyMatchers, MatchingStrategy};
use accord_core::pattern::NamedPattern;
use accord_core::stub::{Delay, StubMapping};
use accord_core::value::{DualValue, Leaf, Node};
use accord_core::ContractError;
use assert_json_diff::assert_json_eq;
use serde_json::json;

fn stub_for(contract: &Contract) -> serde_json::Value {
    let compiler = Compiler::default();
    let compiled = compiler.compile(contract).unwrap();
    StubMapping::from_compiled(&compiled, compiler.config())
        .unwrap()
        .unwrap()
        .to_json()
}

#[test]
fn test_post_with_json_body() {
    let contract = Contract::http(
        "create_user",
        Request::new("POST")
            .unwrap()
            .url("/users")
            .unwrap()
            .json_body(json!({"name": "abc"}))
            .unwrap(),
        Response::ok().json_body(json!({"id": 1})).unwrap(),
    );

    let compiled = Compiler::default().compile(&contract).unwrap();
    let http = compiled.http.as_ref().unwrap();
    let body = http.request.body.as_ref().unwrap();
    assert!(body.matcher.accepts(Some(r#"{"name": "abc"}"#)));
    assert!(!body.matcher.accepts(Some(r#"{"name": "abd"}"#)));

    assert_json_eq!(
        stub_for(&contract),
        json!({
            "name": "create_user",
            "request": {
                "method": "POST",
                "url": "/users",
                "bodyPatterns": [
                    {"matchesJsonPath": {"expression": "$.name", "equalTo": "abc"}}
                ]
            },
            "response": {"status": 200, "jsonBody": {"id": 1}}
        })
    );
}

#[test]
fn test_pattern_url_without_server_value_fails() {
    let url = DualValue::from_client(Leaf::Pattern(NamedPattern::Uuid.property()));
    let contract = Contract::http(
        "by_uuid",
        Request::new("GET").unwrap().url(url).unwrap(),
        Response::ok(),
    );
    let err = Compiler::default().compile(&contract).unwrap_err();
    assert_eq!(err.contract, "by_uuid");
    assert_eq!(err.path, "request.url");
    assert!(matches!(err.source, ContractError::MissingConcreteValue { .. }));
}

#[test]
fn test_any_uuid_in_response_body() {
    let mut fields = indexmap::IndexMap::new();
    fields.insert("id".to_string(), Node::leaf(Response::any_uuid()));
    let contract = Contract::http(
        "new_id",
        Request::new("POST").unwrap().url("/ids").unwrap(),
        Response::ok().body(Node::Object(fields)).unwrap(),
    );

    let stub = stub_for(&contract);
    let id = stub["response"]["jsonBody"]["id"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());

    let compiled = Compiler::default().compile(&contract).unwrap();
    let assertion = TestAssertion::from_compiled(&compiled).unwrap();
    let checks = assertion.response.unwrap().body;
    assert_eq!(checks.len(), 1);
    assert_eq!(checks[0].path.as_deref(), Some("$.id"));
    assert_eq!(checks[0].check["matches"], json!(NamedPattern::Uuid.source()));
    assert!(checks[0].check.get("equalTo").is_none());
}

#[test]
fn test_type_matcher_replaces_element_equality() {
    let mut matchers = BodyMatchers::new();
    matchers.json_path("$.items[*].id", by_type_within(Some(1), Some(5)).unwrap());
    let contract = Contract::http(
        "items",
        Request::new("GET").unwrap().url("/items").unwrap(),
        Response::ok()
            .json_body(json!({"items": [
                {"id": 1, "name": "a"},
                {"id": 2, "name": "b"},
                {"id": 3, "name": "c"}
            ]}))
            .unwrap()
            .body_matchers(matchers),
    );

    let compiled = Compiler::default().compile(&contract).unwrap();
    let assertion = TestAssertion::from_compiled(&compiled).unwrap();
    let checks = assertion.response.unwrap().body;

    let id_checks: Vec<&BodyCheck> = checks
        .iter()
        .filter(|check| check.path.as_deref().is_some_and(|path| path.ends_with(".id")))
        .collect();
    assert_eq!(id_checks.len(), 1);
    assert_eq!(id_checks[0].path.as_deref(), Some("$.items[*].id"));
    assert_eq!(
        id_checks[0].check,
        json!({"type": "number", "minOccurs": 1, "maxOccurs": 5})
    );
    for (index, name) in ["a", "b", "c"].iter().enumerate() {
        assert!(checks.contains(&BodyCheck {
            path: Some(format!("$.items[{index}].name")),
            check: json!({"equalTo": name}),
        }));
    }

    let body = &compiled.http.unwrap().response.body.unwrap().matcher;
    assert!(matches!(body, BodyMatch::Json(_)));
    assert!(body.accepts(Some(
        r#"{"items": [{"id": 9, "name": "a"}, {"id": 8, "name": "b"}, {"id": 7, "name": "c"}]}"#
    )));
    assert!(!body.accepts(Some(
        r#"{"items": [{"id": "x", "name": "a"}, {"id": 8, "name": "b"}, {"id": 7, "name": "c"}]}"#
    )));
}

#[test]
fn test_fixed_delay_only() {
    let contract = Contract::http(
        "slow",
        Request::new("GET").unwrap().url("/slow").unwrap(),
        Response::ok().delay(Delay::Fixed { milliseconds: 200 }),
    );
    let stub = stub_for(&contract);
    assert_eq!(stub["response"]["fixedDelayMilliseconds"], json!(200));
    assert!(stub["response"].get("delayDistribution").is_none());
}

#[test]
fn test_uniform_delay_is_a_distribution() {
    let contract = Contract::http(
        "jitter",
        Request::new("GET").unwrap().url("/jitter").unwrap(),
        Response::ok().delay(Delay::Uniform { lower: 10, upper: 50 }),
    );
    let stub = stub_for(&contract);
    assert_eq!(
        stub["response"]["delayDistribution"],
        json!({"type": "uniform", "lower": 10, "upper": 50})
    );
    assert!(stub["response"].get("fixedDelayMilliseconds").is_none());
}

#[test]
fn test_absent_paired_with_value_is_rejected() {
    let pair = DualValue::pair(
        Leaf::Strategy(MatchingStrategy::absent()),
        Leaf::Strategy(MatchingStrategy::equal_to("x")),
    );
    let err = Request::new("GET")
        .unwrap()
        .url("/flags")
        .unwrap()
        .header("X-Flag", pair)
        .unwrap_err();
    assert!(matches!(err, ContractError::AbsentConflict { .. }));

    let yaml = r#"
name: flags
request:
  method: GET
  url: /flags
  headers:
    X-Flag: {$client: {$strategy: absent}, $server: {$strategy: equalTo, $value: x}}
response:
  status: 200
"#;
    let document = ContractDocument::parse_all(yaml, DocumentFormat::Yaml)
        .unwrap()
        .remove(0);
    let err = document.into_contract().unwrap_err();
    assert_eq!(err.contract, "flags");
    assert_eq!(err.source.code(), "E104");
}

#[test]
fn test_document_to_stub() {
    let yaml = r#"
name: get_user
priority: 2
request:
  method: GET
  urlPath: {$client: {$regex: "/users/[0-9]+"}, $server: "/users/42"}
  headers:
    Accept: {$matching: application/json}
response:
  status: 200
  headers:
    Content-Type: application/json
  body:
    id: {$any: uuid}
    echo: {$fromRequest: "path"}
"#;
    let contract = ContractDocument::parse_all(yaml, DocumentFormat::Yaml)
        .unwrap()
        .remove(0)
        .into_contract()
        .unwrap();
    let stub = stub_for(&contract);
    assert_eq!(stub["priority"], json!(2));
    assert_eq!(stub["request"]["urlPathPattern"], json!("/users/[0-9]+"));
    assert_eq!(stub["response"]["transformers"], json!(["response-template"]));
    let body: serde_json::Value =
        serde_json::from_str(stub["response"]["body"].as_str().unwrap()).unwrap();
    assert_eq!(body["echo"], json!("{{{request.path}}}"));
    assert!(uuid::Uuid::parse_str(body["id"].as_str().unwrap()).is_ok());

    let compiled = Compiler::default().compile(&contract).unwrap();
    let assertion = TestAssertion::from_compiled(&compiled).unwrap();
    let request = assertion.request.unwrap();
    assert_eq!(serde_json::to_value(&request.url).unwrap(), json!("/users/42"));
    let checks = assertion.response.unwrap().body;
    assert!(checks.contains(&BodyCheck {
        path: Some("$.echo".to_string()),
        check: json!({"equalTo": "/users/42"}),
    }));
}
