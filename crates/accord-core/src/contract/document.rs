//! JSON and YAML contract documents.
//!
//! Plain scalars are single-valued literals. Dynamic leaves are objects whose
//! keys all start with `$`:
//!
//! ```yaml
//! request:
//!   method: GET
//!   urlPath: {$client: {$regex: "/users/[0-9]+"}, $server: "/users/42"}
//!   headers:
//!     Accept: {$matching: application/json}
//! response:
//!   status: 200
//!   body:
//!     id: {$any: uuid}
//!     echo: {$fromRequest: "header:X-Trace"}
//! ```

use crate::contract::{any, any_matching, Contract, Headers, Input, Multipart, OutputMessage, Part, Request, Response};
use crate::error::{CompileError, ContractError};
use crate::matching::{BodyMatchers, MatchingStrategy, MatchingType, MatchingTypeValue, StrategyType};
use crate::pattern::{NamedPattern, RegexPattern, RegexProperty, ValueKind};
use crate::stub::Delay;
use crate::value::{client, server, value, DualValue, Fragment, Leaf, Node, RequestRef, Role, Side};
use base64::Engine;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Pick the format from a file extension. Anything but `.json` is YAML.
    pub fn from_path(path: &Path) -> DocumentFormat {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContractDocument {
    pub name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<u32>,
    #[serde(default)]
    pub ignored: bool,
    /// Position inside a scenario; contracts sharing a directory form one.
    pub order: Option<u32>,
    #[serde(default)]
    pub metadata: IndexMap<String, Value>,
    pub request: Option<RequestDocument>,
    pub response: Option<ResponseDocument>,
    pub input: Option<InputDocument>,
    pub output: Option<OutputDocument>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RequestDocument {
    pub method: Value,
    pub url: Option<Value>,
    pub url_path: Option<Value>,
    #[serde(default)]
    pub query_parameters: IndexMap<String, Value>,
    #[serde(default)]
    pub headers: IndexMap<String, Value>,
    #[serde(default)]
    pub cookies: IndexMap<String, Value>,
    pub body: Option<Value>,
    #[serde(default)]
    pub matchers: MatchersDocument,
    pub multipart: Option<IndexMap<String, Value>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResponseDocument {
    pub status: Value,
    #[serde(default)]
    pub headers: IndexMap<String, Value>,
    #[serde(default)]
    pub cookies: IndexMap<String, Value>,
    pub body: Option<Value>,
    #[serde(default)]
    pub matchers: MatchersDocument,
    pub fixed_delay_milliseconds: Option<u64>,
    pub delay_distribution: Option<Delay>,
    #[serde(default, rename = "async")]
    pub is_async: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InputDocument {
    pub triggered_by: Option<String>,
    pub message_from: Option<Value>,
    #[serde(default)]
    pub message_headers: IndexMap<String, Value>,
    pub message_body: Option<Value>,
    #[serde(default)]
    pub matchers: MatchersDocument,
    pub assert_that: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OutputDocument {
    pub sent_to: Value,
    #[serde(default)]
    pub headers: IndexMap<String, Value>,
    pub body: Option<Value>,
    #[serde(default)]
    pub matchers: MatchersDocument,
    pub assert_that: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MatchersDocument {
    #[serde(default)]
    pub body: Vec<BodyMatcherDocument>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BodyMatcherDocument {
    pub path: Option<String>,
    pub xpath: Option<String>,
    #[serde(rename = "type")]
    pub matching_type: MatchingType,
    pub value: Option<String>,
    pub min_occurrence: Option<u32>,
    pub max_occurrence: Option<u32>,
}

impl ContractDocument {
    /// Parse every document in `text`. YAML may hold several `---` separated
    /// documents; JSON may hold an object or an array of objects.
    pub fn parse_all(text: &str, format: DocumentFormat) -> Result<Vec<ContractDocument>, ContractError> {
        let invalid = |e: &dyn std::fmt::Display| ContractError::InvalidDocument(e.to_string());
        match format {
            DocumentFormat::Yaml => serde_yaml::Deserializer::from_str(text)
                .map(|document| ContractDocument::deserialize(document).map_err(|e| invalid(&e)))
                .collect(),
            DocumentFormat::Json => {
                let value: Value = serde_json::from_str(text).map_err(|e| invalid(&e))?;
                match value {
                    Value::Array(items) => items
                        .into_iter()
                        .map(|item| serde_json::from_value(item).map_err(|e| invalid(&e)))
                        .collect(),
                    single => Ok(vec![serde_json::from_value(single).map_err(|e| invalid(&e))?]),
                }
            }
        }
    }

    pub fn with_default_name(mut self, name: impl Into<String>) -> Self {
        if self.name.is_none() {
            self.name = Some(name.into());
        }
        self
    }

    /// Convert into a validated [`Contract`]. Scenario placement is left to
    /// the caller, which knows about sibling documents.
    pub fn into_contract(self) -> Result<Contract, CompileError> {
        let label = self.name.clone().unwrap_or_else(|| "unnamed".to_string());
        let at = |path: &str| {
            let label = label.clone();
            let path = path.to_string();
            move |e: ContractError| e.at(label, path)
        };

        let request = self
            .request
            .map(|doc| doc.into_request().map_err(|(path, e)| at(&path)(e)))
            .transpose()?;
        let response = self
            .response
            .map(|doc| doc.into_response().map_err(|(path, e)| at(&path)(e)))
            .transpose()?;
        let input = self
            .input
            .map(|doc| doc.into_input().map_err(|(path, e)| at(&path)(e)))
            .transpose()?;
        let output = self
            .output
            .map(|doc| doc.into_output().map_err(|(path, e)| at(&path)(e)))
            .transpose()?;

        let contract = Contract {
            name: self.name,
            description: self.description,
            priority: self.priority,
            ignored: self.ignored,
            scenario: None,
            metadata: self.metadata,
            request,
            response,
            input,
            output,
        };
        contract.validate().map_err(at(""))?;
        Ok(contract)
    }
}

type Located<T> = Result<T, (String, ContractError)>;

fn located<T>(path: impl Into<String>, result: Result<T, ContractError>) -> Located<T> {
    result.map_err(|e| (path.into(), e))
}

impl RequestDocument {
    fn into_request(self) -> Located<Request> {
        let role = Role::Request;
        let method = located("request.method", dual(&self.method, role))?;
        let mut request = located("request.method", Request::new(method))?;

        if let Some(path) = &self.url_path {
            let path = located("request.urlPath", dual(path, role))?;
            request = located("request.urlPath", request.url_path(path))?;
        } else if let Some(url) = &self.url {
            let url = located("request.url", dual(url, role))?;
            request = located("request.url", request.url(url))?;
        }
        for (name, raw) in &self.query_parameters {
            let field = format!("request.queryParameters.{name}");
            let parsed = located(&field, dual(raw, role))?;
            request = located(&field, request.query(name.clone(), parsed))?;
        }

        fill_headers(&mut request.headers, &self.headers, role, "request.headers")?;
        fill_headers(&mut request.cookies, &self.cookies, role, "request.cookies")?;

        if let Some(body) = &self.body {
            let body = located("request.body", node(body, role))?;
            request = located("request.body", request.body(body))?;
        }
        request = request.body_matchers(body_matchers(&self.matchers, "request.matchers")?);

        if let Some(parts) = &self.multipart {
            let mut multipart = Multipart::new();
            for (name, raw) in parts {
                let field = format!("request.multipart.{name}");
                multipart.insert(name.clone(), located(&field, part(raw, role))?);
            }
            request = located("request.multipart", request.multipart(multipart))?;
        }
        Ok(request)
    }
}

impl ResponseDocument {
    fn into_response(self) -> Located<Response> {
        let role = Role::Response;
        let status = located("response.status", dual(&self.status, role))?;
        let mut response = located("response.status", Response::new(status))?;

        fill_headers(&mut response.headers, &self.headers, role, "response.headers")?;
        fill_headers(&mut response.cookies, &self.cookies, role, "response.cookies")?;

        if let Some(body) = &self.body {
            let body = located("response.body", node(body, role))?;
            response = located("response.body", response.body(body))?;
        }
        response = response.body_matchers(body_matchers(&self.matchers, "response.matchers")?);

        response.delay = match (self.fixed_delay_milliseconds, self.delay_distribution) {
            (Some(_), Some(_)) => {
                return Err((
                    "response.delayDistribution".to_string(),
                    ContractError::InvalidDocument(
                        "use either a fixed delay or a delay distribution".to_string(),
                    ),
                ))
            }
            (Some(milliseconds), None) => Some(Delay::Fixed { milliseconds }),
            (None, distribution) => distribution,
        };
        response.is_async = self.is_async;
        Ok(response)
    }
}

impl InputDocument {
    fn into_input(self) -> Located<Input> {
        let role = Role::Request;
        let mut input = match (&self.message_from, self.triggered_by) {
            (Some(from), triggered_by) => {
                let from = located("input.messageFrom", dual(from, role))?;
                let mut input = located("input.messageFrom", Input::message_from(from))?;
                input.triggered_by = triggered_by;
                input
            }
            (None, Some(method)) => Input::triggered_by(method),
            (None, None) => {
                return Err((
                    "input".to_string(),
                    ContractError::InvalidDocument(
                        "an input needs triggeredBy or messageFrom".to_string(),
                    ),
                ))
            }
        };
        fill_headers(&mut input.headers, &self.message_headers, role, "input.messageHeaders")?;
        if let Some(body) = &self.message_body {
            let body = located("input.messageBody", node(body, role))?;
            input = located("input.messageBody", input.body(body))?;
        }
        input.body_matchers = body_matchers(&self.matchers, "input.matchers")?;
        input.assert_that = self.assert_that;
        Ok(input)
    }
}

impl OutputDocument {
    fn into_output(self) -> Located<OutputMessage> {
        let role = Role::Response;
        let sent_to = located("output.sentTo", dual(&self.sent_to, role))?;
        let mut output = located("output.sentTo", OutputMessage::new(sent_to))?;
        fill_headers(&mut output.headers, &self.headers, role, "output.headers")?;
        if let Some(body) = &self.body {
            let body = located("output.body", node(body, role))?;
            output = located("output.body", output.body(body))?;
        }
        output.body_matchers = body_matchers(&self.matchers, "output.matchers")?;
        output.assert_that = self.assert_that;
        Ok(output)
    }
}

fn fill_headers(headers: &mut Headers, raw: &IndexMap<String, Value>, role: Role, prefix: &str) -> Located<()> {
    for (name, raw) in raw {
        let field = format!("{prefix}.{name}");
        if let Some(prefix_value) = raw.as_object().and_then(|map| map.get("$matching")) {
            let text = prefix_value.as_str().ok_or_else(|| {
                (field.clone(), ContractError::InvalidDocument("$matching needs a string".to_string()))
            })?;
            located(&field, headers.matching(name.clone(), text).map(|_| ()))?;
        } else {
            let parsed = located(&field, dual(raw, role))?;
            located(&field, headers.add(name.clone(), parsed).map(|_| ()))?;
        }
    }
    Ok(())
}

fn body_matchers(doc: &MatchersDocument, prefix: &str) -> Located<BodyMatchers> {
    let mut matchers = BodyMatchers::new();
    for (index, matcher) in doc.body.iter().enumerate() {
        let field = format!("{prefix}.body[{index}]");
        let spec = located(
            &field,
            MatchingTypeValue::from_parts(
                matcher.matching_type,
                matcher.value.clone(),
                matcher.min_occurrence,
                matcher.max_occurrence,
            ),
        )?;
        match (&matcher.path, &matcher.xpath) {
            (Some(path), None) => {
                matchers.json_path(path.clone(), spec);
            }
            (None, Some(xpath)) => {
                matchers.xpath(xpath.clone(), spec);
            }
            _ => {
                return Err((
                    field,
                    ContractError::InvalidDocument(
                        "a body matcher needs exactly one of path or xpath".to_string(),
                    ),
                ))
            }
        }
    }
    Ok(matchers)
}

fn directive(raw: &Value) -> Option<&Map<String, Value>> {
    raw.as_object()
        .filter(|map| !map.is_empty() && map.keys().all(|key| key.starts_with('$')))
}

fn invalid(message: impl Into<String>) -> ContractError {
    ContractError::InvalidDocument(message.into())
}

fn text<'a>(map: &'a Map<String, Value>, key: &str) -> Result<&'a str, ContractError> {
    map.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| invalid(format!("{key} needs a string")))
}

/// A body tree: structure stays structure, directives become leaves.
fn node(raw: &Value, role: Role) -> Result<Node, ContractError> {
    if directive(raw).is_some() {
        return dual(raw, role).map(Node::Value);
    }
    match raw {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| node(value, role).map(|node| (key.clone(), node)))
            .collect::<Result<IndexMap<_, _>, _>>()
            .map(Node::Object),
        Value::Array(items) => items
            .iter()
            .map(|item| node(item, role))
            .collect::<Result<Vec<_>, _>>()
            .map(Node::Array),
        scalar => Ok(Node::Value(DualValue::single(Leaf::Literal(scalar.clone())))),
    }
}

/// A two-sided value at a leaf position.
fn dual(raw: &Value, role: Role) -> Result<DualValue<Leaf>, ContractError> {
    let Some(map) = directive(raw) else {
        return match raw {
            Value::Object(_) | Value::Array(_) => Err(invalid(format!(
                "expected a value, found structure {raw}"
            ))),
            scalar => Ok(DualValue::single(Leaf::Literal(scalar.clone()))),
        };
    };

    match (map.get("$client"), map.get("$server")) {
        (Some(c), Some(s)) => return value(client(leaf(c)?), server(leaf(s)?)),
        (Some(c), None) => return Ok(DualValue::from_client(leaf(c)?)),
        (None, Some(s)) => return Ok(DualValue::from_server(leaf(s)?)),
        (None, None) => {}
    }
    if map.contains_key("$any") {
        let named: NamedPattern = text(map, "$any")?.parse()?;
        return Ok(any(role, named));
    }
    if map.contains_key("$anyMatching") {
        return any_matching(role, text(map, "$anyMatching")?);
    }
    if ["$regex", "$named", "$optional"].iter().any(|key| map.contains_key(*key)) {
        return Ok(one_sided(role.verifying_side(), leaf(raw)?));
    }
    if map.contains_key("$execute") {
        return Ok(DualValue::from_server(leaf(raw)?));
    }
    leaf(raw).map(DualValue::single)
}

fn one_sided(side: Side, leaf: Leaf) -> DualValue<Leaf> {
    match side {
        Side::Client => DualValue::from_client(leaf),
        Side::Server => DualValue::from_server(leaf),
    }
}

/// A single leaf, as used inside `$client`/`$server`.
fn leaf(raw: &Value) -> Result<Leaf, ContractError> {
    let Some(map) = directive(raw) else {
        return match raw {
            Value::Object(_) | Value::Array(_) => Err(invalid(format!(
                "expected a value, found structure {raw}"
            ))),
            scalar => Ok(Leaf::Literal(scalar.clone())),
        };
    };

    if let Some(source) = map.get("$regex") {
        let source = source.as_str().ok_or_else(|| invalid("$regex needs a string"))?;
        return property(RegexProperty::compile(source)?, map).map(Leaf::Pattern);
    }
    if map.contains_key("$named") {
        let named: NamedPattern = text(map, "$named")?.parse()?;
        return property(named.property(), map).map(Leaf::Pattern);
    }
    if map.contains_key("$optional") {
        return RegexPattern::new(text(map, "$optional")?).map(Leaf::Optional);
    }
    if let Some(kind) = map.get("$strategy") {
        let kind = kind.as_str().ok_or_else(|| invalid("$strategy needs a name"))?;
        let value = map.get("$value").cloned().unwrap_or(Value::Null);
        return MatchingStrategy::new(strategy_type(kind)?, value).map(Leaf::Strategy);
    }
    if map.contains_key("$fromRequest") {
        return text(map, "$fromRequest")?.parse::<RequestRef>().map(Leaf::FromRequest);
    }
    if map.contains_key("$execute") {
        return Ok(Leaf::Execute(text(map, "$execute")?.to_string()));
    }
    if let Some(generated) = map.get("$generated") {
        let property = match generated {
            Value::String(name) => name.parse::<NamedPattern>()?.property(),
            other => match leaf(other)? {
                Leaf::Pattern(property) => property,
                _ => return Err(invalid("$generated needs a named pattern or a $regex")),
            },
        };
        return property_kind(property, map).map(Leaf::Generated);
    }
    if map.contains_key("$base64") {
        return base64::engine::general_purpose::STANDARD
            .decode(text(map, "$base64")?)
            .map(Leaf::Bytes)
            .map_err(|e| invalid(format!("$base64: {e}")));
    }
    if let Some(parts) = map.get("$interpolate") {
        let parts = parts
            .as_array()
            .ok_or_else(|| invalid("$interpolate needs a list"))?;
        return parts
            .iter()
            .map(|part| match part {
                Value::String(text) => Ok(Fragment::Text(text.clone())),
                other => fragment_value(other).map(Fragment::Value),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Leaf::Interpolated);
    }
    Err(invalid(format!(
        "unknown directive {}",
        map.keys().cloned().collect::<Vec<_>>().join(", ")
    )))
}

/// Fragments carry their own sides; a bare pattern is placed on the client.
fn fragment_value(raw: &Value) -> Result<DualValue<Leaf>, ContractError> {
    let Some(map) = directive(raw) else {
        return leaf(raw).map(DualValue::single);
    };
    match (map.get("$client"), map.get("$server")) {
        (Some(c), Some(s)) => value(client(leaf(c)?), server(leaf(s)?)),
        (Some(c), None) => Ok(DualValue::from_client(leaf(c)?)),
        (None, Some(s)) => Ok(DualValue::from_server(leaf(s)?)),
        (None, None) => leaf(raw).map(DualValue::single),
    }
}

fn property(property: RegexProperty, map: &Map<String, Value>) -> Result<RegexProperty, ContractError> {
    let property = property_kind(property, map)?;
    match map.get("$example") {
        Some(Value::String(example)) => property.with_example(example.clone()),
        Some(other) => property.with_example(other.to_string()),
        None => Ok(property),
    }
}

fn property_kind(property: RegexProperty, map: &Map<String, Value>) -> Result<RegexProperty, ContractError> {
    match map.get("$as") {
        Some(kind) => {
            let kind: ValueKind = kind
                .as_str()
                .ok_or_else(|| invalid("$as needs a kind name"))?
                .parse()?;
            Ok(property.with_kind(kind))
        }
        None => Ok(property),
    }
}

fn strategy_type(name: &str) -> Result<StrategyType, ContractError> {
    let kind = match name {
        "equalTo" => StrategyType::EqualTo,
        "contains" => StrategyType::Contains,
        "matches" | "matching" => StrategyType::Matching,
        "doesNotMatch" | "notMatching" => StrategyType::NotMatching,
        "equalToJson" => StrategyType::EqualToJson,
        "equalToXml" => StrategyType::EqualToXml,
        "absent" => StrategyType::Absent,
        "binaryEqualTo" => StrategyType::BinaryEqualTo,
        other => return Err(invalid(format!("unknown strategy [{other}]"))),
    };
    Ok(kind)
}

fn part(raw: &Value, role: Role) -> Result<Part, ContractError> {
    match raw.as_object() {
        Some(map) if directive(raw).is_none() && map.contains_key("content") => {
            let field = |key: &str| -> Result<Option<DualValue<Leaf>>, ContractError> {
                map.get(key).map(|value| dual(value, role)).transpose()
            };
            Ok(Part::File {
                filename: field("filename")?
                    .ok_or_else(|| invalid("a file part needs a filename"))?,
                content: field("content")?.ok_or_else(|| invalid("a file part needs content"))?,
                content_type: field("contentType")?,
            })
        }
        _ => dual(raw, role).map(Part::Param),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(yaml: &str) -> Result<Contract, CompileError> {
        let mut docs = ContractDocument::parse_all(yaml, DocumentFormat::Yaml).unwrap();
        docs.remove(0).into_contract()
    }

    #[test]
    fn test_simple_contract() {
        let contract = load(
            r#"
name: get_user
request:
  method: GET
  urlPath: /users/1
  headers:
    Accept: {$matching: application/json}
response:
  status: 200
  body:
    id: 1
    name: Ann
"#,
        )
        .unwrap();
        assert_eq!(contract.label(), "get_user");
        let request = contract.request.unwrap();
        assert!(request.url_path.is_some());
        assert!(matches!(
            request.headers.get("accept").unwrap().value.client_value(),
            Some(Leaf::Pattern(_))
        ));
        assert!(contract.response.unwrap().body.unwrap().is_structured());
    }

    #[test]
    fn test_regex_goes_to_the_verifying_side() {
        let contract = load(
            r#"
request:
  method: GET
  url: {$regex: "/users/[0-9]+"}
response:
  status: 200
  body:
    id: {$regex: "[0-9]+", $as: integer}
"#,
        )
        .unwrap();
        let url = &contract.request.unwrap().url.unwrap().value;
        assert!(url.client_value().is_some());
        assert!(url.server_value().is_none());
        let Some(Node::Object(body)) = contract.response.unwrap().body else {
            panic!("expected object body");
        };
        let Node::Value(id) = &body["id"] else {
            panic!("expected leaf");
        };
        assert!(id.client_value().is_none());
        assert!(matches!(id.server_value(), Some(Leaf::Pattern(p)) if p.kind() == ValueKind::Integer));
    }

    #[test]
    fn test_client_server_pair_is_validated() {
        let err = load(
            r#"
name: bad
request:
  method: GET
  url: {$client: {$regex: "[0-9]+"}, $server: abc}
response:
  status: 200
"#,
        )
        .unwrap_err();
        assert_eq!(err.path, "request.url");
        assert!(matches!(err.source, ContractError::SideMismatch { .. }));
    }

    #[test]
    fn test_server_side_regex_in_request_is_rejected() {
        let err = load(
            r#"
request:
  method: GET
  url: {$server: {$regex: "[0-9]+"}}
response:
  status: 200
"#,
        )
        .unwrap_err();
        assert!(matches!(err.source, ContractError::ForbiddenPatternPlacement(_)));
    }

    #[test]
    fn test_directives() {
        let contract = load(
            r#"
request:
  method: POST
  urlPath: /echo
  headers:
    X-Absent: {$strategy: absent}
response:
  status: 200
  headers:
    X-Trace: {$fromRequest: "header:X-Trace"}
  body:
    greeting: {$interpolate: ["hello ", {$fromRequest: "query:name"}]}
    check: {$execute: "isValid($it)"}
  fixedDelayMilliseconds: 50
"#,
        )
        .unwrap();
        let response = contract.response.unwrap();
        assert_eq!(response.delay, Some(Delay::Fixed { milliseconds: 50 }));
        assert!(matches!(
            response.headers.get("X-Trace").unwrap().value.client_value(),
            Some(Leaf::FromRequest(RequestRef::Header { .. }))
        ));
        let request = contract.request.unwrap();
        assert!(request.headers.get("X-Absent").unwrap().value.client_value().unwrap().is_absent());
    }

    #[test]
    fn test_multi_document_yaml() {
        let docs = ContractDocument::parse_all(
            "name: a\nrequest: {method: GET, url: /a}\nresponse: {status: 200}\n---\nname: b\nrequest: {method: GET, url: /b}\nresponse: {status: 204}\n",
            DocumentFormat::Yaml,
        )
        .unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].name.as_deref(), Some("b"));
    }

    #[test]
    fn test_json_array_document() {
        let docs = ContractDocument::parse_all(
            r#"[{"name": "a", "request": {"method": "GET", "url": "/"}, "response": {"status": 200}}]"#,
            DocumentFormat::Json,
        )
        .unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn test_empty_contract_document() {
        let err = load("name: nothing\n").unwrap_err();
        assert_eq!(err.source, ContractError::EmptyContract);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = ContractDocument::parse_all("nme: typo\n", DocumentFormat::Yaml).unwrap_err();
        assert!(matches!(err, ContractError::InvalidDocument(_)));
    }

    #[test]
    fn test_body_matchers_and_multipart() {
        let contract = load(
            r#"
request:
  method: POST
  url: /upload
  multipart:
    name: {$client: {$regex: "[a-z]+"}, $server: alice}
    file:
      filename: a.txt
      content: hello
  matchers:
    body:
      - path: $.id
        type: regex
        value: "[0-9]+"
response:
  status: 201
"#,
        )
        .unwrap();
        let request = contract.request.unwrap();
        assert_eq!(request.body_matchers.matchers().len(), 1);
        let multipart = request.multipart.unwrap();
        assert!(matches!(multipart["file"], Part::File { .. }));
        assert!(matches!(multipart["name"], Part::Param(_)));
    }

    #[test]
    fn test_both_delays_rejected() {
        let err = load(
            r#"
request: {method: GET, url: /}
response:
  status: 200
  fixedDelayMilliseconds: 5
  delayDistribution: {type: uniform, lower: 1, upper: 2}
"#,
        )
        .unwrap_err();
        assert_eq!(err.path, "response.delayDistribution");
    }
}
