//! Contract compilation.
//!
//! A [`Contract`] compiles into a [`CompiledContract`]: for every value a
//! comparison used by the verifying side and a template used by the
//! producing side. Stub mappings, test assertions and the serve-time matcher
//! are all rendered from this one compiled form.
//!
//! Compilation is synchronous and either produces the whole result or the
//! first [`CompileError`].

mod body;
mod graph;
mod json;
mod leaf;
pub(crate) mod xml;

pub use body::{BodyMatch, JsonKind, PathAssertion, PathCheck};
pub use graph::{Comparison, MatcherNode, TemplateNode, TemplatePart, TemplateValue, ValueGraph};

use crate::config::CompilerConfig;
use crate::contract::{Contract, Headers, Input, OutputMessage, Part, Request, Response};
use crate::error::{CompileError, ContractError};
use crate::matching::{BodyMatcher, BodyMatchers, ContentType, PathKind};
use crate::pattern::{multipart_file, multipart_param, ExampleCache, RegexPattern, SeededGenerator};
use crate::serve::ServedRequest;
use crate::stub::{Delay, ScenarioStep};
use crate::value::{text_of, DualValue, Leaf, Node, Role, Side};
use indexmap::IndexMap;
use leaf::{compile_value, Context};
use serde_json::Value;
use std::borrow::Cow;
use tracing::{debug, info};

/// Where in a contract compilation currently is.
#[derive(Debug, Clone)]
struct Scope<'a> {
    contract: &'a str,
    path: String,
}

impl<'a> Scope<'a> {
    fn new(contract: &'a str) -> Self {
        Self {
            contract,
            path: String::new(),
        }
    }

    fn field(&self, name: &str) -> Scope<'a> {
        let path = if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.path, name)
        };
        Scope {
            contract: self.contract,
            path,
        }
    }

    fn index(&self, index: usize) -> Scope<'a> {
        Scope {
            contract: self.contract,
            path: format!("{}[{}]", self.path, index),
        }
    }

    fn fail(&self, error: ContractError) -> CompileError {
        error.at(self.contract, self.path.clone())
    }
}

/// A value compiled for both sides.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledValue {
    pub matcher: Comparison,
    pub template: TemplateValue,
}

/// A named value: header, cookie or query parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledEntry {
    pub name: String,
    pub value: CompiledValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    /// Full URL including any query string
    Url,
    /// Path only; query parameters are matched separately
    Path,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledUrl {
    pub kind: UrlKind,
    pub value: CompiledValue,
    pub query: Vec<CompiledEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledBody {
    pub content_type: ContentType,
    pub matcher: BodyMatch,
    pub template: TemplateNode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PartTemplate {
    Param(TemplateValue),
    File {
        filename: TemplateValue,
        content: TemplateValue,
        content_type: Option<TemplateValue>,
    },
}

/// A multipart part: a regex over the raw body and the part to send.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPart {
    pub name: String,
    pub matcher: RegexPattern,
    pub template: PartTemplate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRequest {
    pub method: CompiledValue,
    pub url: CompiledUrl,
    pub headers: Vec<CompiledEntry>,
    pub cookies: Vec<CompiledEntry>,
    pub body: Option<CompiledBody>,
    pub multipart: Vec<CompiledPart>,
}

impl CompiledRequest {
    /// The request the generated test sends, when every part of it is known
    /// without running a command.
    pub fn served(&self) -> Option<ServedRequest> {
        let text = |value: &CompiledValue| value.template.literal().map(text_of);
        let mut url = text(&self.url.value)?;
        let query: Vec<String> = self
            .url
            .query
            .iter()
            .filter(|entry| entry.value.template != TemplateValue::Omitted)
            .map(|entry| {
                text(&entry.value)
                    .map(|value| format!("{}={}", entry.name, urlencoding::encode(&value)))
            })
            .collect::<Option<_>>()?;
        if !query.is_empty() {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&query.join("&"));
        }

        let mut served = ServedRequest::new(&text(&self.method)?, &url);
        for header in &self.headers {
            if let Some(value) = text(&header.value) {
                served = served.with_header(header.name.clone(), value);
            }
        }
        for cookie in &self.cookies {
            if let Some(value) = text(&cookie.value) {
                served = served.with_cookie(cookie.name.clone(), value);
            }
        }
        if let Some(body) = self.body.as_ref().and_then(|body| body_text(&body.template)) {
            served = served.with_body(body);
        }
        Some(served)
    }
}

/// Body text of a template that needs no request to render.
pub fn body_text(template: &TemplateNode) -> Option<String> {
    match template {
        TemplateNode::Leaf(TemplateValue::Literal(Value::String(text))) => Some(text.clone()),
        TemplateNode::Leaf(TemplateValue::Bytes(bytes)) => String::from_utf8(bytes.clone()).ok(),
        other => other.to_json().map(|json| json.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledResponse {
    pub status: CompiledValue,
    pub headers: Vec<CompiledEntry>,
    pub cookies: Vec<CompiledEntry>,
    pub body: Option<CompiledBody>,
    pub delay: Option<Delay>,
    pub is_async: bool,
}

impl CompiledResponse {
    /// True when rendering needs the matched request.
    pub fn is_templated(&self) -> bool {
        let deferred = |entries: &[CompiledEntry]| {
            entries.iter().any(|entry| entry.value.template.is_deferred())
        };
        self.status.template.is_deferred()
            || deferred(&self.headers)
            || deferred(&self.cookies)
            || self.body.as_ref().is_some_and(|body| body.template.has_deferred())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledHttp {
    pub request: CompiledRequest,
    pub response: CompiledResponse,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledInput {
    pub triggered_by: Option<String>,
    pub message_from: Option<CompiledValue>,
    pub headers: Vec<CompiledEntry>,
    pub body: Option<CompiledBody>,
    pub assert_that: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledOutput {
    pub sent_to: CompiledValue,
    pub headers: Vec<CompiledEntry>,
    pub body: Option<CompiledBody>,
    pub assert_that: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledMessaging {
    pub input: Option<CompiledInput>,
    pub output: Option<CompiledOutput>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledContract {
    pub name: String,
    pub priority: Option<u32>,
    pub ignored: bool,
    pub scenario: Option<ScenarioStep>,
    pub metadata: IndexMap<String, Value>,
    pub http: Option<CompiledHttp>,
    pub messaging: Option<CompiledMessaging>,
}

/// Compiles contracts with one shared example cache.
#[derive(Debug, Clone)]
pub struct Compiler {
    config: CompilerConfig,
    cache: ExampleCache,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(CompilerConfig::default())
    }
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        let generator =
            SeededGenerator::new(config.seed).with_max_extra_repeat(config.max_extra_repeat);
        Self::with_cache(config, ExampleCache::new(generator))
    }

    /// Use a caller-provided cache, for example one shared across compilers.
    pub fn with_cache(config: CompilerConfig, cache: ExampleCache) -> Self {
        Self { config, cache }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn cache(&self) -> &ExampleCache {
        &self.cache
    }

    pub fn compile(&self, contract: &Contract) -> Result<CompiledContract, CompileError> {
        let label = contract.label();
        let scope = Scope::new(label);
        contract.validate().map_err(|e| scope.fail(e))?;

        let http = match (&contract.request, &contract.response) {
            (Some(request), Some(response)) => {
                let request = self.request(request, &scope.field("request"))?;
                let served = request.served();
                let response =
                    self.response(response, served.as_ref(), &scope.field("response"))?;
                Some(CompiledHttp { request, response })
            }
            (None, None) => None,
            (Some(_), None) => {
                return Err(scope.field("response").fail(ContractError::InvalidDocument(
                    "a request needs a response".to_string(),
                )))
            }
            (None, Some(_)) => {
                return Err(scope.field("request").fail(ContractError::InvalidDocument(
                    "a response needs a request".to_string(),
                )))
            }
        };

        let messaging = if contract.is_messaging() {
            Some(CompiledMessaging {
                input: contract
                    .input
                    .as_ref()
                    .map(|input| self.input(input, &scope.field("input")))
                    .transpose()?,
                output: contract
                    .output
                    .as_ref()
                    .map(|output| self.output(output, &scope.field("output")))
                    .transpose()?,
            })
        } else {
            None
        };

        info!(contract = label, "compiled contract");
        Ok(CompiledContract {
            name: label.to_string(),
            priority: contract.priority.or(self.config.default_priority),
            ignored: contract.ignored,
            scenario: contract.scenario.clone(),
            metadata: contract.metadata.clone(),
            http,
            messaging,
        })
    }

    fn context<'a>(&'a self, request: Option<&'a ServedRequest>) -> Context<'a> {
        Context {
            cache: &self.cache,
            request,
        }
    }

    fn value(
        &self,
        value: &DualValue<Leaf>,
        role: Role,
        ctx: &Context<'_>,
        scope: &Scope<'_>,
    ) -> Result<CompiledValue, CompileError> {
        let (matcher, template) = compile_value(value, role, ctx).map_err(|e| scope.fail(e))?;
        Ok(CompiledValue { matcher, template })
    }

    fn entries(
        &self,
        headers: &Headers,
        ctx: &Context<'_>,
        scope: &Scope<'_>,
    ) -> Result<Vec<CompiledEntry>, CompileError> {
        headers
            .iter()
            .map(|header| {
                Ok(CompiledEntry {
                    name: header.name.clone(),
                    value: self.value(&header.value, headers.role(), ctx, &scope.field(&header.name))?,
                })
            })
            .collect()
    }

    fn request(&self, request: &Request, scope: &Scope<'_>) -> Result<CompiledRequest, CompileError> {
        let ctx = self.context(None);
        let role = Role::Request;

        let (kind, url, url_scope) = match (&request.url_path, &request.url) {
            (Some(path), _) => (UrlKind::Path, path, scope.field("urlPath")),
            (None, Some(url)) => (UrlKind::Url, url, scope.field("url")),
            (None, None) => {
                return Err(scope.field("url").fail(ContractError::InvalidDocument(
                    "a request needs a url or a url path".to_string(),
                )))
            }
        };
        let query = url
            .query
            .iter()
            .map(|parameter| {
                Ok(CompiledEntry {
                    name: parameter.name.clone(),
                    value: self.value(
                        &parameter.value,
                        role,
                        &ctx,
                        &scope.field("queryParameters").field(&parameter.name),
                    )?,
                })
            })
            .collect::<Result<Vec<_>, CompileError>>()?;
        let url = CompiledUrl {
            kind,
            value: self.value(&url.value, role, &ctx, &url_scope)?,
            query,
        };

        let body = request
            .body
            .as_ref()
            .map(|body| {
                self.body(
                    body,
                    declared_content_type(&request.headers),
                    &request.body_matchers,
                    role,
                    &ctx,
                    &scope.field("body"),
                )
            })
            .transpose()?;

        let multipart = match &request.multipart {
            Some(parts) => parts
                .iter()
                .map(|(name, part)| self.part(name, part, &ctx, &scope.field("multipart").field(name)))
                .collect::<Result<Vec<_>, CompileError>>()?,
            None => Vec::new(),
        };

        Ok(CompiledRequest {
            method: self.value(&request.method, role, &ctx, &scope.field("method"))?,
            url,
            headers: self.entries(&request.headers, &ctx, &scope.field("headers"))?,
            cookies: self.entries(&request.cookies, &ctx, &scope.field("cookies"))?,
            body,
            multipart,
        })
    }

    fn response(
        &self,
        response: &Response,
        served: Option<&ServedRequest>,
        scope: &Scope<'_>,
    ) -> Result<CompiledResponse, CompileError> {
        let ctx = self.context(served);
        let body = response
            .body
            .as_ref()
            .map(|body| {
                self.body(
                    body,
                    declared_content_type(&response.headers),
                    &response.body_matchers,
                    Role::Response,
                    &ctx,
                    &scope.field("body"),
                )
            })
            .transpose()?;
        Ok(CompiledResponse {
            status: self.value(&response.status, Role::Response, &ctx, &scope.field("status"))?,
            headers: self.entries(&response.headers, &ctx, &scope.field("headers"))?,
            cookies: self.entries(&response.cookies, &ctx, &scope.field("cookies"))?,
            body,
            delay: response.delay.clone(),
            is_async: response.is_async,
        })
    }

    fn input(&self, input: &Input, scope: &Scope<'_>) -> Result<CompiledInput, CompileError> {
        let ctx = self.context(None);
        Ok(CompiledInput {
            triggered_by: input.triggered_by.clone(),
            message_from: input
                .message_from
                .as_ref()
                .map(|from| self.value(from, Role::Request, &ctx, &scope.field("messageFrom")))
                .transpose()?,
            headers: self.entries(&input.headers, &ctx, &scope.field("messageHeaders"))?,
            body: input
                .body
                .as_ref()
                .map(|body| {
                    self.body(
                        body,
                        declared_content_type(&input.headers),
                        &input.body_matchers,
                        Role::Request,
                        &ctx,
                        &scope.field("messageBody"),
                    )
                })
                .transpose()?,
            assert_that: input.assert_that.clone(),
        })
    }

    fn output(&self, output: &OutputMessage, scope: &Scope<'_>) -> Result<CompiledOutput, CompileError> {
        let ctx = self.context(None);
        Ok(CompiledOutput {
            sent_to: self.value(&output.sent_to, Role::Response, &ctx, &scope.field("sentTo"))?,
            headers: self.entries(&output.headers, &ctx, &scope.field("headers"))?,
            body: output
                .body
                .as_ref()
                .map(|body| {
                    self.body(
                        body,
                        declared_content_type(&output.headers),
                        &output.body_matchers,
                        Role::Response,
                        &ctx,
                        &scope.field("body"),
                    )
                })
                .transpose()?,
            assert_that: output.assert_that.clone(),
        })
    }

    fn body(
        &self,
        node: &Node,
        declared: Option<String>,
        matchers: &BodyMatchers,
        role: Role,
        ctx: &Context<'_>,
        scope: &Scope<'_>,
    ) -> Result<CompiledBody, CompileError> {
        let content_type = ContentType::resolve(declared.as_deref(), node);
        let node = structured(node, content_type);
        let graph = compile_node(&node, role, ctx, scope)?;

        let json_matchers: Vec<&BodyMatcher> = matchers
            .iter()
            .filter(|m| m.path_kind() == PathKind::JsonPath)
            .collect();
        let xml_matchers: Vec<&BodyMatcher> = matchers
            .iter()
            .filter(|m| m.path_kind() == PathKind::XPath)
            .collect();

        let (matcher, template) = match (&graph.matcher, content_type) {
            (MatcherNode::Object(fields), ContentType::Form) => {
                form_body(fields, &graph.template).map_err(|e| scope.fail(e))?
            }
            (MatcherNode::Object(_) | MatcherNode::Array(_), _) => {
                if !xml_matchers.is_empty() {
                    return Err(scope.fail(ContractError::UnsupportedMatcher(
                        "XPath matchers need an XML body".to_string(),
                    )));
                }
                let view = example_view(&graph.template);
                let matcher = json::json_assertions(&graph.matcher, &view, &json_matchers, role)
                    .map_err(|e| scope.fail(e))?;
                (matcher, graph.template)
            }
            (MatcherNode::Leaf(Comparison::EqualTo(Value::String(xml))), ContentType::Xml) => {
                if !json_matchers.is_empty() {
                    return Err(scope.fail(ContractError::UnsupportedMatcher(
                        "JSONPath matchers need a JSON body".to_string(),
                    )));
                }
                let matcher =
                    xml::xml_assertions(xml, &xml_matchers, role).map_err(|e| scope.fail(e))?;
                (matcher, graph.template)
            }
            (MatcherNode::Leaf(comparison), _) => {
                // A body compared as a whole has no paths to select.
                if let Some(matcher) = matchers.iter().next() {
                    return Err(scope.fail(ContractError::UnreachablePath {
                        path: matcher.path().to_string(),
                    }));
                }
                (BodyMatch::Whole(comparison.clone()), graph.template)
            }
        };
        debug!(contract = scope.contract, path = %scope.path, ?content_type, "compiled body");
        Ok(CompiledBody {
            content_type,
            matcher,
            template,
        })
    }

    fn part(
        &self,
        name: &str,
        part: &Part,
        ctx: &Context<'_>,
        scope: &Scope<'_>,
    ) -> Result<CompiledPart, CompileError> {
        let role = Role::Request;
        let (source, template) = match part {
            Part::Param(value) => {
                let value = self.value(value, role, ctx, scope)?;
                let source = part_regex(&value.matcher).map_err(|e| scope.fail(e))?;
                (multipart_param(name, &source), PartTemplate::Param(value.template))
            }
            Part::File {
                filename,
                content,
                content_type,
            } => {
                let filename = self.value(filename, role, ctx, &scope.field("filename"))?;
                let content = self.value(content, role, ctx, &scope.field("content"))?;
                let content_type = content_type
                    .as_ref()
                    .map(|value| self.value(value, role, ctx, &scope.field("contentType")))
                    .transpose()?;
                let type_source = content_type
                    .as_ref()
                    .map(|value| part_regex(&value.matcher))
                    .transpose()
                    .map_err(|e| scope.fail(e))?;
                let source = multipart_file(
                    name,
                    &part_regex(&filename.matcher).map_err(|e| scope.fail(e))?,
                    &part_regex(&content.matcher).map_err(|e| scope.fail(e))?,
                    type_source.as_deref(),
                );
                (
                    source,
                    PartTemplate::File {
                        filename: filename.template,
                        content: content.template,
                        content_type: content_type.map(|value| value.template),
                    },
                )
            }
        };
        Ok(CompiledPart {
            name: name.to_string(),
            matcher: RegexPattern::new(source).map_err(|e| scope.fail(e))?,
            template,
        })
    }
}

fn compile_node(
    node: &Node,
    role: Role,
    ctx: &Context<'_>,
    scope: &Scope<'_>,
) -> Result<ValueGraph, CompileError> {
    match node {
        Node::Object(fields) => {
            let mut matcher = IndexMap::new();
            let mut template = IndexMap::new();
            for (key, child) in fields {
                let graph = compile_node(child, role, ctx, &scope.field(key))?;
                matcher.insert(key.clone(), graph.matcher);
                template.insert(key.clone(), graph.template);
            }
            Ok(ValueGraph {
                matcher: MatcherNode::Object(matcher),
                template: TemplateNode::Object(template),
            })
        }
        Node::Array(items) => {
            let mut matcher = Vec::with_capacity(items.len());
            let mut template = Vec::with_capacity(items.len());
            for (index, child) in items.iter().enumerate() {
                let graph = compile_node(child, role, ctx, &scope.index(index))?;
                matcher.push(graph.matcher);
                template.push(graph.template);
            }
            Ok(ValueGraph {
                matcher: MatcherNode::Array(matcher),
                template: TemplateNode::Array(template),
            })
        }
        Node::Value(value) => {
            let (matcher, template) =
                compile_value(value, role, ctx).map_err(|e| scope.fail(e))?;
            Ok(ValueGraph {
                matcher: MatcherNode::Leaf(matcher),
                template: TemplateNode::Leaf(template),
            })
        }
    }
}

/// A JSON body written as one string is compiled as the structure it holds.
fn structured(node: &Node, content_type: ContentType) -> Cow<'_, Node> {
    if content_type != ContentType::Json {
        return Cow::Borrowed(node);
    }
    let Node::Value(value) = node else {
        return Cow::Borrowed(node);
    };
    let text = |side: Side| match value.side_or_other(side).1 {
        Leaf::Literal(Value::String(text)) => Some(text.as_str()),
        _ => None,
    };
    match (text(Side::Client), text(Side::Server)) {
        (Some(client), Some(server)) if client == server => {
            match serde_json::from_str::<Value>(client) {
                Ok(json @ (Value::Object(_) | Value::Array(_))) => Cow::Owned(Node::literal(&json)),
                _ => Cow::Borrowed(node),
            }
        }
        _ => Cow::Borrowed(node),
    }
}

/// The body the producing side sends, with values known only at serve time
/// left as `null`.
fn example_view(template: &TemplateNode) -> Value {
    match template {
        TemplateNode::Object(fields) => Value::Object(
            fields
                .iter()
                .filter(|(_, node)| !matches!(node, TemplateNode::Leaf(TemplateValue::Omitted)))
                .map(|(key, node)| (key.clone(), example_view(node)))
                .collect(),
        ),
        TemplateNode::Array(items) => Value::Array(items.iter().map(example_view).collect()),
        TemplateNode::Leaf(TemplateValue::Literal(value)) => value.clone(),
        TemplateNode::Leaf(_) => Value::Null,
    }
}

/// Text of the declared `Content-Type`, from whichever side has one.
fn declared_content_type(headers: &Headers) -> Option<String> {
    let header = headers.content_type()?;
    let side = |side: Side| header.value.side(side);
    [Side::Client, Side::Server]
        .into_iter()
        .filter_map(side)
        .find_map(Leaf::concrete_text)
        .or_else(|| {
            [Side::Client, Side::Server]
                .into_iter()
                .filter_map(side)
                .find_map(|leaf| leaf.pattern().map(|p| p.as_str().to_string()))
        })
}

/// Regex text for a value inside a multipart body.
fn part_regex(comparison: &Comparison) -> Result<String, ContractError> {
    match comparison {
        Comparison::EqualTo(value) => Ok(regex::escape(&text_of(value))),
        Comparison::Matching(pattern) => Ok(pattern.as_str().to_string()),
        other => Err(ContractError::UnsupportedMatcher(format!(
            "{:?} cannot be used in a multipart body",
            other
        ))),
    }
}

/// Form bodies are matched as one encoded string, `a=1&b=2`.
fn form_body(
    fields: &IndexMap<String, MatcherNode>,
    template: &TemplateNode,
) -> Result<(BodyMatch, TemplateNode), ContractError> {
    let mut literal = Vec::new();
    let mut regex = Vec::new();
    let mut has_pattern = false;
    for (key, node) in fields {
        let key = urlencoding::encode(key).into_owned();
        match node {
            MatcherNode::Leaf(Comparison::EqualTo(value)) => {
                let pair = format!("{}={}", key, urlencoding::encode(&text_of(value)));
                regex.push(regex::escape(&pair));
                literal.push(pair);
            }
            MatcherNode::Leaf(Comparison::Matching(pattern)) => {
                has_pattern = true;
                regex.push(format!("{}=(?:{})", regex::escape(&key), pattern.as_str()));
            }
            MatcherNode::Leaf(Comparison::Absent) => {}
            other => {
                return Err(ContractError::UnsupportedMatcher(format!(
                    "form field [{}] cannot be matched by {:?}",
                    key, other
                )))
            }
        }
    }
    let matcher = if has_pattern {
        BodyMatch::Whole(Comparison::Matching(RegexPattern::new(regex.join("&"))?))
    } else {
        BodyMatch::Whole(Comparison::EqualTo(Value::String(literal.join("&"))))
    };

    let encoded = match example_view(template) {
        Value::Object(fields) => fields
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(key),
                    urlencoding::encode(&text_of(value))
                )
            })
            .collect::<Vec<_>>()
            .join("&"),
        other => text_of(&other),
    };
    Ok((
        matcher,
        TemplateNode::Leaf(TemplateValue::Literal(Value::String(encoded))),
    ))
}
