//! Response rendering at serve time.

use crate::compile::{CompiledEntry, CompiledResponse, TemplateNode, TemplatePart, TemplateValue};
use crate::serve::ServedRequest;
use crate::value::text_of;
use base64::Engine;
use rand::Rng;
use serde_json::Value;
use std::time::Duration;

/// A rendered response, ready to be written back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    /// Set when the body is binary
    pub bytes: Option<Vec<u8>>,
    pub delay: Option<Duration>,
}

impl ServedResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json_body(&self) -> Option<Value> {
        self.body.as_deref().and_then(|body| serde_json::from_str(body).ok())
    }
}

/// Resolve one template leaf against the request being served.
///
/// A reference the request cannot satisfy renders as an empty string.
/// Commands have no value at serve time.
pub fn render_value(template: &TemplateValue, request: &ServedRequest) -> Option<Value> {
    match template {
        TemplateValue::Literal(value) => Some(value.clone()),
        TemplateValue::Bytes(bytes) => {
            Some(Value::String(base64::engine::general_purpose::STANDARD.encode(bytes)))
        }
        TemplateValue::FromRequest(reference) => {
            Some(request.resolve(reference).unwrap_or_else(|| Value::String(String::new())))
        }
        TemplateValue::Interpolated(parts) => {
            let text: String = parts
                .iter()
                .map(|part| match part {
                    TemplatePart::Text(text) => text.clone(),
                    TemplatePart::FromRequest(reference) => {
                        request.resolve(reference).as_ref().map(text_of).unwrap_or_default()
                    }
                })
                .collect();
            Some(Value::String(text))
        }
        TemplateValue::Execute(_) | TemplateValue::Omitted => None,
    }
}

fn render_node(template: &TemplateNode, request: &ServedRequest) -> Option<Value> {
    match template {
        TemplateNode::Object(fields) => Some(Value::Object(
            fields
                .iter()
                .filter_map(|(key, node)| render_node(node, request).map(|value| (key.clone(), value)))
                .collect(),
        )),
        TemplateNode::Array(items) => Some(Value::Array(
            items.iter().filter_map(|node| render_node(node, request)).collect(),
        )),
        TemplateNode::Leaf(value) => render_value(value, request),
    }
}

fn render_entries(entries: &[CompiledEntry], request: &ServedRequest) -> Vec<(String, String)> {
    entries
        .iter()
        .filter_map(|entry| {
            render_value(&entry.value.template, request).map(|value| (entry.name.clone(), text_of(&value)))
        })
        .collect()
}

/// Render a compiled response for `request`, sampling its delay with `rng`.
pub fn render_response(
    response: &CompiledResponse,
    request: &ServedRequest,
    rng: &mut impl Rng,
) -> ServedResponse {
    let status = render_value(&response.status.template, request)
        .and_then(|status| text_of(&status).parse().ok())
        .unwrap_or(200);

    let mut headers = render_entries(&response.headers, request);
    headers.extend(
        render_entries(&response.cookies, request)
            .into_iter()
            .map(|(name, value)| ("Set-Cookie".to_string(), format!("{name}={value}"))),
    );

    let (body, bytes) = match response.body.as_ref().map(|body| &body.template) {
        Some(TemplateNode::Leaf(TemplateValue::Bytes(bytes))) => (None, Some(bytes.clone())),
        Some(template) => match render_node(template, request) {
            Some(Value::String(text)) => (Some(text), None),
            Some(value) => (Some(value.to_string()), None),
            None => (None, None),
        },
        None => (None, None),
    };

    ServedResponse {
        status,
        headers,
        body,
        bytes,
        delay: response.delay.as_ref().map(|delay| delay.sample(rng)),
    }
}
