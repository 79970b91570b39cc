//! The request a stub answers, as seen by matchers and templates.

use crate::value::RequestRef;
use serde_json::Value;
use serde_json_path::JsonPath;

/// A concrete HTTP request.
///
/// Header names keep their case; lookups ignore it. Repeated query
/// parameters and headers keep their order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServedRequest {
    pub method: String,
    /// Path without the query string
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    pub body: Option<String>,
}

impl ServedRequest {
    /// Build from a method and a URL that may carry a query string.
    pub fn new(method: &str, url: &str) -> Self {
        let (path, query) = match url.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (url, None),
        };
        Self {
            method: method.to_string(),
            path: path.to_string(),
            query: parse_query_string(query),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Path plus the query string, re-encoded.
    pub fn url(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(name, value)| format!("{}={}", name, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.path, query)
    }

    pub fn query_values(&self, name: &str) -> Vec<&str> {
        self.query
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .collect()
    }

    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Non-empty path segments, zero-based.
    pub fn path_segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|segment| !segment.is_empty()).collect()
    }

    pub fn json_body(&self) -> Option<Value> {
        self.body.as_deref().and_then(|body| serde_json::from_str(body).ok())
    }

    /// The value a `fromRequest` reference points at, if the request has it.
    pub fn resolve(&self, reference: &RequestRef) -> Option<Value> {
        let text = |value: &str| Some(Value::String(value.to_string()));
        match reference {
            RequestRef::Url => text(&self.url()),
            RequestRef::Path => text(&self.path),
            RequestRef::PathSegment(index) => self.path_segments().get(*index).and_then(|s| text(s)),
            RequestRef::Query { name, index } => {
                self.query_values(name).get(*index).and_then(|v| text(v))
            }
            RequestRef::Header { name, index } => {
                self.header_values(name).get(*index).and_then(|v| text(v))
            }
            RequestRef::Cookie(name) => self.cookie(name).and_then(text),
            RequestRef::Body => self.body.as_deref().and_then(text),
            RequestRef::BodyPath(path) => {
                let path = JsonPath::parse(path).ok()?;
                let body = self.json_body()?;
                let found = path.query(&body).all().first().map(|value| (*value).clone());
                found
            }
        }
    }
}

/// Split a query string into decoded pairs, keeping repeats.
pub fn parse_query_string(query: Option<&str>) -> Vec<(String, String)> {
    let mut params = Vec::new();
    if let Some(q) = query {
        for pair in q.split('&') {
            if let Some((key, value)) = pair.split_once('=') {
                let decoded = urlencoding::decode(value).unwrap_or_default().to_string();
                params.push((key.to_string(), decoded));
            } else if !pair.is_empty() {
                params.push((pair.to_string(), String::new()));
            }
        }
    }
    params
}
