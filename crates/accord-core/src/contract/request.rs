use crate::contract::{any, any_matching, checked, checked_node, Headers, IntoDual};
use crate::error::ContractError;
use crate::matching::BodyMatchers;
use crate::pattern::NamedPattern;
use crate::value::{DualValue, Leaf, Node, Role};
use indexmap::IndexMap;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct QueryParameter {
    pub name: String,
    pub value: DualValue<Leaf>,
}

/// A URL or URL path plus its query parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Url {
    pub value: DualValue<Leaf>,
    pub query: Vec<QueryParameter>,
}

/// One multipart part.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Param(DualValue<Leaf>),
    File {
        filename: DualValue<Leaf>,
        content: DualValue<Leaf>,
        content_type: Option<DualValue<Leaf>>,
    },
}

pub type Multipart = IndexMap<String, Part>;

/// The request half of an HTTP contract.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: DualValue<Leaf>,
    pub url: Option<Url>,
    pub url_path: Option<Url>,
    pub headers: Headers,
    pub cookies: Headers,
    pub body: Option<Node>,
    pub body_matchers: BodyMatchers,
    pub multipart: Option<Multipart>,
}

impl Request {
    pub fn new(method: impl IntoDual) -> Result<Self, ContractError> {
        Ok(Self {
            method: checked(Role::Request, method.into_dual())?,
            url: None,
            url_path: None,
            headers: Headers::for_role(Role::Request),
            cookies: Headers::for_role(Role::Request),
            body: None,
            body_matchers: BodyMatchers::default(),
            multipart: None,
        })
    }

    /// A library pattern for the stub, a generated value for the test.
    pub fn any(named: NamedPattern) -> DualValue<Leaf> {
        any(Role::Request, named)
    }

    pub fn any_matching(source: &str) -> Result<DualValue<Leaf>, ContractError> {
        any_matching(Role::Request, source)
    }

    pub fn any_uuid() -> DualValue<Leaf> {
        Self::any(NamedPattern::Uuid)
    }

    pub fn url(mut self, url: impl IntoDual) -> Result<Self, ContractError> {
        self.url = Some(Url {
            value: checked(Role::Request, url.into_dual())?,
            query: Vec::new(),
        });
        self.url_path = None;
        Ok(self)
    }

    pub fn url_path(mut self, path: impl IntoDual) -> Result<Self, ContractError> {
        self.url_path = Some(Url {
            value: checked(Role::Request, path.into_dual())?,
            query: Vec::new(),
        });
        self.url = None;
        Ok(self)
    }

    /// Add a query parameter to whichever URL is declared.
    pub fn query(mut self, name: impl Into<String>, value: impl IntoDual) -> Result<Self, ContractError> {
        let parameter = QueryParameter {
            name: name.into(),
            value: checked(Role::Request, value.into_dual())?,
        };
        match self.url_path.as_mut().or(self.url.as_mut()) {
            Some(url) => url.query.push(parameter),
            None => {
                return Err(ContractError::InvalidDocument(
                    "query parameters need a url or url path".to_string(),
                ))
            }
        }
        Ok(self)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl IntoDual) -> Result<Self, ContractError> {
        self.headers.add(name, value)?;
        Ok(self)
    }

    pub fn header_matching(mut self, name: impl Into<String>, value: &str) -> Result<Self, ContractError> {
        self.headers.matching(name, value)?;
        Ok(self)
    }

    pub fn cookie(mut self, name: impl Into<String>, value: impl IntoDual) -> Result<Self, ContractError> {
        self.cookies.add(name, value)?;
        Ok(self)
    }

    pub fn body(mut self, body: Node) -> Result<Self, ContractError> {
        checked_node(Role::Request, &body)?;
        self.body = Some(body);
        Ok(self)
    }

    pub fn json_body(self, body: Value) -> Result<Self, ContractError> {
        self.body(Node::literal(&body))
    }

    pub fn body_matchers(mut self, matchers: BodyMatchers) -> Self {
        self.body_matchers = matchers;
        self
    }

    pub fn multipart(mut self, parts: Multipart) -> Result<Self, ContractError> {
        for part in parts.values() {
            match part {
                Part::Param(value) => {
                    checked(Role::Request, value.clone())?;
                }
                Part::File {
                    filename,
                    content,
                    content_type,
                } => {
                    checked(Role::Request, filename.clone())?;
                    checked(Role::Request, content.clone())?;
                    if let Some(content_type) = content_type {
                        checked(Role::Request, content_type.clone())?;
                    }
                }
            }
        }
        self.multipart = Some(parts);
        Ok(self)
    }

    /// The declared URL, preferring the URL path.
    pub fn target(&self) -> Option<&Url> {
        self.url_path.as_ref().or(self.url.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::RegexProperty;
    use serde_json::json;

    #[test]
    fn test_builder_chain() {
        let request = Request::new("POST")
            .unwrap()
            .url_path("/orders")
            .unwrap()
            .query("page", 1)
            .unwrap()
            .header_matching("Content-Type", "application/json")
            .unwrap()
            .json_body(json!({"id": 1}))
            .unwrap();
        assert_eq!(request.target().unwrap().query.len(), 1);
        assert!(request.url.is_none());
        assert!(request.headers.content_type().is_some());
    }

    #[test]
    fn test_query_needs_url() {
        let err = Request::new("GET").unwrap().query("a", "b").unwrap_err();
        assert!(matches!(err, ContractError::InvalidDocument(_)));
    }

    #[test]
    fn test_server_side_regex_rejected() {
        let pattern = RegexProperty::compile("/users/[0-9]+").unwrap();
        let err = Request::new("GET")
            .unwrap()
            .url(DualValue::from_server(Leaf::from(pattern)))
            .unwrap_err();
        assert!(matches!(err, ContractError::ForbiddenPatternPlacement(_)));
    }

    #[test]
    fn test_any_uuid_is_client_pattern() {
        let value = Request::any_uuid();
        assert!(matches!(value.client_value(), Some(Leaf::Pattern(_))));
    }
}
