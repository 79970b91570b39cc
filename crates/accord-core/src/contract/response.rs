use crate::contract::{any, any_matching, checked, checked_node, Headers, IntoDual};
use crate::error::ContractError;
use crate::matching::BodyMatchers;
use crate::pattern::NamedPattern;
use crate::stub::Delay;
use crate::value::{DualValue, Leaf, Node, Role};
use serde_json::Value;

/// The response half of an HTTP contract.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: DualValue<Leaf>,
    pub headers: Headers,
    pub cookies: Headers,
    pub body: Option<Node>,
    pub body_matchers: BodyMatchers,
    pub delay: Option<Delay>,
    pub is_async: bool,
}

impl Response {
    pub fn new(status: impl IntoDual) -> Result<Self, ContractError> {
        Ok(Self {
            status: checked(Role::Response, status.into_dual())?,
            headers: Headers::for_role(Role::Response),
            cookies: Headers::for_role(Role::Response),
            body: None,
            body_matchers: BodyMatchers::default(),
            delay: None,
            is_async: false,
        })
    }

    pub fn ok() -> Self {
        Self {
            status: DualValue::single(Leaf::from(200)),
            headers: Headers::for_role(Role::Response),
            cookies: Headers::for_role(Role::Response),
            body: None,
            body_matchers: BodyMatchers::default(),
            delay: None,
            is_async: false,
        }
    }

    /// A generated value for the stub, a library pattern for the test.
    pub fn any(named: NamedPattern) -> DualValue<Leaf> {
        any(Role::Response, named)
    }

    pub fn any_matching(source: &str) -> Result<DualValue<Leaf>, ContractError> {
        any_matching(Role::Response, source)
    }

    pub fn any_uuid() -> DualValue<Leaf> {
        Self::any(NamedPattern::Uuid)
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
        checked_node(Role::Response, &body)?;
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

    pub fn delay(mut self, delay: Delay) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn asynchronous(mut self) -> Self {
        self.is_async = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::RegexProperty;

    #[test]
    fn test_client_side_regex_rejected() {
        let pattern = RegexProperty::compile("[0-9]+").unwrap();
        let err = Response::new(200)
            .unwrap()
            .header("X-Id", DualValue::from_client(Leaf::from(pattern)))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "a regular expression is not allowed on the client side of a response"
        );
    }

    #[test]
    fn test_delay_is_one_of() {
        let response = Response::ok().delay(Delay::Fixed { milliseconds: 10 });
        assert_eq!(response.delay, Some(Delay::Fixed { milliseconds: 10 }));
    }
}
