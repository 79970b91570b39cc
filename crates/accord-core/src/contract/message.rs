use crate::contract::{checked, checked_node, Headers, IntoDual};
use crate::error::ContractError;
use crate::matching::BodyMatchers;
use crate::value::{DualValue, Leaf, Node, Role};

/// What triggers a messaging contract: a method call or an incoming message.
///
/// An incoming message is verified like a request.
#[derive(Debug, Clone)]
pub struct Input {
    pub triggered_by: Option<String>,
    pub message_from: Option<DualValue<Leaf>>,
    pub headers: Headers,
    pub body: Option<Node>,
    pub body_matchers: BodyMatchers,
    pub assert_that: Option<String>,
}

impl Input {
    fn empty() -> Self {
        Self {
            triggered_by: None,
            message_from: None,
            headers: Headers::for_role(Role::Request),
            body: None,
            body_matchers: BodyMatchers::default(),
            assert_that: None,
        }
    }

    pub fn triggered_by(method: impl Into<String>) -> Self {
        Self {
            triggered_by: Some(method.into()),
            ..Self::empty()
        }
    }

    pub fn message_from(destination: impl IntoDual) -> Result<Self, ContractError> {
        Ok(Self {
            message_from: Some(checked(Role::Request, destination.into_dual())?),
            ..Self::empty()
        })
    }

    pub fn header(mut self, name: impl Into<String>, value: impl IntoDual) -> Result<Self, ContractError> {
        self.headers.add(name, value)?;
        Ok(self)
    }

    pub fn body(mut self, body: Node) -> Result<Self, ContractError> {
        checked_node(Role::Request, &body)?;
        self.body = Some(body);
        Ok(self)
    }

    pub fn assert_that(mut self, method: impl Into<String>) -> Self {
        self.assert_that = Some(method.into());
        self
    }
}

/// The message a contract expects to be sent. Verified like a response.
#[derive(Debug, Clone)]
pub struct OutputMessage {
    pub sent_to: DualValue<Leaf>,
    pub headers: Headers,
    pub body: Option<Node>,
    pub body_matchers: BodyMatchers,
    pub assert_that: Option<String>,
}

impl OutputMessage {
    pub fn new(sent_to: impl IntoDual) -> Result<Self, ContractError> {
        Ok(Self {
            sent_to: checked(Role::Response, sent_to.into_dual())?,
            headers: Headers::for_role(Role::Response),
            body: None,
            body_matchers: BodyMatchers::default(),
            assert_that: None,
        })
    }

    pub fn header(mut self, name: impl Into<String>, value: impl IntoDual) -> Result<Self, ContractError> {
        self.headers.add(name, value)?;
        Ok(self)
    }

    pub fn body(mut self, body: Node) -> Result<Self, ContractError> {
        checked_node(Role::Response, &body)?;
        self.body = Some(body);
        Ok(self)
    }

    pub fn body_matchers(mut self, matchers: BodyMatchers) -> Self {
        self.body_matchers = matchers;
        self
    }

    pub fn assert_that(mut self, method: impl Into<String>) -> Self {
        self.assert_that = Some(method.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_message_builder() {
        let output = OutputMessage::new("orders")
            .unwrap()
            .header("eventType", "created")
            .unwrap()
            .body(Node::literal(&json!({"id": 1})))
            .unwrap();
        assert_eq!(output.headers.entries().len(), 1);
        assert!(output.body.is_some());
    }

    #[test]
    fn test_input_triggered_by() {
        let input = Input::triggered_by("sendOrder()").assert_that("orderSent()");
        assert_eq!(input.triggered_by.as_deref(), Some("sendOrder()"));
        assert!(input.message_from.is_none());
    }
}
