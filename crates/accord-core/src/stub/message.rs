//! Message stubs: what a messaging stub runner listens for and emits.

use crate::compile::{CompiledBody, CompiledContract, CompiledEntry, CompiledValue, TemplateNode, TemplateValue};
use crate::error::{CompileError, ContractError};
use crate::stub::wiremock::comparison_json;
use crate::value::text_of;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageStub {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<IncomingMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutgoingMessage>,
}

/// Matchers for a message that triggers the stub.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_from: Option<Value>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub body_patterns: Vec<Value>,
}

/// The message the stub sends.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    pub sent_to: String,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

fn literal_text(value: &CompiledValue) -> Option<String> {
    value.template.literal().map(text_of)
}

fn body_value(body: &CompiledBody) -> Option<Value> {
    match &body.template {
        TemplateNode::Leaf(TemplateValue::Omitted) => None,
        TemplateNode::Leaf(TemplateValue::Literal(value)) => Some(value.clone()),
        other => other.to_json(),
    }
}

fn header_matchers(entries: &[CompiledEntry]) -> Result<IndexMap<String, Value>, ContractError> {
    entries
        .iter()
        .map(|entry| Ok((entry.name.clone(), comparison_json(&entry.value.matcher)?)))
        .collect()
}

impl MessageStub {
    /// `None` for HTTP contracts and ignored contracts.
    pub fn from_compiled(compiled: &CompiledContract) -> Result<Option<MessageStub>, CompileError> {
        let Some(messaging) = compiled.messaging.as_ref().filter(|_| !compiled.ignored) else {
            return Ok(None);
        };
        let fail = |path: &'static str| {
            let contract = compiled.name.clone();
            move |e: ContractError| e.at(contract, path)
        };

        let input = match &messaging.input {
            Some(input) if input.message_from.is_some() || input.body.is_some() => {
                let body_patterns = match &input.body {
                    Some(body) => crate::stub::wiremock::body_patterns(body).map_err(fail("input.messageBody"))?,
                    None => Vec::new(),
                };
                Some(IncomingMessage {
                    message_from: input
                        .message_from
                        .as_ref()
                        .map(|from| comparison_json(&from.matcher))
                        .transpose()
                        .map_err(fail("input.messageFrom"))?,
                    headers: header_matchers(&input.headers).map_err(fail("input.messageHeaders"))?,
                    body_patterns,
                })
            }
            _ => None,
        };

        let output = match &messaging.output {
            Some(output) => {
                let sent_to = literal_text(&output.sent_to).ok_or_else(|| {
                    fail("output.sentTo")(ContractError::MissingConcreteValue {
                        side: crate::value::Side::Client,
                        value: format!("{:?}", output.sent_to.matcher),
                    })
                })?;
                Some(OutgoingMessage {
                    sent_to,
                    headers: output
                        .headers
                        .iter()
                        .filter_map(|entry| literal_text(&entry.value).map(|v| (entry.name.clone(), v)))
                        .collect(),
                    body: output.body.as_ref().and_then(body_value),
                })
            }
            None => None,
        };

        Ok(Some(MessageStub {
            name: compiled.name.clone(),
            triggered_by: messaging.input.as_ref().and_then(|input| input.triggered_by.clone()),
            input,
            output,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::Compiler;
    use crate::contract::{Contract, Input, OutputMessage};
    use crate::pattern::NamedPattern;
    use crate::value::Node;
    use indexmap::IndexMap;
    use serde_json::json;

    #[test]
    fn test_output_message_stub() {
        let mut fields = IndexMap::new();
        fields.insert("id".to_string(), Node::leaf(crate::contract::any(crate::value::Role::Response, NamedPattern::Uuid)));
        let contract = Contract {
            input: Some(Input::triggered_by("createOrder()")),
            output: Some(
                OutputMessage::new("orders")
                    .unwrap()
                    .header("type", "created")
                    .unwrap()
                    .body(Node::Object(fields))
                    .unwrap(),
            ),
            ..Contract::new("order_created")
        };
        let compiled = Compiler::default().compile(&contract).unwrap();
        let stub = MessageStub::from_compiled(&compiled).unwrap().unwrap();
        assert_eq!(stub.triggered_by.as_deref(), Some("createOrder()"));
        assert!(stub.input.is_none());
        let output = stub.output.unwrap();
        assert_eq!(output.sent_to, "orders");
        assert_eq!(output.headers["type"], "created");
        let id = output.body.unwrap()["id"].as_str().unwrap().to_string();
        assert!(uuid::Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_input_message_matchers() {
        let contract = Contract {
            input: Some(
                Input::message_from("incoming")
                    .unwrap()
                    .body(Node::literal(&json!({"id": 1})))
                    .unwrap(),
            ),
            ..Contract::new("consume")
        };
        let compiled = Compiler::default().compile(&contract).unwrap();
        let stub = MessageStub::from_compiled(&compiled).unwrap().unwrap();
        let input = stub.input.unwrap();
        assert_eq!(input.message_from, Some(json!({"equalTo": "incoming"})));
        assert_eq!(input.body_patterns.len(), 1);
    }
}
