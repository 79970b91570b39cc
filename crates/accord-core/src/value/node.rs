//! Structured bodies built from leaves.

use crate::value::{DualValue, Leaf};
use indexmap::IndexMap;
use serde_json::Value;

/// A body tree. Objects keep their key order.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Object(IndexMap<String, Node>),
    Array(Vec<Node>),
    Value(DualValue<Leaf>),
}

impl Node {
    /// Build a tree of single-valued literal leaves from plain JSON.
    pub fn literal(json: &Value) -> Node {
        match json {
            Value::Object(map) => Node::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), Node::literal(value)))
                    .collect(),
            ),
            Value::Array(items) => Node::Array(items.iter().map(Node::literal).collect()),
            scalar => Node::Value(DualValue::single(Leaf::Literal(scalar.clone()))),
        }
    }

    pub fn leaf(value: DualValue<Leaf>) -> Node {
        Node::Value(value)
    }

    pub fn is_structured(&self) -> bool {
        !matches!(self, Node::Value(_))
    }

    /// Every leaf in document order.
    pub fn leaves(&self) -> Vec<&DualValue<Leaf>> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a DualValue<Leaf>>) {
        match self {
            Node::Object(map) => map.values().for_each(|node| node.collect_leaves(out)),
            Node::Array(items) => items.iter().for_each(|node| node.collect_leaves(out)),
            Node::Value(value) => out.push(value),
        }
    }
}

impl From<Value> for Node {
    fn from(json: Value) -> Self {
        Node::literal(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_literal_keeps_order_and_shape() {
        let node = Node::literal(&json!({"b": 1, "a": [true, "x"]}));
        let Node::Object(map) = &node else {
            panic!("expected object");
        };
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(node.leaves().len(), 3);
        assert!(node.is_structured());
    }
}
