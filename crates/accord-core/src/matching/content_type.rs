//! Body content type detection.

use crate::value::{Fragment, Leaf, Node, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Json,
    Xml,
    Form,
    Text,
    Binary,
    Unknown,
}

impl ContentType {
    /// Classify a `Content-Type` header value.
    pub fn from_header(value: &str) -> ContentType {
        let value = value.to_ascii_lowercase();
        if value.contains("json") {
            ContentType::Json
        } else if value.contains("xml") {
            ContentType::Xml
        } else if value.contains("x-www-form-urlencoded") {
            ContentType::Form
        } else if value.contains("octet-stream") {
            ContentType::Binary
        } else if value.starts_with("text/") {
            ContentType::Text
        } else {
            ContentType::Unknown
        }
    }

    /// Guess the content type from the body itself.
    pub fn sniff(body: &Node) -> ContentType {
        let leaf = match body {
            Node::Object(_) | Node::Array(_) => return ContentType::Json,
            Node::Value(value) => value.side_or_other(Side::Client).1,
        };
        match leaf {
            Leaf::Bytes(_) => ContentType::Binary,
            Leaf::Literal(serde_json::Value::String(text)) => sniff_text(text),
            Leaf::Interpolated(fragments) => {
                let text: String = fragments
                    .iter()
                    .filter_map(|fragment| match fragment {
                        Fragment::Text(text) => Some(text.as_str()),
                        Fragment::Value(_) => None,
                    })
                    .collect();
                sniff_text(&text)
            }
            _ => ContentType::Unknown,
        }
    }

    /// A declared header wins over sniffing.
    pub fn resolve(header: Option<&str>, body: &Node) -> ContentType {
        match header.map(ContentType::from_header) {
            Some(declared) if declared != ContentType::Unknown => declared,
            _ => ContentType::sniff(body),
        }
    }
}

fn sniff_text(text: &str) -> ContentType {
    let trimmed = text.trim_start();
    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(text).is_ok()
    {
        ContentType::Json
    } else if trimmed.starts_with('<') {
        ContentType::Xml
    } else {
        ContentType::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::DualValue;
    use serde_json::json;

    fn text_body(text: &str) -> Node {
        Node::Value(DualValue::single(Leaf::from(text)))
    }

    #[test]
    fn test_from_header() {
        assert_eq!(ContentType::from_header("application/json;charset=UTF-8"), ContentType::Json);
        assert_eq!(ContentType::from_header("application/vnd.api+json"), ContentType::Json);
        assert_eq!(ContentType::from_header("text/xml"), ContentType::Xml);
        assert_eq!(
            ContentType::from_header("application/x-www-form-urlencoded"),
            ContentType::Form
        );
        assert_eq!(ContentType::from_header("text/plain"), ContentType::Text);
    }

    #[test]
    fn test_sniff() {
        assert_eq!(ContentType::sniff(&Node::literal(&json!({"a": 1}))), ContentType::Json);
        assert_eq!(ContentType::sniff(&text_body("[1, 2]")), ContentType::Json);
        assert_eq!(ContentType::sniff(&text_body("<a>1</a>")), ContentType::Xml);
        assert_eq!(ContentType::sniff(&text_body("{not json")), ContentType::Text);
    }

    #[test]
    fn test_declared_header_wins() {
        let body = text_body("{\"a\": 1}");
        assert_eq!(ContentType::resolve(Some("text/plain"), &body), ContentType::Text);
        assert_eq!(ContentType::resolve(Some("application/x-foo"), &body), ContentType::Json);
        assert_eq!(ContentType::resolve(None, &body), ContentType::Json);
    }
}
