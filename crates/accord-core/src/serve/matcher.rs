//! Request matching against compiled request matchers.

use crate::compile::{CompiledEntry, CompiledRequest, UrlKind};
use crate::serve::ServedRequest;

/// Check whether a request satisfies every matcher of a compiled request.
pub fn request_matches(compiled: &CompiledRequest, request: &ServedRequest) -> bool {
    if !compiled.method.matcher.accepts_text(Some(&request.method)) {
        return false;
    }

    let url = match compiled.url.kind {
        UrlKind::Path => request.path.clone(),
        UrlKind::Url if compiled.url.query.is_empty() => request.url(),
        UrlKind::Url => request.path.clone(),
    };
    if !compiled.url.value.matcher.accepts_text(Some(&url)) {
        return false;
    }

    entries_match(&compiled.url.query, |name| request.query_values(name))
        && entries_match(&compiled.headers, |name| request.header_values(name))
        && entries_match(&compiled.cookies, |name| request.cookie(name).into_iter().collect())
        && body_matches(compiled, request)
}

/// Each entry must accept one of the values sent under its name, or the
/// missing value when none was sent.
fn entries_match<'r>(entries: &[CompiledEntry], values: impl Fn(&str) -> Vec<&'r str>) -> bool {
    entries.iter().all(|entry| {
        let sent = values(&entry.name);
        if sent.is_empty() {
            entry.value.matcher.accepts_text(None)
        } else {
            sent.iter().any(|value| entry.value.matcher.accepts_text(Some(value)))
        }
    })
}

fn body_matches(compiled: &CompiledRequest, request: &ServedRequest) -> bool {
    let body = request.body.as_deref();
    if let Some(expected) = &compiled.body {
        if !expected.matcher.accepts(body) {
            return false;
        }
    }
    compiled
        .multipart
        .iter()
        .all(|part| body.is_some_and(|body| part.matcher.is_match(body)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::Compiler;
    use crate::contract::{Contract, Request, Response};
    use crate::pattern::NamedPattern;
    use serde_json::json;

    fn compiled(request: Request) -> CompiledRequest {
        let contract = Contract::http("match", request, Response::ok());
        Compiler::default().compile(&contract).unwrap().http.unwrap().request
    }

    #[test]
    fn test_method_url_and_query() {
        let request = compiled(
            Request::new("GET")
                .unwrap()
                .url_path("/users")
                .unwrap()
                .query("limit", Request::any(NamedPattern::PositiveInt))
                .unwrap(),
        );
        assert!(request_matches(&request, &ServedRequest::new("GET", "/users?limit=10")));
        assert!(!request_matches(&request, &ServedRequest::new("GET", "/users?limit=x")));
        assert!(!request_matches(&request, &ServedRequest::new("GET", "/users")));
        assert!(!request_matches(&request, &ServedRequest::new("POST", "/users?limit=10")));
    }

    #[test]
    fn test_headers_ignore_case() {
        let request = compiled(
            Request::new("GET")
                .unwrap()
                .url("/ping")
                .unwrap()
                .header("X-Api-Key", "secret")
                .unwrap(),
        );
        let served = ServedRequest::new("GET", "/ping").with_header("x-api-key", "secret");
        assert!(request_matches(&request, &served));
        let wrong = ServedRequest::new("GET", "/ping").with_header("X-Api-Key", "other");
        assert!(!request_matches(&request, &wrong));
    }

    #[test]
    fn test_json_body() {
        let request = compiled(
            Request::new("POST")
                .unwrap()
                .url("/orders")
                .unwrap()
                .json_body(json!({"item": "book", "count": 2}))
                .unwrap(),
        );
        let served = ServedRequest::new("POST", "/orders").with_body(r#"{"count": 2, "item": "book"}"#);
        assert!(request_matches(&request, &served));
        let wrong = ServedRequest::new("POST", "/orders").with_body(r#"{"count": 3, "item": "book"}"#);
        assert!(!request_matches(&request, &wrong));
        assert!(!request_matches(&request, &ServedRequest::new("POST", "/orders")));
    }
}
