//! Laws the compiler keeps for any input.

use accord_core::assertions::verify_response;
use accord_core::compile::{Compiler, TemplateValue};
use accord_core::contract::{Contract, Request, Response};
use accord_core::pattern::{ExampleCache, ExampleGenerator, NamedPattern, RegexPattern, RegexProperty, SeededGenerator};
use accord_core::serve::{render_response, StubSet};
use accord_core::stub::StubMapping;
use accord_core::value::{DualValue, Leaf, Node};
use accord_core::CompilerConfig;
use indexmap::IndexMap;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

const AD_HOC: &[&str] = &[
    "[a-z]{1,8}",
    "[0-9]{3}-[0-9]{4}",
    "(foo|bar)+baz?",
    "[A-F0-9]{2}(:[A-F0-9]{2}){5}",
    "v[0-9]+\\.[0-9]+(\\.[0-9]+)?",
    "\\w+@\\w+\\.(com|org)",
    "(?i)yes|no",
    "[^,;]{1,5}",
];

proptest! {
    #[test]
    fn generated_examples_match_named_patterns(seed in any::<u64>(), index in 0..NamedPattern::ALL.len()) {
        let named = NamedPattern::ALL[index];
        let cache = ExampleCache::new(SeededGenerator::new(seed));
        let example = cache.example_text(&named.property()).unwrap();
        prop_assert!(named.pattern().is_match(&example), "{} produced {}", named, example);
    }

    #[test]
    fn generated_examples_match_ad_hoc_patterns(seed in any::<u64>(), index in 0..AD_HOC.len(), attempt in 0u32..4) {
        let pattern = RegexPattern::new(AD_HOC[index]).unwrap();
        let example = SeededGenerator::new(seed).generate(&pattern, attempt).unwrap();
        prop_assert!(pattern.is_match(&example), "{} produced {}", AD_HOC[index], example);
    }

    #[test]
    fn stubs_are_deterministic_per_seed(seed in any::<u64>()) {
        let contract = uuid_contract();
        let config = CompilerConfig { seed, ..CompilerConfig::default() };
        let first = Compiler::new(config.clone()).compile(&contract).unwrap();
        let second = Compiler::new(config.clone()).compile(&contract).unwrap();
        prop_assert_eq!(
            StubMapping::from_compiled(&first, &config).unwrap(),
            StubMapping::from_compiled(&second, &config).unwrap()
        );
    }

    #[test]
    fn rendered_stub_satisfies_test_assertions(seed in any::<u64>()) {
        let compiled = Compiler::new(CompilerConfig { seed, ..CompilerConfig::default() })
            .compile(&uuid_contract())
            .unwrap()
            .http
            .unwrap();
        let request = compiled.request.served().unwrap();
        let response = render_response(&compiled.response, &request, &mut StdRng::seed_from_u64(seed));
        prop_assert_eq!(verify_response(&compiled.response, &response), Vec::<String>::new());
    }
}

fn uuid_contract() -> Contract {
    let mut fields = IndexMap::new();
    fields.insert("id".to_string(), Node::leaf(Response::any(NamedPattern::Uuid)));
    fields.insert("when".to_string(), Node::leaf(Response::any(NamedPattern::DateTime)));
    fields.insert("count".to_string(), Node::leaf(Response::any(NamedPattern::PositiveInt)));
    Contract::http(
        "uuid",
        Request::new("GET")
            .unwrap()
            .url(Request::any_matching("/things/[0-9]{1,4}").unwrap())
            .unwrap(),
        Response::ok().body(Node::Object(fields)).unwrap(),
    )
}

#[test]
fn test_sides_compile_independently() {
    let url = DualValue::pair(
        Leaf::Pattern(RegexProperty::compile("/orders/[0-9]+").unwrap()),
        Leaf::from("/orders/17"),
    );
    let contract = Contract::http(
        "order",
        Request::new("GET").unwrap().url(url).unwrap(),
        Response::ok(),
    );
    let compiled = Compiler::default().compile(&contract).unwrap().http.unwrap();

    assert!(compiled.request.url.value.matcher.accepts_text(Some("/orders/99")));
    assert_eq!(
        compiled.request.url.value.template,
        TemplateValue::Literal(json!("/orders/17"))
    );
}

#[test]
fn test_stub_serves_the_request_the_test_sends() {
    let compiler = Compiler::default();
    let compiled = compiler.compile(&uuid_contract()).unwrap();
    let stubs = StubSet::default();
    assert!(stubs.add(&compiled));
    let request = compiled.http.as_ref().unwrap().request.served().unwrap();
    let response = stubs.respond(&request).unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(
        verify_response(&compiled.http.unwrap().response, &response),
        Vec::<String>::new()
    );
}

#[test]
fn test_overrides_are_idempotent() {
    let contract = uuid_contract().with_metadata(
        "wiremock",
        json!({"stubMapping": {"priority": 1, "response": {"headers": {"X-Extra": "1"}}}}),
    );
    let compiler = Compiler::default();
    let compiled = compiler.compile(&contract).unwrap();
    let once = StubMapping::from_compiled(&compiled, compiler.config()).unwrap().unwrap();
    assert_eq!(once.priority, Some(1));
    assert_eq!(once.response.headers["X-Extra"], json!("1"));

    let overrides = accord_core::stub::StubOverrides::from_metadata(&compiled.metadata)
        .unwrap()
        .unwrap();
    let mut twice = once.clone();
    overrides.apply(&mut twice).unwrap();
    assert_eq!(once, twice);
}
