//! Leaf compilation: one dual value becomes a comparison for the verifying
//! side and a template value for the producing side.

use crate::compile::graph::{Comparison, TemplatePart, TemplateValue};
use crate::contract::validate;
use crate::error::ContractError;
use crate::matching::{MatchingStrategy, StrategyType};
use crate::pattern::{ExampleCache, RegexPattern};
use crate::serve::ServedRequest;
use crate::value::{text_of, DualValue, Fragment, Leaf, RequestRef, Role, Side};
use serde_json::Value;

/// What leaf compilation can see besides the leaf itself.
pub(crate) struct Context<'a> {
    pub cache: &'a ExampleCache,
    /// The request the generated test sends, used to resolve `fromRequest`
    /// on the verifying side of a response.
    pub request: Option<&'a ServedRequest>,
}

/// Compile one value. A side left empty falls back to the other one, which
/// must then be usable on both.
pub(crate) fn compile_value(
    value: &DualValue<Leaf>,
    role: Role,
    ctx: &Context<'_>,
) -> Result<(Comparison, TemplateValue), ContractError> {
    validate(role, value)?;
    let (_, verifying) = value.side_or_other(role.verifying_side());
    let (_, producing) = value.side_or_other(role.producing_side());
    Ok((comparison(verifying, role, ctx)?, template(producing, role, ctx)?))
}

fn comparison(leaf: &Leaf, role: Role, ctx: &Context<'_>) -> Result<Comparison, ContractError> {
    Ok(match leaf {
        Leaf::Literal(value) => Comparison::EqualTo(value.clone()),
        Leaf::Pattern(property) => Comparison::Matching(property.pattern().clone()),
        Leaf::Optional(pattern) => Comparison::Matching(pattern.optional()?),
        Leaf::Generated(property) => Comparison::EqualTo(ctx.cache.example(property)?),
        Leaf::Strategy(strategy) => strategy_comparison(strategy)?,
        Leaf::Bytes(bytes) => Comparison::BinaryEqualTo(bytes.clone()),
        Leaf::FromRequest(reference) => Comparison::EqualTo(resolve(reference, role, ctx)?),
        Leaf::Execute(command) => match role {
            Role::Response => Comparison::Command(command.clone()),
            Role::Request => {
                return Err(ContractError::MissingConcreteValue {
                    side: Side::Client,
                    value: leaf.describe(),
                })
            }
        },
        Leaf::Interpolated(fragments) => interpolated_comparison(fragments, role, ctx)?,
    })
}

fn strategy_comparison(strategy: &MatchingStrategy) -> Result<Comparison, ContractError> {
    let pattern = || {
        strategy
            .pattern()
            .ok_or_else(|| ContractError::UnsupportedMatcher(strategy.to_string()))
    };
    Ok(match strategy.kind() {
        StrategyType::EqualTo => Comparison::EqualTo(strategy.value().clone()),
        StrategyType::Contains => Comparison::Contains(text_of(strategy.value())),
        StrategyType::Matching => Comparison::Matching(pattern()?),
        StrategyType::NotMatching => Comparison::NotMatching(pattern()?),
        StrategyType::EqualToJson => Comparison::EqualToJson(json_payload(strategy.value())),
        StrategyType::EqualToXml => Comparison::EqualToXml(text_of(strategy.value())),
        StrategyType::Absent => Comparison::Absent,
        StrategyType::BinaryEqualTo => Comparison::BinaryEqualTo(
            strategy
                .bytes()
                .ok_or_else(|| ContractError::UnsupportedMatcher(strategy.to_string()))?,
        ),
    })
}

/// JSON strategies accept either a JSON value or a string holding one.
fn json_payload(value: &Value) -> Value {
    match value {
        Value::String(text) => serde_json::from_str(text).unwrap_or_else(|_| value.clone()),
        other => other.clone(),
    }
}

fn resolve(reference: &RequestRef, role: Role, ctx: &Context<'_>) -> Result<Value, ContractError> {
    if role == Role::Request {
        return Err(ContractError::InvalidReference(format!(
            "[{}] can only be used in a response",
            reference
        )));
    }
    ctx.request
        .and_then(|request| request.resolve(reference))
        .ok_or_else(|| {
            ContractError::InvalidReference(format!(
                "[{}] does not resolve against the test request",
                reference
            ))
        })
}

/// A string assembled from literal text and values. Without any pattern it
/// is compared by equality, otherwise the pieces form one regex.
fn interpolated_comparison(
    fragments: &[Fragment],
    role: Role,
    ctx: &Context<'_>,
) -> Result<Comparison, ContractError> {
    let mut regex = String::new();
    let mut literal = String::new();
    let mut has_pattern = false;

    for fragment in fragments {
        let text = match fragment {
            Fragment::Text(text) => text.clone(),
            Fragment::Value(value) => {
                let (_, leaf) = value.side_or_other(role.verifying_side());
                match leaf {
                    Leaf::Pattern(property) => {
                        has_pattern = true;
                        regex.push_str(&format!("(?:{})", property.pattern().as_str()));
                        continue;
                    }
                    Leaf::Optional(pattern) => {
                        has_pattern = true;
                        regex.push_str(&format!("(?:{})?", pattern.as_str()));
                        continue;
                    }
                    Leaf::Literal(value) => text_of(value),
                    Leaf::Generated(property) => ctx.cache.example_text(property)?,
                    Leaf::FromRequest(reference) => text_of(&resolve(reference, role, ctx)?),
                    other => return Err(not_interpolable(other)),
                }
            }
        };
        regex.push_str(&regex::escape(&text));
        literal.push_str(&text);
    }

    if has_pattern {
        Ok(Comparison::Matching(RegexPattern::new(regex)?))
    } else {
        Ok(Comparison::EqualTo(Value::String(literal)))
    }
}

fn template(leaf: &Leaf, role: Role, ctx: &Context<'_>) -> Result<TemplateValue, ContractError> {
    let missing = || ContractError::MissingConcreteValue {
        side: role.producing_side(),
        value: leaf.describe(),
    };
    Ok(match leaf {
        Leaf::Literal(value) => TemplateValue::Literal(value.clone()),
        Leaf::Generated(property) => TemplateValue::Literal(ctx.cache.example(property)?),
        Leaf::Pattern(_) | Leaf::Optional(_) => return Err(missing()),
        Leaf::Strategy(strategy) => match strategy.kind() {
            StrategyType::EqualTo => TemplateValue::Literal(strategy.value().clone()),
            StrategyType::EqualToJson => TemplateValue::Literal(json_payload(strategy.value())),
            StrategyType::Contains | StrategyType::EqualToXml => {
                TemplateValue::Literal(Value::String(text_of(strategy.value())))
            }
            StrategyType::BinaryEqualTo => {
                TemplateValue::Bytes(strategy.bytes().ok_or_else(missing)?)
            }
            StrategyType::Absent => TemplateValue::Omitted,
            StrategyType::Matching | StrategyType::NotMatching => return Err(missing()),
        },
        Leaf::Bytes(bytes) => TemplateValue::Bytes(bytes.clone()),
        Leaf::FromRequest(reference) => match role {
            Role::Response => TemplateValue::FromRequest(reference.clone()),
            Role::Request => {
                return Err(ContractError::InvalidReference(format!(
                    "[{}] can only be used in a response",
                    reference
                )))
            }
        },
        Leaf::Execute(command) => match role {
            Role::Request => TemplateValue::Execute(command.clone()),
            Role::Response => return Err(missing()),
        },
        Leaf::Interpolated(fragments) => interpolated_template(fragments, role, ctx)?,
    })
}

fn interpolated_template(
    fragments: &[Fragment],
    role: Role,
    ctx: &Context<'_>,
) -> Result<TemplateValue, ContractError> {
    fn push_text(parts: &mut Vec<TemplatePart>, text: String) {
        match parts.last_mut() {
            Some(TemplatePart::Text(last)) => last.push_str(&text),
            _ => parts.push(TemplatePart::Text(text)),
        }
    }

    let mut parts: Vec<TemplatePart> = Vec::new();

    for fragment in fragments {
        match fragment {
            Fragment::Text(text) => push_text(&mut parts, text.clone()),
            Fragment::Value(value) => {
                let (_, leaf) = value.side_or_other(role.producing_side());
                match leaf {
                    Leaf::Literal(value) => push_text(&mut parts, text_of(value)),
                    Leaf::Generated(property) => {
                        push_text(&mut parts, ctx.cache.example_text(property)?)
                    }
                    Leaf::FromRequest(reference) if role == Role::Response => {
                        parts.push(TemplatePart::FromRequest(reference.clone()))
                    }
                    Leaf::Pattern(_) | Leaf::Optional(_) => {
                        return Err(ContractError::MissingConcreteValue {
                            side: role.producing_side(),
                            value: leaf.describe(),
                        })
                    }
                    other => return Err(not_interpolable(other)),
                }
            }
        }
    }

    match parts.as_slice() {
        [] => Ok(TemplateValue::Literal(Value::String(String::new()))),
        [TemplatePart::Text(text)] => Ok(TemplateValue::Literal(Value::String(text.clone()))),
        _ => Ok(TemplateValue::Interpolated(parts)),
    }
}

fn not_interpolable(leaf: &Leaf) -> ContractError {
    ContractError::UnsupportedMatcher(format!("{} cannot be interpolated", leaf.describe()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{NamedPattern, RegexProperty};
    use crate::value::{client, server, value};
    use serde_json::json;

    fn ctx(cache: &ExampleCache) -> Context<'_> {
        Context { cache, request: None }
    }

    #[test]
    fn test_request_pattern_pair() {
        let cache = ExampleCache::default();
        let dual = value(
            client(RegexProperty::compile("[0-9]+").unwrap()),
            server("42"),
        )
        .unwrap();
        let (comparison, template) = compile_value(&dual, Role::Request, &ctx(&cache)).unwrap();
        assert!(comparison.accepts_text(Some("7")));
        assert_eq!(template, TemplateValue::Literal(json!("42")));
    }

    #[test]
    fn test_generated_value_matches_its_pattern() {
        let cache = ExampleCache::default();
        let dual = crate::contract::any(Role::Response, NamedPattern::Uuid);
        let (comparison, template) = compile_value(&dual, Role::Response, &ctx(&cache)).unwrap();
        let example = template.literal().unwrap().as_str().unwrap().to_string();
        assert!(comparison.accepts_text(Some(&example)));
    }

    #[test]
    fn test_missing_server_value() {
        let cache = ExampleCache::default();
        let dual = DualValue::from_client(Leaf::from(RegexProperty::compile("[a-z]+").unwrap()));
        let err = compile_value(&dual, Role::Request, &ctx(&cache)).unwrap_err();
        assert_eq!(err.to_string(), "server value is not available for [[a-z]+]");
    }

    #[test]
    fn test_from_request_in_response() {
        let cache = ExampleCache::default();
        let request = ServedRequest::new("GET", "/a").with_header("X-Trace", "t-1");
        let ctx = Context { cache: &cache, request: Some(&request) };
        let dual = DualValue::single(Leaf::FromRequest(RequestRef::header("X-Trace")));
        let (comparison, template) = compile_value(&dual, Role::Response, &ctx).unwrap();
        assert_eq!(comparison, Comparison::EqualTo(json!("t-1")));
        assert!(template.is_deferred());
    }

    #[test]
    fn test_execute_only_for_the_test_side() {
        let cache = ExampleCache::default();
        let dual = DualValue::from_server(Leaf::Execute("assertId($it)".into()));
        assert!(compile_value(&dual, Role::Response, &ctx(&cache)).is_err());

        let dual = DualValue::pair(Leaf::from("1"), Leaf::Execute("assertId($it)".into()));
        let (comparison, template) = compile_value(&dual, Role::Response, &ctx(&cache)).unwrap();
        assert_eq!(comparison, Comparison::Command("assertId($it)".into()));
        assert_eq!(template, TemplateValue::Literal(json!("1")));
    }

    #[test]
    fn test_interpolated_with_pattern() {
        let cache = ExampleCache::default();
        let id = value(
            client(RegexProperty::compile("[0-9]+").unwrap()),
            server("42"),
        )
        .unwrap();
        let dual = DualValue::single(Leaf::Interpolated(vec![
            Fragment::Text("/orders/".into()),
            Fragment::Value(id),
        ]));
        let (comparison, template) = compile_value(&dual, Role::Request, &ctx(&cache)).unwrap();
        assert!(comparison.accepts_text(Some("/orders/9")));
        assert!(!comparison.accepts_text(Some("/orders/x")));
        assert_eq!(template, TemplateValue::Literal(json!("/orders/42")));
    }

    #[test]
    fn test_absent_strategy_is_omitted() {
        let cache = ExampleCache::default();
        let dual = DualValue::single(Leaf::Strategy(MatchingStrategy::absent()));
        let (comparison, template) = compile_value(&dual, Role::Request, &ctx(&cache)).unwrap();
        assert_eq!(comparison, Comparison::Absent);
        assert_eq!(template, TemplateValue::Omitted);
    }
}
