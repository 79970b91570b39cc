//! Cross-side validation rules.

use crate::error::ContractError;
use crate::value::{DualValue, Fragment, Leaf, Side};

/// Whether a value belongs to the request or the response half of a contract.
///
/// Messaging contracts use the same roles: an input message behaves like a
/// request and an output message like a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Request,
    Response,
}

impl Role {
    /// The side whose value is used to verify what the other side sends.
    ///
    /// Requests are verified by the stub (client side), responses by the
    /// generated test (server side).
    pub fn verifying_side(self) -> Side {
        match self {
            Role::Request => Side::Client,
            Role::Response => Side::Server,
        }
    }

    /// The side that has to produce a concrete value.
    pub fn producing_side(self) -> Side {
        self.verifying_side().opposite()
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Request => "request",
            Role::Response => "response",
        }
    }
}

/// Check that a client and a server value describe compatible values.
pub fn assert_sides_match(client: &Leaf, server: &Leaf) -> Result<(), ContractError> {
    match (client.is_absent(), server.is_absent()) {
        (true, false) => {
            return Err(ContractError::AbsentConflict {
                other: server.describe(),
            })
        }
        (false, true) => {
            return Err(ContractError::AbsentConflict {
                other: client.describe(),
            })
        }
        _ => {}
    }

    let (pattern, concrete) = match (client.pattern(), server.pattern()) {
        (Some(pattern), None) => (pattern, server),
        (None, Some(pattern)) => (pattern, client),
        _ => return Ok(()),
    };
    if let Some(text) = concrete.concrete_text() {
        if !pattern.is_match(&text) {
            return Err(ContractError::SideMismatch {
                pattern: pattern.as_str().to_string(),
                value: text,
            });
        }
    }
    Ok(())
}

/// Reject patterns on the side of `role` that has to produce concrete values.
pub fn check_placement(role: Role, value: &DualValue<Leaf>) -> Result<(), ContractError> {
    let producing = role.producing_side();
    if let Some(leaf) = value.side(producing) {
        check_leaf(role, producing, leaf)?;
    }
    if let Some(leaf) = value.side(role.verifying_side()) {
        check_leaf(role, role.verifying_side(), leaf)?;
    }
    Ok(())
}

fn check_leaf(role: Role, side: Side, leaf: &Leaf) -> Result<(), ContractError> {
    let producing = side == role.producing_side();
    match leaf {
        Leaf::Pattern(_) if producing => Err(ContractError::ForbiddenPatternPlacement(format!(
            "a regular expression is not allowed on the {side} side of a {}",
            role.label()
        ))),
        Leaf::Optional(_) if producing => Err(ContractError::ForbiddenPatternPlacement(format!(
            "an optional pattern is only allowed on the {} side of a {}",
            role.verifying_side(),
            role.label()
        ))),
        Leaf::Execute(_) if side == Side::Client => {
            Err(ContractError::ForbiddenPatternPlacement(format!(
                "execute is only allowed on the server side of a {}",
                role.label()
            )))
        }
        Leaf::FromRequest(reference) if role == Role::Request => {
            Err(ContractError::InvalidReference(format!(
                "fromRequest({reference}) can only be used in a response"
            )))
        }
        Leaf::Interpolated(fragments) => {
            for fragment in fragments {
                if let Fragment::Value(inner) = fragment {
                    if let Some(leaf) = inner.side(side) {
                        check_leaf(role, side, leaf)?;
                    }
                    if let (Some(client), Some(server)) = (inner.client_value(), inner.server_value()) {
                        assert_sides_match(client, server)?;
                    }
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::MatchingStrategy;
    use crate::pattern::{RegexPattern, RegexProperty};

    fn digits() -> RegexProperty {
        RegexProperty::compile("[0-9]+").unwrap()
    }

    #[test]
    fn test_pattern_must_accept_concrete_side() {
        assert!(assert_sides_match(&Leaf::from(digits()), &Leaf::from("123")).is_ok());
        assert!(assert_sides_match(&Leaf::from("123"), &Leaf::from(digits())).is_ok());
        let err = assert_sides_match(&Leaf::from(digits()), &Leaf::from("12a")).unwrap_err();
        assert_eq!(
            err,
            ContractError::SideMismatch {
                pattern: "[0-9]+".to_string(),
                value: "12a".to_string()
            }
        );
    }

    #[test]
    fn test_optional_accepts_empty() {
        let optional = Leaf::Optional(RegexPattern::new("[0-9]+").unwrap());
        assert!(assert_sides_match(&optional, &Leaf::from("")).is_ok());
        assert!(assert_sides_match(&optional, &Leaf::from("x")).is_err());
    }

    #[test]
    fn test_absent_only_pairs_with_absent() {
        let absent = Leaf::from(MatchingStrategy::absent());
        assert!(assert_sides_match(&absent, &absent).is_ok());
        let err = assert_sides_match(&absent, &Leaf::from(MatchingStrategy::equal_to("x"))).unwrap_err();
        assert!(matches!(err, ContractError::AbsentConflict { .. }));
        let err = assert_sides_match(&Leaf::from("x"), &absent).unwrap_err();
        assert!(matches!(err, ContractError::AbsentConflict { .. }));
    }

    #[test]
    fn test_request_server_side_pattern_is_forbidden() {
        let value = DualValue::pair(Leaf::from("1"), Leaf::from(digits()));
        let err = check_placement(Role::Request, &value).unwrap_err();
        assert_eq!(
            err.to_string(),
            "a regular expression is not allowed on the server side of a request"
        );
        assert!(check_placement(Role::Response, &value).is_ok());
    }

    #[test]
    fn test_response_client_side_pattern_is_forbidden() {
        let value = DualValue::from_client(Leaf::from(digits()));
        assert!(check_placement(Role::Response, &value).is_err());
        assert!(check_placement(Role::Request, &value).is_ok());
    }

    #[test]
    fn test_optional_follows_role() {
        let optional = Leaf::Optional(RegexPattern::new("a").unwrap());
        assert!(check_placement(Role::Request, &DualValue::from_client(optional.clone())).is_ok());
        assert!(check_placement(Role::Request, &DualValue::from_server(optional.clone())).is_err());
        assert!(check_placement(Role::Response, &DualValue::from_server(optional.clone())).is_ok());
        assert!(check_placement(Role::Response, &DualValue::from_client(optional)).is_err());
    }

    #[test]
    fn test_from_request_only_in_responses() {
        let value = DualValue::single(Leaf::from(crate::value::RequestRef::Url));
        assert!(check_placement(Role::Request, &value).is_err());
        assert!(check_placement(Role::Response, &value).is_ok());
    }
}
