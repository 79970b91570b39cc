//! The contract model and its builders.
//!
//! - `request` / `response`: the HTTP halves of a contract
//! - `headers`: headers and cookies, with the role-specific `matching` policy
//! - `message`: messaging contracts (input and output messages)
//! - `document`: loading contracts from JSON or YAML documents
//!
//! Builders validate every value as it is added, so a contract built through
//! them already satisfies the side rules. The compiler re-checks everything
//! because the fields are public.

mod document;
mod headers;
mod message;
mod request;
mod response;

pub use document::{ContractDocument, DocumentFormat};
pub use headers::{request_policy, response_policy, Header, Headers, MatchPolicy};
pub use message::{Input, OutputMessage};
pub use request::{Multipart, Part, QueryParameter, Request, Url};
pub use response::Response;

use crate::error::ContractError;
use crate::matching::MatchingStrategy;
use crate::pattern::{NamedPattern, RegexProperty};
use crate::stub::ScenarioStep;
use crate::value::{assert_sides_match, check_placement, DualValue, Leaf, Node, RequestRef, Role};
use indexmap::IndexMap;
use serde_json::Value;

/// Anything that can stand for a contract value.
///
/// Plain values become single-valued leaves, dual values pass through.
pub trait IntoDual {
    fn into_dual(self) -> DualValue<Leaf>;
}

impl IntoDual for DualValue<Leaf> {
    fn into_dual(self) -> DualValue<Leaf> {
        self
    }
}

macro_rules! single_valued {
    ($($ty:ty),*) => {
        $(impl IntoDual for $ty {
            fn into_dual(self) -> DualValue<Leaf> {
                DualValue::single(Leaf::from(self))
            }
        })*
    };
}

single_valued!(&str, String, bool, i32, i64, u16, u32, u64, f64, RegexProperty, MatchingStrategy, RequestRef);

impl IntoDual for Leaf {
    fn into_dual(self) -> DualValue<Leaf> {
        DualValue::single(self)
    }
}

/// Validate a value for its role: placement first, then cross-side agreement.
pub(crate) fn validate(role: Role, value: &DualValue<Leaf>) -> Result<(), ContractError> {
    check_placement(role, value)?;
    if let (Some(client), Some(server)) = (value.client_value(), value.server_value()) {
        assert_sides_match(client, server)?;
    }
    Ok(())
}

pub(crate) fn checked(role: Role, value: DualValue<Leaf>) -> Result<DualValue<Leaf>, ContractError> {
    validate(role, &value)?;
    Ok(value)
}

pub(crate) fn checked_node(role: Role, node: &Node) -> Result<(), ContractError> {
    node.leaves()
        .into_iter()
        .try_for_each(|leaf| validate(role, leaf))
}

/// A library pattern on the verifying side of `role` and a generated value
/// matching it on the producing side.
pub fn any(role: Role, named: NamedPattern) -> DualValue<Leaf> {
    arranged(role, named.property())
}

/// Same arrangement as [`any`] for an ad-hoc pattern.
pub fn any_matching(role: Role, source: &str) -> Result<DualValue<Leaf>, ContractError> {
    RegexProperty::compile(source).map(|property| arranged(role, property))
}

fn arranged(role: Role, property: RegexProperty) -> DualValue<Leaf> {
    let verifying = Leaf::Pattern(property.clone());
    let producing = Leaf::Generated(property);
    match role {
        Role::Request => DualValue::pair(verifying, producing),
        Role::Response => DualValue::pair(producing, verifying),
    }
}

/// A consumer-driven contract.
#[derive(Debug, Clone, Default)]
pub struct Contract {
    pub name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<u32>,
    pub ignored: bool,
    pub scenario: Option<ScenarioStep>,
    pub metadata: IndexMap<String, Value>,
    pub request: Option<Request>,
    pub response: Option<Response>,
    pub input: Option<Input>,
    pub output: Option<OutputMessage>,
}

impl Contract {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn http(name: impl Into<String>, request: Request, response: Response) -> Self {
        Self {
            request: Some(request),
            response: Some(response),
            ..Self::new(name)
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Display name used in errors and stub names.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }

    pub fn is_http(&self) -> bool {
        self.request.is_some() || self.response.is_some()
    }

    pub fn is_messaging(&self) -> bool {
        self.input.is_some() || self.output.is_some()
    }

    /// At least one half must be present.
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.is_http() || self.is_messaging() {
            Ok(())
        } else {
            Err(ContractError::EmptyContract)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_arranges_sides_by_role() {
        let request = any(Role::Request, NamedPattern::Uuid);
        assert!(matches!(request.client_value(), Some(Leaf::Pattern(_))));
        assert!(matches!(request.server_value(), Some(Leaf::Generated(_))));

        let response = any(Role::Response, NamedPattern::Uuid);
        assert!(matches!(response.client_value(), Some(Leaf::Generated(_))));
        assert!(matches!(response.server_value(), Some(Leaf::Pattern(_))));
    }

    #[test]
    fn test_checked_rejects_single_pattern() {
        let pattern = RegexProperty::compile("[0-9]+").unwrap();
        assert!(checked(Role::Request, pattern.clone().into_dual()).is_err());
        assert!(checked(Role::Request, DualValue::from_client(Leaf::from(pattern))).is_ok());
    }

    #[test]
    fn test_empty_contract() {
        assert_eq!(
            Contract::new("nothing").validate(),
            Err(ContractError::EmptyContract)
        );
    }
}
