use crate::contract::{checked, IntoDual};
use crate::error::ContractError;
use crate::pattern::RegexProperty;
use crate::value::{DualValue, Leaf, Role};

/// How `matching(value)` expands into a two-sided value.
pub type MatchPolicy = fn(&str) -> Result<DualValue<Leaf>, ContractError>;

/// Requests: the stub accepts anything starting with `value`, the test sends `value`.
pub fn request_policy(value: &str) -> Result<DualValue<Leaf>, ContractError> {
    let prefix = RegexProperty::compile(&format!("{}.*", regex::escape(value)))?;
    Ok(DualValue::pair(Leaf::Pattern(prefix), Leaf::from(value)))
}

/// Responses: the stub returns `value`, the test accepts anything starting with it.
pub fn response_policy(value: &str) -> Result<DualValue<Leaf>, ContractError> {
    let prefix = RegexProperty::compile(&format!("{}.*", regex::escape(value)))?;
    Ok(DualValue::pair(Leaf::from(value), Leaf::Pattern(prefix)))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub name: String,
    pub value: DualValue<Leaf>,
}

/// Named values of one request or response: headers, or cookies.
///
/// Entries are unique by name and value; names compare case-insensitively on
/// lookup only.
#[derive(Debug, Clone)]
pub struct Headers {
    role: Role,
    policy: MatchPolicy,
    entries: Vec<Header>,
}

impl Headers {
    pub fn for_role(role: Role) -> Self {
        let policy = match role {
            Role::Request => request_policy as MatchPolicy,
            Role::Response => response_policy as MatchPolicy,
        };
        Self::with_policy(role, policy)
    }

    pub fn with_policy(role: Role, policy: MatchPolicy) -> Self {
        Self {
            role,
            policy,
            entries: Vec::new(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn add(&mut self, name: impl Into<String>, value: impl IntoDual) -> Result<&mut Self, ContractError> {
        let header = Header {
            name: name.into(),
            value: checked(self.role, value.into_dual())?,
        };
        if !self.entries.contains(&header) {
            self.entries.push(header);
        }
        Ok(self)
    }

    /// Add a value expanded through this collection's [`MatchPolicy`].
    pub fn matching(&mut self, name: impl Into<String>, value: &str) -> Result<&mut Self, ContractError> {
        let expanded = (self.policy)(value)?;
        self.add(name, expanded)
    }

    pub fn get(&self, name: &str) -> Option<&Header> {
        self.entries
            .iter()
            .find(|header| header.name.eq_ignore_ascii_case(name))
    }

    pub fn content_type(&self) -> Option<&Header> {
        self.get("Content-Type")
    }

    pub fn entries(&self) -> &[Header] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Header> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_matching_policy() {
        let mut headers = Headers::for_role(Role::Request);
        headers.matching("Content-Type", "application/json").unwrap();
        let header = headers.content_type().unwrap();
        let Some(Leaf::Pattern(prefix)) = header.value.client_value() else {
            panic!("expected a client side pattern");
        };
        assert!(prefix.pattern().is_match("application/json;charset=UTF-8"));
        assert_eq!(header.value.server_value(), Some(&Leaf::from("application/json")));
    }

    #[test]
    fn test_response_matching_policy() {
        let mut headers = Headers::for_role(Role::Response);
        headers.matching("content-type", "text/plain").unwrap();
        let header = headers.get("Content-Type").unwrap();
        assert_eq!(header.value.client_value(), Some(&Leaf::from("text/plain")));
        assert!(matches!(header.value.server_value(), Some(Leaf::Pattern(_))));
    }

    #[test]
    fn test_duplicates_are_collapsed() {
        let mut headers = Headers::for_role(Role::Request);
        headers.add("Accept", "a").unwrap().add("Accept", "a").unwrap();
        headers.add("Accept", "b").unwrap();
        assert_eq!(headers.entries().len(), 2);
    }

    #[test]
    fn test_custom_policy() {
        fn exact(value: &str) -> Result<DualValue<Leaf>, ContractError> {
            Ok(DualValue::single(Leaf::from(value)))
        }
        let mut headers = Headers::with_policy(Role::Request, exact);
        headers.matching("X-Mode", "strict").unwrap();
        assert!(headers.get("x-mode").unwrap().value.is_single_value());
    }

    #[test]
    fn test_rejects_pattern_on_producing_side() {
        let mut headers = Headers::for_role(Role::Response);
        let pattern = RegexProperty::compile("x.*").unwrap();
        assert!(headers.add("X", DualValue::from_client(Leaf::from(pattern))).is_err());
    }
}
