//! The two-sided value pair.

use crate::error::ContractError;
use crate::value::{assert_sides_match, Leaf};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One side of a contract.
///
/// The client side is what a consumer's stub sees, the server side is what the
/// generated test against the real service sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Client,
    Server,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Client => Side::Server,
            Side::Server => Side::Client,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Side::Client => "client",
            Side::Server => "server",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A possibly divergent `(client, server)` pair.
///
/// At least one side is always present. Values are immutable once built; the
/// only way to get one is through the constructors below, which is what keeps
/// the "never both empty" rule true.
#[derive(Debug, Clone, PartialEq)]
pub struct DualValue<T> {
    client: Option<T>,
    server: Option<T>,
}

impl<T> DualValue<T> {
    /// A value known only to the client side.
    pub fn from_client(value: T) -> Self {
        Self {
            client: Some(value),
            server: None,
        }
    }

    /// A value known only to the server side.
    pub fn from_server(value: T) -> Self {
        Self {
            client: None,
            server: Some(value),
        }
    }

    /// Both sides, without any cross-side validation.
    ///
    /// Prefer [`value`] for leaves, which checks that the two sides agree.
    pub fn pair(client: T, server: T) -> Self {
        Self {
            client: Some(client),
            server: Some(server),
        }
    }

    pub fn client_value(&self) -> Option<&T> {
        self.client.as_ref()
    }

    pub fn server_value(&self) -> Option<&T> {
        self.server.as_ref()
    }

    pub fn side(&self, side: Side) -> Option<&T> {
        match side {
            Side::Client => self.client.as_ref(),
            Side::Server => self.server.as_ref(),
        }
    }

    /// The value on `side`, or the other side's value when `side` is empty.
    ///
    /// Returns the side the value actually came from.
    pub fn side_or_other(&self, side: Side) -> (Side, &T) {
        match self.side(side) {
            Some(value) => (side, value),
            None => match self.side(side.opposite()) {
                Some(value) => (side.opposite(), value),
                None => unreachable!("a dual value always has at least one side"),
            },
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> DualValue<U> {
        DualValue {
            client: self.client.map(&mut f),
            server: self.server.map(&mut f),
        }
    }
}

impl<T: Clone> DualValue<T> {
    /// The same value on both sides.
    pub fn single(value: T) -> Self {
        Self {
            client: Some(value.clone()),
            server: Some(value),
        }
    }
}

impl<T: PartialEq> DualValue<T> {
    /// True when both sides are equal or exactly one side is present.
    pub fn is_single_value(&self) -> bool {
        match (&self.client, &self.server) {
            (Some(client), Some(server)) => client == server,
            _ => true,
        }
    }
}

/// A leaf tagged with the side it belongs to, the argument type of [`value`].
#[derive(Debug, Clone, PartialEq)]
pub enum Tagged {
    Client(Leaf),
    Server(Leaf),
}

/// Tag a leaf as the client side value.
pub fn client(leaf: impl Into<Leaf>) -> Tagged {
    Tagged::Client(leaf.into())
}

/// Tag a leaf as the server side value.
pub fn server(leaf: impl Into<Leaf>) -> Tagged {
    Tagged::Server(leaf.into())
}

/// Merge one client and one server value, in either order.
///
/// The two sides are checked against each other with [`assert_sides_match`].
pub fn value(first: Tagged, second: Tagged) -> Result<DualValue<Leaf>, ContractError> {
    let (client, server) = match (first, second) {
        (Tagged::Client(client), Tagged::Server(server))
        | (Tagged::Server(server), Tagged::Client(client)) => (client, server),
        (Tagged::Client(_), Tagged::Client(_)) => {
            return Err(ContractError::DuplicateSide(Side::Client))
        }
        (Tagged::Server(_), Tagged::Server(_)) => {
            return Err(ContractError::DuplicateSide(Side::Server))
        }
    };
    assert_sides_match(&client, &server)?;
    Ok(DualValue::pair(client, server))
}
