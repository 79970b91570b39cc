//! Errors raised while building and compiling contracts.
//!
//! Every failure is a configuration error: it is raised synchronously, it names
//! the contract and the field path that caused it, and no partial output is
//! produced alongside it.

use crate::value::Side;
use thiserror::Error;

/// A problem with a single contract value, independent of where it sits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    /// A pattern on one side does not accept the concrete value on the other.
    #[error("pattern [{pattern}] does not match the value [{value}] declared on the other side")]
    SideMismatch { pattern: String, value: String },

    /// `value(a, b)` was called with two values tagged for the same side.
    #[error("both values are tagged as {0} side values")]
    DuplicateSide(Side),

    /// A regex or optional pattern sits on a side that has to produce a concrete value.
    #[error("{0}")]
    ForbiddenPatternPlacement(String),

    /// An absent strategy was paired with something that is not absent.
    #[error("absent can only be used on both sides at once, the other side is [{other}]")]
    AbsentConflict { other: String },

    /// A body matcher path selects nothing in the literal body.
    #[error("path [{path}] does not select anything in the body")]
    UnreachablePath { path: String },

    /// No example can be produced for the pattern.
    #[error("cannot generate a value for pattern [{pattern}]: {reason}")]
    UnsynthesizablePattern { pattern: String, reason: String },

    /// Only a pattern was declared where a concrete value is required.
    #[error("{side} value is not available for [{value}]")]
    MissingConcreteValue { side: Side, value: String },

    /// The pattern source does not compile.
    #[error("invalid pattern [{pattern}]: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The matcher kind cannot be expressed at this position.
    #[error("{0}")]
    UnsupportedMatcher(String),

    /// A request reference is malformed or used outside a response.
    #[error("{0}")]
    InvalidReference(String),

    /// Neither request/response nor input/output is present.
    #[error("contract has neither a request/response nor an input/output")]
    EmptyContract,

    /// A contract document cannot be converted into a contract.
    #[error("invalid contract document: {0}")]
    InvalidDocument(String),
}

impl ContractError {
    /// Short stable code used by the linter.
    pub fn code(&self) -> &'static str {
        match self {
            ContractError::SideMismatch { .. } => "E101",
            ContractError::DuplicateSide(_) => "E102",
            ContractError::ForbiddenPatternPlacement(_) => "E103",
            ContractError::AbsentConflict { .. } => "E104",
            ContractError::UnreachablePath { .. } => "E105",
            ContractError::UnsynthesizablePattern { .. } => "E106",
            ContractError::MissingConcreteValue { .. } => "E107",
            ContractError::InvalidPattern { .. } => "E108",
            ContractError::UnsupportedMatcher(_) => "E109",
            ContractError::InvalidReference(_) => "E110",
            ContractError::EmptyContract => "E111",
            ContractError::InvalidDocument(_) => "E112",
        }
    }

    /// Attach the contract name and field path.
    pub fn at(self, contract: impl Into<String>, path: impl Into<String>) -> CompileError {
        CompileError {
            contract: contract.into(),
            path: path.into(),
            source: self,
        }
    }
}

/// A [`ContractError`] located inside a named contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("contract [{contract}]{}: {source}", at_path(.path))]
pub struct CompileError {
    pub contract: String,
    pub path: String,
    #[source]
    pub source: ContractError,
}

fn at_path(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!(" at [{path}]")
    }
}
