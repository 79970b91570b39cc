//! Lint issues and results.

use accord_core::CompileError;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Severity level of a lint issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The contract does not compile.
    Error,
    /// The contract compiles but probably does not do what was meant.
    Warning,
    /// Worth knowing, never fails a run.
    Info,
}

impl Severity {
    /// Lowercase label printed by the CLI.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

/// A single lint issue found in a contract document.
#[derive(Debug, Clone, Serialize)]
pub struct LintIssue {
    /// Severity of the issue.
    pub severity: Severity,
    /// `E1xx` codes mirror compiler errors, `E0xx` are file problems,
    /// `Wxxx` and `Ixxx` are lint findings.
    pub code: String,
    /// Human-readable description of the issue.
    pub message: String,
    /// File the contract was read from.
    #[serde(serialize_with = "serialize_path")]
    pub file: PathBuf,
    /// Contract the issue belongs to, when known.
    pub contract: Option<String>,
    /// Field path inside the contract (e.g. "request.headers.Accept").
    pub location: Option<String>,
    /// Suggested fix for the issue.
    pub suggestion: Option<String>,
}

fn serialize_path<S>(path: &Path, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&path.to_string_lossy())
}

impl LintIssue {
    fn new(severity: Severity, code: impl Into<String>, message: impl Into<String>, file: PathBuf) -> Self {
        Self {
            severity,
            code: code.into(),
            message: message.into(),
            file,
            contract: None,
            location: None,
            suggestion: None,
        }
    }

    /// Create a new error issue.
    pub fn error(code: impl Into<String>, message: impl Into<String>, file: PathBuf) -> Self {
        Self::new(Severity::Error, code, message, file)
    }

    /// Create a new warning issue.
    pub fn warning(code: impl Into<String>, message: impl Into<String>, file: PathBuf) -> Self {
        Self::new(Severity::Warning, code, message, file)
    }

    /// Create a new info issue.
    pub fn info(code: impl Into<String>, message: impl Into<String>, file: PathBuf) -> Self {
        Self::new(Severity::Info, code, message, file)
    }

    /// An error carrying the compiler's code, contract and field path.
    pub fn from_compile_error(error: &CompileError, file: PathBuf) -> Self {
        let mut issue = Self::error(error.source.code(), error.source.to_string(), file)
            .with_contract(error.contract.clone());
        if !error.path.is_empty() {
            issue = issue.with_location(error.path.clone());
        }
        issue
    }

    /// Set the contract this issue belongs to.
    pub fn with_contract(mut self, contract: impl Into<String>) -> Self {
        self.contract = Some(contract.into());
        self
    }

    /// Set the field path of this issue.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the suggestion for this issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Result of linting one or more files.
#[derive(Debug, Default, Serialize)]
pub struct LintResult {
    /// All issues found, in the order they were found.
    pub issues: Vec<LintIssue>,
    /// Number of files read.
    pub files_checked: usize,
    /// Number of contract documents, including ones that failed to parse.
    pub contracts_checked: usize,
    /// Number of errors found.
    pub errors: usize,
    /// Number of warnings found.
    pub warnings: usize,
}

impl LintResult {
    /// Create a new empty lint result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an issue and count it by severity.
    pub fn add_issue(&mut self, issue: LintIssue) {
        match issue.severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Info => {}
        }
        self.issues.push(issue);
    }

    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    /// Check if there are any warnings.
    pub fn has_warnings(&self) -> bool {
        self.warnings > 0
    }

    /// Check if validation passed (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors == 0
    }

    /// Issues with the given code.
    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a LintIssue> + 'a {
        self.issues.iter().filter(move |issue| issue.code == code)
    }

    /// Merge another result into this one.
    pub fn merge(&mut self, other: LintResult) {
        self.issues.extend(other.issues);
        self.files_checked += other.files_checked;
        self.contracts_checked += other.contracts_checked;
        self.errors += other.errors;
        self.warnings += other.warnings;
    }
}

/// Options for validation.
#[derive(Debug, Clone, Default)]
pub struct LintOptions {
    /// Enable verbose output (for CLI).
    pub verbose: bool,
    /// Stop after conversion; do not compile or synthesize stubs.
    pub skip_compile: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_counts() {
        let mut first = LintResult::new();
        first.files_checked = 1;
        first.add_issue(LintIssue::error("E003", "Response has no status", PathBuf::from("a.yml")));

        let mut second = LintResult::new();
        second.files_checked = 1;
        second.contracts_checked = 2;
        second.add_issue(LintIssue::warning("W001", "Contract has no name", PathBuf::from("b.yml")));
        second.add_issue(LintIssue::info("I001", "Contract is ignored", PathBuf::from("b.yml")));

        first.merge(second);
        assert_eq!(first.issues.len(), 3);
        assert_eq!(first.files_checked, 2);
        assert_eq!(first.contracts_checked, 2);
        assert_eq!((first.errors, first.warnings), (1, 1));
        assert!(!first.is_valid());
    }

    #[test]
    fn test_issue_serializes_for_json_output() {
        let issue = LintIssue::warning("W003", "Unknown directive '$Regex'", PathBuf::from("c/d.yml"))
            .with_contract("d")
            .with_location("request.url.$Regex");
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["severity"], "warning");
        assert_eq!(json["file"], "c/d.yml");
        assert_eq!(json["location"], "request.url.$Regex");
        assert!(json["suggestion"].is_null());
    }
}
