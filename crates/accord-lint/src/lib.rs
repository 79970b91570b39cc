//! Contract document linting for Accord.
//!
//! Finds problems in contract files before they reach the compiler: parse
//! failures, compile errors (with the compiler's `E1xx` codes), and mistakes
//! the compiler would silently accept, such as misspelled directives or two
//! contracts writing the same stub file.
//!
//! # Example
//!
//! ```no_run
//! use accord_lint::{lint_directory, lint_file, LintOptions};
//! use std::path::Path;
//!
//! let result = lint_file(Path::new("contracts/get_user.yml"), &LintOptions::default());
//!
//! let result = lint_directory(Path::new("./contracts"), &LintOptions::default());
//! if result.has_errors() {
//!     eprintln!("Found {} errors", result.errors);
//! }
//! ```

mod types;
mod validator;

use accord_core::contract::DocumentFormat;
use accord_core::loader::collect_contract_files;
use accord_core::Compiler;
use std::path::Path;

pub use types::{LintIssue, LintOptions, LintResult, Severity};

pub use validator::{
    check_across_documents, check_directives, raw_documents, validate_document, validate_text,
    DocumentSummary, DIRECTIVES,
};

/// Lint a single contract file.
pub fn lint_file(path: &Path, options: &LintOptions) -> LintResult {
    let mut result = LintResult::new();
    let summaries = lint_into(path, &Compiler::default(), &mut result, options);
    check_across_documents(&summaries, &mut result);
    result
}

/// Lint every contract file under a directory, recursively. Names and
/// scenario orders are also checked across files.
pub fn lint_directory(path: &Path, options: &LintOptions) -> LintResult {
    let mut result = LintResult::new();

    let files = match collect_contract_files(path) {
        Ok(files) => files,
        Err(e) => {
            result.add_issue(LintIssue::error(
                "E001",
                format!("Failed to read directory: {e}"),
                path.to_path_buf(),
            ));
            return result;
        }
    };

    let compiler = Compiler::default();
    let mut summaries = Vec::new();
    for file in files {
        summaries.extend(lint_into(&file, &compiler, &mut result, options));
    }
    check_across_documents(&summaries, &mut result);
    result
}

/// Lint contract text directly. The format follows the extension of
/// `source_name`.
pub fn lint_str(text: &str, source_name: &str, options: &LintOptions) -> LintResult {
    let mut result = LintResult::new();
    result.files_checked = 1;

    let path = Path::new(source_name);
    let summaries = validate_text(
        path,
        text,
        DocumentFormat::from_path(path),
        &Compiler::default(),
        &mut result,
        options,
    );
    check_across_documents(&summaries, &mut result);
    result
}

fn lint_into(
    path: &Path,
    compiler: &Compiler,
    result: &mut LintResult,
    options: &LintOptions,
) -> Vec<DocumentSummary> {
    result.files_checked += 1;

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            result.add_issue(LintIssue::error(
                "E001",
                format!("Failed to read file: {e}"),
                path.to_path_buf(),
            ));
            return Vec::new();
        }
    };

    validate_text(path, &content, DocumentFormat::from_path(path), compiler, result, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn codes(result: &LintResult) -> Vec<&str> {
        result.issues.iter().map(|issue| issue.code.as_str()).collect()
    }

    #[test]
    fn test_valid_contract_has_no_issues() {
        let yaml = r#"
name: get_user
request:
  method: GET
  urlPath: {$client: {$regex: "/users/[0-9]+"}, $server: "/users/42"}
response:
  status: 200
  body:
    id: {$any: uuid}
"#;
        let result = lint_str(yaml, "get_user.yml", &LintOptions::default());
        assert!(result.issues.is_empty(), "{:?}", result.issues);
        assert_eq!(result.contracts_checked, 1);
        assert!(result.is_valid());
    }

    #[test]
    fn test_missing_name_and_unknown_directive() {
        let yaml = r#"
request:
  method: GET
  url: /users
  headers:
    Accept: {$Matching: application/json}
response:
  status: 200
"#;
        let result = lint_str(yaml, "users.yml", &LintOptions::default());
        assert_eq!(result.with_code("W001").count(), 1);

        let directive = result.with_code("W003").next().unwrap();
        assert_eq!(directive.location.as_deref(), Some("request.headers.Accept.$Matching"));
        assert_eq!(directive.suggestion.as_deref(), Some("Did you mean '$matching'?"));
        assert_eq!(directive.contract.as_deref(), Some("users"));
    }

    #[test]
    fn test_compile_errors_keep_their_code() {
        let json = r#"{
            "name": "by_uuid",
            "request": {"method": "GET", "url": {"$client": {"$named": "uuid"}}},
            "response": {"status": 200}
        }"#;
        let result = lint_str(json, "by_uuid.json", &LintOptions::default());
        assert!(result.has_errors());
        let issue = result.with_code("E107").next().unwrap();
        assert_eq!(issue.location.as_deref(), Some("request.url"));
        assert!(issue.suggestion.is_some());
    }

    #[test]
    fn test_absent_conflict_is_reported() {
        let yaml = r#"
name: flags
request:
  method: GET
  url: /flags
  headers:
    X-Flag: {$client: {$strategy: absent}, $server: {$strategy: equalTo, $value: x}}
response:
  status: 200
"#;
        let result = lint_str(yaml, "flags.yml", &LintOptions::default());
        assert_eq!(codes(&result), vec!["E104"]);
    }

    #[test]
    fn test_missing_status_and_unknown_field() {
        let yaml = r#"
name: broken
request:
  method: GET
  url: /x
response:
  headers:
    A: b
---
name: typo
request:
  method: GET
  url: /x
  header:
    A: b
response:
  status: 200
"#;
        let result = lint_str(yaml, "broken.yml", &LintOptions::default());
        assert_eq!(result.contracts_checked, 2);
        assert_eq!(codes(&result), vec!["E003", "E112"]);
    }

    #[test]
    fn test_ignored_contract_is_info() {
        let yaml = "name: old\nignored: true\nrequest: {method: GET, url: /old}\nresponse: {status: 410}\n";
        let result = lint_str(yaml, "old.yml", &LintOptions::default());
        assert_eq!(codes(&result), vec!["I001"]);
        assert!(!result.has_warnings());
        assert!(result.is_valid());
    }

    #[test]
    fn test_syntax_error() {
        let result = lint_str("{\"name\": ", "bad.json", &LintOptions::default());
        assert_eq!(codes(&result), vec!["E002"]);
    }

    #[test]
    fn test_directory_checks_names_and_orders() {
        let dir = tempfile::tempdir().unwrap();
        let flow = dir.path().join("flow");
        fs::create_dir(&flow).unwrap();
        let contract = |name: &str, order: u32| {
            format!("name: {name}\norder: {order}\nrequest: {{method: GET, url: /cart}}\nresponse: {{status: 200}}\n")
        };
        fs::write(flow.join("a.yml"), contract("first", 1)).unwrap();
        fs::write(flow.join("b.yml"), contract("second", 1)).unwrap();
        fs::write(dir.path().join("c.yml"), contract("first", 1)).unwrap();
        fs::write(dir.path().join("notes.txt"), "not a contract").unwrap();

        let result = lint_directory(dir.path(), &LintOptions::default());
        assert_eq!(result.files_checked, 3);
        assert_eq!(result.with_code("W004").count(), 1);

        let order = result.with_code("W005").next().unwrap();
        assert!(order.file.ends_with("flow/b.yml"));
        assert_eq!(result.warnings, 2);
        assert!(result.is_valid());
    }

    #[test]
    fn test_missing_file() {
        let result = lint_file(Path::new("/nonexistent/contract.yml"), &LintOptions::default());
        assert_eq!(codes(&result), vec!["E001"]);
    }
}
