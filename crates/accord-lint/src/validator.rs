//! Validation of contract documents.
//!
//! Each document goes through two passes: checks on the raw value that the
//! compiler would silently accept, then conversion and compilation, whose
//! errors keep the compiler's codes.

use crate::types::{LintIssue, LintOptions, LintResult};
use accord_core::contract::{ContractDocument, DocumentFormat};
use accord_core::stub::{MessageStub, StubMapping};
use accord_core::{CompileError, Compiler};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Directive keys understood by the document reader.
pub const DIRECTIVES: &[&str] = &[
    "$client",
    "$server",
    "$regex",
    "$as",
    "$example",
    "$named",
    "$any",
    "$anyMatching",
    "$optional",
    "$strategy",
    "$value",
    "$fromRequest",
    "$execute",
    "$generated",
    "$base64",
    "$interpolate",
    "$matching",
];

/// What the cross-document checks need to know about a linted contract.
#[derive(Debug, Clone)]
pub struct DocumentSummary {
    pub file: PathBuf,
    pub name: String,
    pub order: Option<u32>,
}

/// Split `text` into raw documents. YAML may hold several `---` separated
/// documents; a JSON array holds one document per element.
pub fn raw_documents(text: &str, format: DocumentFormat) -> Result<Vec<Value>, String> {
    match format {
        DocumentFormat::Yaml => serde_yaml::Deserializer::from_str(text)
            .map(|document| Value::deserialize(document).map_err(|e| e.to_string()))
            .collect(),
        DocumentFormat::Json => match serde_json::from_str(text).map_err(|e| e.to_string())? {
            Value::Array(items) => Ok(items),
            single => Ok(vec![single]),
        },
    }
}

/// Validate every document of one file.
pub fn validate_text(
    file: &Path,
    text: &str,
    format: DocumentFormat,
    compiler: &Compiler,
    result: &mut LintResult,
    options: &LintOptions,
) -> Vec<DocumentSummary> {
    let documents = match raw_documents(text, format) {
        Ok(documents) => documents,
        Err(e) => {
            result.add_issue(
                LintIssue::error("E002", format!("Failed to parse document: {e}"), file.to_path_buf())
                    .with_suggestion("Check for JSON or YAML syntax errors"),
            );
            return Vec::new();
        }
    };

    let stem = file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "contract".to_string());
    let several = documents.len() > 1;

    documents
        .iter()
        .enumerate()
        .filter_map(|(index, raw)| {
            let default_name = if several { format!("{stem}_{index}") } else { stem.clone() };
            validate_document(file, raw, &default_name, compiler, result, options)
        })
        .collect()
}

/// Validate one raw document. Returns its summary when it could be read.
pub fn validate_document(
    file: &Path,
    raw: &Value,
    default_name: &str,
    compiler: &Compiler,
    result: &mut LintResult,
    options: &LintOptions,
) -> Option<DocumentSummary> {
    result.contracts_checked += 1;

    let Some(fields) = raw.as_object() else {
        result.add_issue(
            LintIssue::error("E112", "A contract must be a mapping", file.to_path_buf())
                .with_contract(default_name),
        );
        return None;
    };

    let name = match fields.get("name").and_then(Value::as_str) {
        Some(name) => name.to_string(),
        None => {
            result.add_issue(
                LintIssue::warning(
                    "W001",
                    format!("Contract has no name, the file name '{default_name}' is used"),
                    file.to_path_buf(),
                )
                .with_contract(default_name)
                .with_location("name")
                .with_suggestion("Name the contract; stub files and scenario steps are named after it"),
            );
            default_name.to_string()
        }
    };

    if fields.get("ignored").and_then(Value::as_bool) == Some(true) {
        result.add_issue(
            LintIssue::info("I001", "Contract is ignored and produces no output", file.to_path_buf())
                .with_contract(&name),
        );
    }

    check_directives(file, &name, raw, "", result);

    if let Some(response) = fields.get("response") {
        if response.get("status").is_none() {
            result.add_issue(
                LintIssue::error("E003", "Response has no status", file.to_path_buf())
                    .with_contract(&name)
                    .with_location("response.status")
                    .with_suggestion("Add a status, e.g. \"status: 200\""),
            );
            return Some(summary(file, name, fields.get("order")));
        }
    }

    let document = match serde_json::from_value::<ContractDocument>(raw.clone()) {
        Ok(document) => document.with_default_name(default_name),
        Err(e) => {
            result.add_issue(
                LintIssue::error("E112", format!("Invalid contract document: {e}"), file.to_path_buf())
                    .with_contract(&name)
                    .with_suggestion(DOCUMENT_HINT),
            );
            return Some(summary(file, name, fields.get("order")));
        }
    };
    let order = document.order;

    let contract = match document.into_contract() {
        Ok(contract) => contract,
        Err(e) => {
            add_compile_error(file, &e, result);
            return Some(DocumentSummary { file: file.to_path_buf(), name, order });
        }
    };

    if !options.skip_compile {
        let generated = compiler.compile(&contract).and_then(|compiled| {
            StubMapping::from_compiled(&compiled, compiler.config())?;
            MessageStub::from_compiled(&compiled)?;
            Ok(())
        });
        if let Err(e) = generated {
            add_compile_error(file, &e, result);
        }
    }

    Some(DocumentSummary { file: file.to_path_buf(), name, order })
}

fn summary(file: &Path, name: String, order: Option<&Value>) -> DocumentSummary {
    DocumentSummary {
        file: file.to_path_buf(),
        name,
        order: order.and_then(Value::as_u64).and_then(|order| u32::try_from(order).ok()),
    }
}

fn add_compile_error(file: &Path, error: &CompileError, result: &mut LintResult) {
    let mut issue = LintIssue::from_compile_error(error, file.to_path_buf());
    if let Some(hint) = suggestion(error.source.code()) {
        issue = issue.with_suggestion(hint);
    }
    result.add_issue(issue);
}

const DOCUMENT_HINT: &str = "Check field names and directive values against the document format";

fn suggestion(code: &str) -> Option<&'static str> {
    Some(match code {
        "E101" => "Give both $client and $server the same shape (both scalars, both objects or both lists)",
        "E102" => "Set $client and $server once each",
        "E103" => "A pattern belongs on the verifying side: $client in a request, $server in a response",
        "E104" => "An absent value cannot be paired with a concrete one; drop the other side",
        "E105" => "Point the matcher at a path that exists in the example body",
        "E106" => "Add an $example or pair the pattern with a concrete value on the other side",
        "E107" => "Pair the pattern with a concrete value, e.g. {$client: {$regex: ...}, $server: \"value\"}",
        "E108" => "Fix the regular expression",
        "E109" => "Use a matcher supported at this position",
        "E110" => "Reference the request as path, url, body, header:<name>, query:<name> or a body path",
        "E111" => "Give the contract a request and response, or an input or output message",
        "E112" => DOCUMENT_HINT,
        _ => return None,
    })
}

/// Warn about `$` keys the reader does not know.
pub fn check_directives(file: &Path, contract: &str, value: &Value, location: &str, result: &mut LintResult) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_location = if location.is_empty() {
                    key.clone()
                } else {
                    format!("{location}.{key}")
                };
                if key.starts_with('$') && !DIRECTIVES.contains(&key.as_str()) {
                    let mut issue = LintIssue::warning(
                        "W003",
                        format!("Unknown directive '{key}'"),
                        file.to_path_buf(),
                    )
                    .with_contract(contract)
                    .with_location(&child_location);
                    if let Some(close) = closest_directive(key) {
                        issue = issue.with_suggestion(format!("Did you mean '{close}'?"));
                    }
                    result.add_issue(issue);
                }
                check_directives(file, contract, child, &child_location, result);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                check_directives(file, contract, item, &format!("{location}[{index}]"), result);
            }
        }
        _ => {}
    }
}

fn closest_directive(key: &str) -> Option<&'static str> {
    let lowered = key.to_ascii_lowercase();
    DIRECTIVES
        .iter()
        .copied()
        .find(|directive| directive.to_ascii_lowercase() == lowered)
}

/// Checks that span documents: duplicate names anywhere, duplicate `order`
/// within one directory.
pub fn check_across_documents(summaries: &[DocumentSummary], result: &mut LintResult) {
    for (index, current) in summaries.iter().enumerate() {
        let earlier = &summaries[..index];

        if let Some(first) = earlier.iter().find(|other| other.name == current.name) {
            result.add_issue(
                LintIssue::warning(
                    "W004",
                    format!(
                        "Contract name '{}' is also used in {}",
                        current.name,
                        first.file.display()
                    ),
                    current.file.clone(),
                )
                .with_contract(&current.name)
                .with_location("name")
                .with_suggestion("Stub files are named after the contract; one would overwrite the other"),
            );
        }

        let Some(order) = current.order else { continue };
        let directory = current.file.parent();
        if let Some(first) = earlier
            .iter()
            .find(|other| other.order == Some(order) && other.file.parent() == directory)
        {
            result.add_issue(
                LintIssue::warning(
                    "W005",
                    format!("Order {order} is shared with contract '{}'", first.name),
                    current.file.clone(),
                )
                .with_contract(&current.name)
                .with_location("order")
                .with_suggestion("Give each step of a scenario its own order"),
            );
        }
    }
}
