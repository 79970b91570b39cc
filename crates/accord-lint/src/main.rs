//! Accord Contract Linter CLI
//!
//! Validates contract documents before they are compiled into stubs and
//! test assertions.
//!
//! Usage:
//!   accord-lint <directory_or_file> [OPTIONS]

use accord_lint::{lint_directory, lint_file, LintIssue, LintOptions, LintResult, Severity};
use clap::Parser;
use std::collections::BTreeMap;
use std::path::PathBuf;

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Accord Contract Linter
#[derive(Parser, Debug)]
#[command(name = "accord-lint")]
#[command(author, version, about = "Validate contract documents before compiling them")]
struct Args {
    /// Path to a contract file or a directory of contracts
    #[arg(required = true)]
    path: PathBuf,

    /// Output format: text (default), json
    #[arg(short, long, default_value = "text")]
    output: String,

    /// Only show errors (hide warnings and notes)
    #[arg(short = 'e', long)]
    errors_only: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Strict mode - treat warnings as errors
    #[arg(short, long)]
    strict: bool,

    /// Only read the documents, do not compile them
    #[arg(long)]
    no_compile: bool,
}

fn main() {
    let args = Args::parse();
    let options = LintOptions {
        verbose: args.verbose,
        skip_compile: args.no_compile,
    };

    let result = if args.path.is_dir() {
        lint_directory(&args.path, &options)
    } else {
        lint_file(&args.path, &options)
    };

    if args.output == "json" {
        print_results_json(&result);
    } else {
        println!("{BOLD}{CYAN}Accord Contract Linter{RESET}");
        println!("{DIM}{RULE}{RESET}");
        println!("{DIM}Scanning:{RESET} {CYAN}{}{RESET}", args.path.display());
        if result.files_checked == 0 {
            println!(
                "{YELLOW}Warning:{RESET} No contract files found in {}",
                args.path.display()
            );
            std::process::exit(0);
        }
        println!(
            "{DIM}Found:{RESET}    {BOLD}{}{RESET} contract(s) in {BOLD}{}{RESET} file(s)",
            result.contracts_checked, result.files_checked
        );
        print_results(&result, &args);
    }

    let has_errors = result.errors > 0 || (args.strict && result.warnings > 0);
    std::process::exit(if has_errors { 1 } else { 0 });
}

fn print_results_json(result: &LintResult) {
    match serde_json::to_string_pretty(result) {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("{RED}Failed to serialize results: {e}{RESET}");
            std::process::exit(2);
        }
    }
}

fn print_results(result: &LintResult, args: &Args) {
    println!();

    let shown: Vec<&LintIssue> = result
        .issues
        .iter()
        .filter(|issue| !args.errors_only || issue.severity == Severity::Error)
        .filter(|issue| args.verbose || issue.severity != Severity::Info)
        .collect();

    if shown.is_empty() {
        println!("{GREEN}{BOLD}No issues found!{RESET}");
    } else {
        let mut issues_by_file: BTreeMap<&PathBuf, Vec<&LintIssue>> = BTreeMap::new();
        for issue in shown {
            issues_by_file.entry(&issue.file).or_default().push(issue);
        }

        for (file, issues) in issues_by_file {
            let file_errors = issues
                .iter()
                .filter(|i| i.severity == Severity::Error)
                .count();
            let file_warnings = issues
                .iter()
                .filter(|i| i.severity == Severity::Warning)
                .count();

            let status_indicator = if file_errors > 0 {
                format!("{RED}FAIL{RESET}")
            } else if file_warnings > 0 {
                format!("{YELLOW}WARN{RESET}")
            } else {
                format!("{CYAN}NOTE{RESET}")
            };

            let counts = if file_errors > 0 && file_warnings > 0 {
                format!(
                    " {DIM}({RED}{file_errors} error(s){RESET}{DIM}, {YELLOW}{file_warnings} warning(s){RESET}{DIM}){RESET}"
                )
            } else if file_errors > 0 {
                format!(" {DIM}({RED}{file_errors} error(s){RESET}{DIM}){RESET}")
            } else if file_warnings > 0 {
                format!(" {DIM}({YELLOW}{file_warnings} warning(s){RESET}{DIM}){RESET}")
            } else {
                String::new()
            };

            println!("{status_indicator} {BOLD}{CYAN}{}{RESET}{counts}", file.display());

            for issue in issues {
                print_issue(issue);
            }
            println!();
        }
    }

    println!("{DIM}{RULE}{RESET}");
    println!("{BOLD}{CYAN}Summary{RESET}");
    println!("{DIM}{RULE}{RESET}");
    println!(
        "  {DIM}Files checked:{RESET}     {BOLD}{}{RESET}",
        result.files_checked
    );
    println!(
        "  {DIM}Contracts checked:{RESET} {BOLD}{}{RESET}",
        result.contracts_checked
    );

    if result.errors > 0 {
        println!(
            "  {RED}Errors:{RESET}            {BOLD}{RED}{}{RESET}",
            result.errors
        );
    } else {
        println!("  {GREEN}Errors:{RESET}            {BOLD}{GREEN}0{RESET}");
    }

    if result.warnings > 0 {
        println!(
            "  {YELLOW}Warnings:{RESET}          {BOLD}{YELLOW}{}{RESET}",
            result.warnings
        );
    } else {
        println!("  {DIM}Warnings:{RESET}          {BOLD}0{RESET}");
    }

    println!();

    if result.errors == 0 && result.warnings == 0 {
        println!("{GREEN}{BOLD}All checks passed!{RESET}");
    } else if result.errors == 0 {
        println!("{YELLOW}{BOLD}Passed with warnings{RESET}");
    } else {
        println!("{RED}{BOLD}Linting failed with errors{RESET}");
    }
}

fn print_issue(issue: &LintIssue) {
    let color = severity_color(&issue.severity);
    let marker = format!("{color}|{RESET}");

    let contract_str = issue
        .contract
        .as_ref()
        .map(|c| format!("{BOLD}{c}{RESET} "))
        .unwrap_or_default();
    let location_str = issue
        .location
        .as_ref()
        .map(|l| format!("{DIM}[{RESET}{CYAN}{l}{RESET}{DIM}]{RESET} "))
        .unwrap_or_default();
    let severity_str = format!("{BOLD}{color}{}{RESET}", issue.severity.label());
    let code_str = format!("{DIM}({color}{}{DIM}){RESET}", issue.code);

    println!(
        "  {marker} {contract_str}{location_str}{severity_str}: {} {code_str}",
        issue.message
    );

    if let Some(suggestion) = &issue.suggestion {
        println!("  {marker}   {GREEN}-> {suggestion}{RESET}");
    }
}

fn severity_color(severity: &Severity) -> &'static str {
    match severity {
        Severity::Error => RED,
        Severity::Warning => YELLOW,
        Severity::Info => CYAN,
    }
}
