//! CLI command implementations.

pub mod consolidate;
pub mod extract;
pub mod import;
pub mod resolve;
pub mod validate;

use almanac::{Severity, ValidationIssue};
use colored::Colorize;

/// Print one issue, colored by severity.
pub(crate) fn print_issue(issue: &ValidationIssue) {
    let line = issue.to_string();
    let line = match issue.severity {
        Severity::Error => line.red(),
        Severity::Warning => line.yellow(),
        Severity::Ambiguous => line.magenta(),
    };
    println!("  {}", line);
}
