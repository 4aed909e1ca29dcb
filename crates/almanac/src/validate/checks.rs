//! Per-file checks.

use chrono::NaiveDate;

use crate::curation::{
    ChainOutcome, CurationFile, Disposition, EntityKind, PersonCanonical,
    location_name_from_payload, resolve_chains,
};

use super::issue::{IssueKind, Severity, ValidationIssue};

/// Trait for checks run against a single curation file.
pub trait CurationCheck {
    /// Run the check and return the issues found.
    fn check(&self, file: &CurationFile) -> Vec<ValidationIssue>;
}

/// Every entry has exactly one disposition and a usable canonical payload.
pub struct StructureCheck;

impl CurationCheck for StructureCheck {
    fn check(&self, file: &CurationFile) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for (scope, raw_name, entry) in file.entries() {
            let issue = |kind, severity, message: String| {
                ValidationIssue::new(kind, severity, file.year, raw_name, message).with_scope(scope)
            };

            match entry.disposition(file.kind) {
                Err(reason) => issues.push(issue(IssueKind::Structure, Severity::Error, reason)),
                Ok(Disposition::Canonical) => {
                    let payload = entry.canonical.as_ref().unwrap_or(&serde_json::Value::Null);
                    let parsed = match file.kind {
                        EntityKind::People => PersonCanonical::from_payload(raw_name, payload).map(|_| ()),
                        EntityKind::Locations => location_name_from_payload(raw_name, payload).map(|_| ()),
                    };
                    if let Err(reason) = parsed {
                        issues.push(issue(IssueKind::InvalidCanonical, Severity::Error, reason));
                    }
                }
                Ok(Disposition::SameAs(target)) if target.trim().is_empty() => {
                    issues.push(issue(
                        IssueKind::Structure,
                        Severity::Error,
                        "same_as target is empty".to_string(),
                    ));
                }
                Ok(_) => {}
            }

            for date in &entry.dates {
                if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
                    issues.push(issue(
                        IssueKind::InvalidDate,
                        Severity::Warning,
                        format!("'{}' is not a YYYY-MM-DD date", date),
                    ));
                }
            }
        }

        issues
    }
}

/// same_as targets exist in the same scope and chains terminate.
pub struct SameAsCheck;

impl CurationCheck for SameAsCheck {
    fn check(&self, file: &CurationFile) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for (scope, entries) in &file.scopes {
            let outcomes = resolve_chains(entries);

            for (raw_name, entry) in entries {
                let Some(target) = entry.same_as_target() else {
                    continue;
                };

                let (kind, message) = match &outcomes[raw_name] {
                    ChainOutcome::Terminal(_) => continue,
                    ChainOutcome::Dangling(missing) if missing == target => (
                        IssueKind::DanglingSameAs,
                        format!("same_as target '{}' not found in this scope", target),
                    ),
                    ChainOutcome::Dangling(missing) => (
                        IssueKind::DanglingSameAs,
                        format!("same_as chain via '{}' ends at missing '{}'", target, missing),
                    ),
                    ChainOutcome::Circular => (
                        IssueKind::CircularSameAs,
                        format!("same_as chain via '{}' is circular", target),
                    ),
                };

                issues.push(
                    ValidationIssue::new(kind, Severity::Error, file.year, raw_name, message)
                        .with_scope(scope),
                );
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curation::CurationEntry;
    use serde_json::json;

    fn people(entries: Vec<(&str, CurationEntry)>) -> CurationFile {
        let mut file = CurationFile::new(2024, EntityKind::People);
        for (raw, entry) in entries {
            file.insert("", raw, entry);
        }
        file
    }

    #[test]
    fn test_marker_count_errors() {
        let mut both = CurationEntry::canonical(json!({"name": "Ann"}));
        both.skip = true;
        let file = people(vec![
            ("Ann", both),
            ("Ben", CurationEntry::uncurated(vec![])),
            ("Cat", CurationEntry::skipped()),
        ]);

        let issues = StructureCheck.check(&file);
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.kind == IssueKind::Structure && i.is_error()));
    }

    #[test]
    fn test_canonical_requires_name() {
        let file = people(vec![
            ("Ann", CurationEntry::canonical(json!({"lastname": "Lee"}))),
            ("Bo", CurationEntry::canonical(json!({"name": null, "lastname": null}))),
        ]);

        let issues = StructureCheck.check(&file);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].raw_name, "Ann");
        assert_eq!(issues[0].kind, IssueKind::InvalidCanonical);
    }

    #[test]
    fn test_location_canonical_null_is_valid() {
        let file = CurationFile::new(2024, EntityKind::Locations)
            .with_entry("Montréal", "Jarry", CurationEntry::canonical(serde_json::Value::Null))
            .with_entry("Montréal", "Odd", CurationEntry::canonical(json!(42)));

        let issues = StructureCheck.check(&file);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].raw_name, "Odd");
        assert_eq!(issues[0].scope, "Montréal");
    }

    #[test]
    fn test_bad_dates_are_warnings() {
        let file = people(vec![(
            "Ann",
            CurationEntry::skipped().with_dates(["2024-01-01", "Jan 5"]),
        )]);
        let issues = StructureCheck.check(&file);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
    }

    #[test]
    fn test_circular_flags_both_endpoints() {
        let file = people(vec![
            ("Bob", CurationEntry::same_as("Robert")),
            ("Robert", CurationEntry::same_as("Bob")),
        ]);

        let issues = SameAsCheck.check(&file);
        let names: Vec<&str> = issues.iter().map(|i| i.raw_name.as_str()).collect();
        assert_eq!(names, vec!["Bob", "Robert"]);
        assert!(issues.iter().all(|i| i.kind == IssueKind::CircularSameAs));
    }

    #[test]
    fn test_same_as_must_stay_in_scope() {
        let file = CurationFile::new(2024, EntityKind::Locations)
            .with_entry("Montréal", "Jarry", CurationEntry::canonical(json!("Parc Jarry")))
            .with_entry("Québec", "Le parc", CurationEntry::same_as("Jarry"));

        let issues = SameAsCheck.check(&file);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::DanglingSameAs);
        assert_eq!(issues[0].scope, "Québec");
    }
}
