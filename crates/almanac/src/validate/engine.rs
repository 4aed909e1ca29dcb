//! Validation engine that runs every check and collects a report.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::curation::{CurationFile, EntityKind, load_years};
use crate::error::Result;

use super::checks::{CurationCheck, SameAsCheck, StructureCheck};
use super::cross_year::{CrossYearCheck, DisambiguationCheck};
use super::issue::{IssueKind, Severity, ValidationIssue};

/// Result of validating one entity kind.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    /// Entity kind validated.
    #[serde(rename = "type")]
    pub kind: Option<EntityKind>,
    /// Years that loaded and were checked.
    pub years: Vec<i32>,
    /// Issues, errors first.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Number of issues at a severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// Number of errors.
    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    /// Whether any error blocks consolidation.
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(ValidationIssue::is_error)
    }

    /// Whether nothing at all was found.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Issues at one severity, in report order.
    pub fn issues_with(&self, severity: Severity) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.severity == severity)
    }
}

/// Runs per-file and cross-year checks.
///
/// The engine only reads; it never edits a curation file.
pub struct ValidationEngine {
    file_checks: Vec<Box<dyn CurationCheck>>,
    people_checks: Vec<Box<dyn CrossYearCheck>>,
}

impl ValidationEngine {
    /// Create an engine with the standard checks.
    pub fn new() -> Self {
        Self {
            file_checks: vec![Box::new(StructureCheck), Box::new(SameAsCheck)],
            people_checks: vec![Box::new(DisambiguationCheck)],
        }
    }

    /// Run the per-file checks on a single file.
    pub fn validate_file(&self, file: &CurationFile) -> Vec<ValidationIssue> {
        self.file_checks.iter().flat_map(|check| check.check(file)).collect()
    }

    /// Validate already loaded files of one kind.
    ///
    /// Locations are scoped per city, so their cross-year pass is the
    /// per-city same_as check each file already received.
    pub fn validate(&self, files: &[CurationFile]) -> ValidationReport {
        let mut issues: Vec<ValidationIssue> = files.iter().flat_map(|f| self.validate_file(f)).collect();

        let people: Vec<CurationFile> = files
            .iter()
            .filter(|f| f.kind == EntityKind::People)
            .cloned()
            .collect();
        if !people.is_empty() {
            issues.extend(self.people_checks.iter().flat_map(|check| check.check(&people)));
        }

        let mut years: Vec<i32> = files.iter().map(|f| f.year).collect();
        years.sort_unstable();
        years.dedup();

        ValidationReport {
            kind: files.first().map(|f| f.kind),
            years,
            issues: finish(issues),
        }
    }

    /// Load and validate every year of `kind` in `dir`, or only `years`.
    ///
    /// Files that fail to load and requested years without a file are
    /// reported as structural errors; the remaining years are still checked.
    pub fn validate_dir(
        &self,
        dir: impl AsRef<Path>,
        kind: EntityKind,
        years: Option<&[i32]>,
    ) -> Result<ValidationReport> {
        let loaded = load_years(dir, kind, years)?;
        let mut report = self.validate(&loaded.files);
        report.kind = Some(kind);

        for year in &loaded.missing {
            report.issues.push(ValidationIssue::new(
                IssueKind::Structure,
                Severity::Error,
                *year,
                "",
                format!("no {} curation file for {}", kind, year),
            ));
        }
        for (year, path, error) in &loaded.failures {
            report.issues.push(ValidationIssue::new(
                IssueKind::Structure,
                Severity::Error,
                *year,
                "",
                format!("cannot load {}: {}", path.display(), error),
            ));
        }
        report.issues = finish(std::mem::take(&mut report.issues));

        info!(
            kind = %kind,
            years = report.years.len(),
            errors = report.error_count(),
            warnings = report.count(Severity::Warning),
            ambiguous = report.count(Severity::Ambiguous),
            "validation finished"
        );
        Ok(report)
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop duplicates and order errors first, keeping discovery order within a severity.
fn finish(issues: Vec<ValidationIssue>) -> Vec<ValidationIssue> {
    let mut seen = HashSet::new();
    let mut issues: Vec<ValidationIssue> = issues.into_iter().filter(|i| seen.insert(i.clone())).collect();
    issues.sort_by(|a, b| b.severity.cmp(&a.severity));
    issues
}
