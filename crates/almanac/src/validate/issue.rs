//! Diagnostic records produced by validation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Type of issue detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// The file or entry does not have the expected shape.
    Structure,
    /// The canonical payload is missing required content.
    InvalidCanonical,
    /// A same_as target is missing from the scope.
    DanglingSameAs,
    /// A same_as chain loops back on itself.
    CircularSameAs,
    /// A mention date is not an ISO date.
    InvalidDate,
    /// An undisambiguated name recurs across years under one identity.
    Ambiguous,
    /// Some years disambiguate a name and others do not.
    InconsistentDisambiguation,
}

impl IssueKind {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            IssueKind::Structure => "Structure",
            IssueKind::InvalidCanonical => "Invalid Canonical",
            IssueKind::DanglingSameAs => "Dangling same_as",
            IssueKind::CircularSameAs => "Circular same_as",
            IssueKind::InvalidDate => "Invalid Date",
            IssueKind::Ambiguous => "Ambiguous Name",
            IssueKind::InconsistentDisambiguation => "Inconsistent Disambiguation",
        }
    }
}

/// Severity level of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Worth a human look; never blocks anything.
    Ambiguous,
    /// Likely a curation slip; does not block consolidation.
    Warning,
    /// Blocks consolidation unless forced.
    Error,
}

impl Severity {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Ambiguous => "Ambiguous",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        }
    }
}

/// A problem found in one or more curation files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Type of issue.
    #[serde(rename = "type")]
    pub kind: IssueKind,
    /// Severity level.
    pub severity: Severity,
    /// Years involved; one for per-file issues.
    pub years: Vec<i32>,
    /// City for location issues, empty for people.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scope: String,
    /// Raw name (or base name, for cross-year issues); empty for file-level issues.
    pub raw_name: String,
    /// Human-readable description.
    pub message: String,
}

impl ValidationIssue {
    /// Create an issue for a single year.
    pub fn new(
        kind: IssueKind,
        severity: Severity,
        year: i32,
        raw_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            years: vec![year],
            scope: String::new(),
            raw_name: raw_name.into(),
            message: message.into(),
        }
    }

    /// Set the scope (city).
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Replace the years involved.
    pub fn with_years(mut self, years: Vec<i32>) -> Self {
        self.years = years;
        self
    }

    /// Whether this issue blocks consolidation.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let years: Vec<String> = self.years.iter().map(i32::to_string).collect();
        write!(f, "[{}] {}", self.severity.label(), years.join(","))?;
        if !self.scope.is_empty() {
            write!(f, " {}", self.scope)?;
        }
        if !self.raw_name.is_empty() {
            write!(f, " '{}'", self.raw_name)?;
        }
        write!(f, ": {}", self.message)
    }
}
