//! Multi-year consolidation.
//!
//! Consolidation reads every requested year of one entity kind, follows
//! same_as chains, and merges entries that share a canonical key into one
//! [`ConsolidatedEntity`]. Every curation entry ends up in exactly one of
//! three places: a merged entity, the skipped list, or the author
//! references.
//!
//! Output is recomputed in full on each run; identical input produces a
//! byte-identical file.

mod entity;
mod merge;
mod output;

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::curation::{EntityKind, load_years};
use crate::error::{AlmanacError, Result};
use crate::validate::{ValidationEngine, ValidationReport};

pub use entity::{
    Canonical, ConsolidatedEntity, Conflict, DatesByYear, SelfReferences, SkipReason, SkippedMention,
};
pub use merge::{ConsolidationResult, consolidate};
pub use output::{SELF_SECTION, SKIPPED_SECTION, consolidated_file_path, load_entities};

/// Outcome of [`Consolidator::run`].
#[derive(Debug)]
pub struct ConsolidationRun {
    /// Validation performed before merging.
    pub report: ValidationReport,
    /// Merge result; `None` when only validating.
    pub result: Option<ConsolidationResult>,
    /// File written, if any.
    pub output_path: Option<PathBuf>,
    /// Whether validation errors were overridden.
    pub forced: bool,
}

/// Validates, merges, and writes the consolidated file of one entity kind.
#[derive(Debug, Clone)]
pub struct Consolidator {
    kind: EntityKind,
    force: bool,
    validate_only: bool,
}

impl Consolidator {
    /// Create a consolidator for one entity kind.
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            force: false,
            validate_only: false,
        }
    }

    /// Merge even when validation reports errors.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Stop after validation.
    pub fn with_validate_only(mut self, validate_only: bool) -> Self {
        self.validate_only = validate_only;
        self
    }

    /// Run validation, then consolidation of `years` (all years when `None`).
    ///
    /// Validation errors stop the run with [`AlmanacError::Validation`]
    /// unless forced; a forced run logs a warning for the override.
    pub fn run(
        &self,
        curation_dir: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
        years: Option<&[i32]>,
    ) -> Result<ConsolidationRun> {
        let curation_dir = curation_dir.as_ref();
        let report = ValidationEngine::new().validate_dir(curation_dir, self.kind, years)?;

        if self.validate_only {
            return Ok(ConsolidationRun {
                report,
                result: None,
                output_path: None,
                forced: false,
            });
        }

        let forced = report.has_errors();
        if forced {
            if !self.force {
                return Err(AlmanacError::Validation(format!(
                    "{} {} validation error(s); fix them or force consolidation",
                    report.error_count(),
                    self.kind
                )));
            }
            warn!(
                kind = %self.kind,
                errors = report.error_count(),
                "consolidating despite validation errors"
            );
        }

        let loaded = load_years(curation_dir, self.kind, years)?;
        let result = consolidate(self.kind, &loaded.files);
        let output_path = consolidated_file_path(output_dir, self.kind);
        result.save(&output_path)?;

        info!(
            kind = %self.kind,
            years = result.years.len(),
            entities = result.entities.len(),
            conflicts = result.conflicts.len(),
            "consolidation finished"
        );

        Ok(ConsolidationRun {
            report,
            result: Some(result),
            output_path: Some(output_path),
            forced,
        })
    }
}
