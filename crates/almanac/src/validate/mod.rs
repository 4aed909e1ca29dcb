//! Curation validation.
//!
//! Two passes run over the curation files of one entity kind:
//!
//! - **Per file**: every entry has exactly one disposition, canonical
//!   payloads are usable, same_as targets exist in the same scope and
//!   chains terminate.
//! - **Across years** (people): names that are left undisambiguated in
//!   several years, or disambiguated in some years and not others.
//!
//! Errors block consolidation unless it is explicitly forced. Warnings and
//! ambiguity flags are for human review only.

mod checks;
mod cross_year;
mod engine;
mod issue;

pub use checks::{CurationCheck, SameAsCheck, StructureCheck};
pub use cross_year::{CrossYearCheck, DisambiguationCheck};
pub use engine::{ValidationEngine, ValidationReport};
pub use issue::{IssueKind, Severity, ValidationIssue};
