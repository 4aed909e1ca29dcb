//! Almanac: curation pipeline for people and places mentioned in a journal.
//!
//! Journal entries mention the same person or place under many spellings.
//! Almanac turns those raw mentions into canonical identities in four stages:
//!
//! - **Extract**: collect raw mentions per year and draft clusters of likely
//!   variants ([`extract`], [`cluster`])
//! - **Curate**: a person edits per-year curation files ([`curation`]),
//!   checked by [`validate`]
//! - **Consolidate**: merge every year into one file per entity kind
//!   ([`consolidate`])
//! - **Import**: resolve each entry's mentions against the consolidated
//!   entities and write it to the datastore ([`resolve`], [`import`], [`store`])
//!
//! # Example
//!
//! ```no_run
//! use almanac::consolidate::Consolidator;
//! use almanac::curation::EntityKind;
//!
//! let run = Consolidator::new(EntityKind::People)
//!     .run("curation", "consolidated", None)
//!     .unwrap();
//!
//! println!("Errors: {}", run.report.error_count());
//! if let Some(result) = &run.result {
//!     println!("Entities: {}", result.entities.len());
//! }
//! ```

pub mod cluster;
pub mod config;
pub mod consolidate;
pub mod curation;
pub mod error;
pub mod extract;
pub mod import;
pub mod mention;
pub mod normalize;
pub mod resolve;
pub mod source;
pub mod store;
pub mod validate;

pub use config::{AlmanacConfig, ImportConfig};
pub use consolidate::{ConsolidatedEntity, ConsolidationResult, Consolidator};
pub use curation::{CurationEntry, CurationFile, EntityKind, PersonCanonical};
pub use error::{AlmanacError, ImportErrorKind, Result};
pub use import::{CurationImporter, ImportLedger, ImportReport};
pub use normalize::normalize;
pub use resolve::{EntityResolver, Resolution};
pub use source::SourceDocument;
pub use validate::{Severity, ValidationEngine, ValidationIssue, ValidationReport};
