//! Curation files: the human-edited artifact between extraction and
//! consolidation.
//!
//! Each year has one file per entity kind. Every raw name gets exactly one
//! entry, and a curator gives each entry exactly one disposition:
//!
//! ```text
//! curation/
//! ├── 2024_people_curation.json      # raw_name -> entry
//! ├── 2024_people_clusters.json      # draft groups (advisory)
//! ├── 2024_locations_curation.json   # city -> raw_name -> entry
//! └── 2024_locations_clusters.json
//! ```
//!
//! ```json
//! {
//!   "Alice":       { "canonical": { "name": "Alice", "lastname": "Smith" }, "dates": ["2024-01-01"] },
//!   "Al":          { "same_as": "Alice" },
//!   "the barista": { "skip": true },
//!   "me":          { "self": true }
//! }
//! ```

mod canonical;
mod chain;
mod entry;
mod file;
mod persistence;

pub use canonical::{
    PersonCanonical, location_key, location_name_from_payload, person_key,
};
pub use chain::{ChainOutcome, resolve_chains};
pub use entry::{CurationEntry, Disposition, EntityKind};
pub use file::{
    CurationFile, LoadedYears, MergeSummary, PEOPLE_SCOPE, ScopeEntries, UNASSIGNED_CITY, curation_file_name,
    curation_file_path, discover_years, load_years,
};
pub use persistence::{read_json, write_json};
