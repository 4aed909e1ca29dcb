//! Consolidation output records.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::curation::PersonCanonical;

/// Dates a name was mentioned on, keyed by year.
pub type DatesByYear = BTreeMap<String, Vec<String>>;

/// A merged canonical payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Canonical {
    /// A person.
    Person(PersonCanonical),
    /// A location name (the city is carried by the entity).
    Location(String),
}

impl Canonical {
    /// Name used for display and sorting.
    pub fn display_name(&self) -> String {
        match self {
            Canonical::Person(person) => person.display_name(),
            Canonical::Location(name) => name.clone(),
        }
    }

    /// The person payload, if this is a person.
    pub fn as_person(&self) -> Option<&PersonCanonical> {
        match self {
            Canonical::Person(person) => Some(person),
            Canonical::Location(_) => None,
        }
    }
}

/// One identity merged across every consolidated year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidatedEntity {
    /// Accent- and case-insensitive identity key.
    pub canonical_key: String,
    /// Merged canonical payload.
    pub canonical: Canonical,
    /// Every distinct raw name mapped here, in first-encounter order.
    pub raw_names: Vec<String>,
    /// Mention dates by year, sorted and deduplicated.
    pub dates: DatesByYear,
    /// City bucket (locations only); implied by the file layout.
    #[serde(default, skip_serializing)]
    pub city: Option<String>,
    /// Number of curation entries merged here.
    #[serde(skip)]
    pub entry_count: usize,
}

impl ConsolidatedEntity {
    /// Total number of distinct dates across years.
    pub fn date_count(&self) -> usize {
        self.dates.values().map(Vec::len).sum()
    }
}

/// Why a curation entry did not reach a consolidated entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Marked `skip` (directly or through its same_as chain).
    Skip,
    /// No usable canonical: malformed entry, invalid payload, or a chain
    /// ending at such an entry.
    NoCanonical,
    /// The same_as chain dangles or loops.
    UnresolvedSameAs,
}

impl SkipReason {
    /// Section name in the consolidated file.
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::Skip => "skip",
            SkipReason::NoCanonical => "no_canonical",
            SkipReason::UnresolvedSameAs => "unresolved_same_as",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A curation entry excluded from consolidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedMention {
    /// Raw name as curated.
    pub raw_name: String,
    /// Year of the curation file.
    pub year: i32,
    /// City bucket (locations only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Why it was excluded.
    pub reason: SkipReason,
}

/// Every raw name curated as the journal's author.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfReferences {
    /// Distinct raw names, in first-encounter order.
    pub raw_names: Vec<String>,
    /// Mention dates by year.
    pub dates: DatesByYear,
    /// Number of curation entries folded in.
    #[serde(skip)]
    pub entry_count: usize,
}

impl SelfReferences {
    /// Whether no author references were found.
    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }
}

/// Two years disagree on a field of the same identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    /// Identity the conflict belongs to.
    pub canonical_key: String,
    /// Field name.
    pub field: &'static str,
    /// Value kept in the merged canonical.
    pub kept: String,
    /// Year the kept value comes from.
    pub kept_year: i32,
    /// Value discarded.
    pub discarded: String,
    /// Year the discarded value comes from.
    pub discarded_year: i32,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} '{}' ({}) kept over '{}' ({})",
            self.canonical_key, self.field, self.kept, self.kept_year, self.discarded, self.discarded_year
        )
    }
}
