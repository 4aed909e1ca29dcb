//! Consolidated file layout.
//!
//! People:
//!
//! ```json
//! {
//!   "Alice Smith": { "canonical_key": "alice|smith", "canonical": {...}, "raw_names": [...], "dates": {...} },
//!   "_skipped": { "skip": [...], "no_canonical": [...], "unresolved_same_as": [...] },
//!   "_self": { "raw_names": [...], "dates": {...} }
//! }
//! ```
//!
//! Locations nest entities under their city, cities sorted with `_`-prefixed
//! buckets last, followed by `_skipped`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::curation::{EntityKind, read_json, write_json};
use crate::error::Result;

use super::entity::{ConsolidatedEntity, SelfReferences, SkipReason, SkippedMention};
use super::merge::ConsolidationResult;

/// Top-level key of the skipped section.
pub const SKIPPED_SECTION: &str = "_skipped";

/// Top-level key of the author section (people only).
pub const SELF_SECTION: &str = "_self";

/// Path of the consolidated file of `kind` inside `dir`.
pub fn consolidated_file_path(dir: impl AsRef<Path>, kind: EntityKind) -> PathBuf {
    dir.as_ref().join(format!("{}_consolidated.json", kind.label()))
}

#[derive(Serialize)]
#[serde(untagged)]
enum Section<'a> {
    Entity(&'a ConsolidatedEntity),
    City(IndexMap<String, &'a ConsolidatedEntity>),
    Skipped(IndexMap<&'static str, Vec<&'a SkippedMention>>),
    Author(&'a SelfReferences),
}

/// Hands out display keys, suffixing repeats with `#2`, `#3`...
#[derive(Default)]
struct KeyAllocator {
    used: HashMap<String, usize>,
}

impl KeyAllocator {
    fn reserve(&mut self, key: &str) {
        self.used.insert(key.to_string(), 1);
    }

    fn allocate(&mut self, base: String) -> String {
        let count = self.used.entry(base.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            base
        } else {
            format!("{} #{}", base, count)
        }
    }
}

impl ConsolidationResult {
    fn document(&self) -> IndexMap<String, Section<'_>> {
        let mut document = IndexMap::new();

        match self.kind {
            EntityKind::People => {
                let mut keys = KeyAllocator::default();
                keys.reserve(SKIPPED_SECTION);
                keys.reserve(SELF_SECTION);
                for entity in &self.entities {
                    let key = keys.allocate(entity.canonical.display_name());
                    document.insert(key, Section::Entity(entity));
                }
            }
            EntityKind::Locations => {
                // Entities are already in city order.
                let mut cities: IndexMap<String, (KeyAllocator, IndexMap<String, &ConsolidatedEntity>)> =
                    IndexMap::new();
                for entity in &self.entities {
                    let city = entity.city.clone().unwrap_or_default();
                    let (keys, bucket) = cities.entry(city).or_default();
                    bucket.insert(keys.allocate(entity.canonical.display_name()), entity);
                }
                for (city, (_, bucket)) in cities {
                    document.insert(city, Section::City(bucket));
                }
            }
        }

        let mut skipped: IndexMap<&'static str, Vec<&SkippedMention>> = IndexMap::new();
        for reason in [SkipReason::Skip, SkipReason::NoCanonical, SkipReason::UnresolvedSameAs] {
            skipped.insert(reason.label(), self.skipped_with(reason).collect());
        }
        document.insert(SKIPPED_SECTION.to_string(), Section::Skipped(skipped));

        if self.kind == EntityKind::People {
            document.insert(SELF_SECTION.to_string(), Section::Author(&self.self_refs));
        }

        document
    }

    /// Render the consolidated document as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.document())?)
    }

    /// Write the consolidated document, replacing any previous file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        write_json(path, &self.document())?;
        info!(
            path = %path.display(),
            entities = self.entities.len(),
            skipped = self.skipped.len(),
            "wrote consolidated file"
        );
        Ok(())
    }
}

/// Load the merged entities of a consolidated file.
///
/// The `_skipped` and `_self` sections are not entities and are ignored.
pub fn load_entities(path: impl AsRef<Path>, kind: EntityKind) -> Result<Vec<ConsolidatedEntity>> {
    let document: IndexMap<String, Value> = read_json(path)?;
    let mut entities = Vec::new();

    for (key, value) in document {
        if key == SKIPPED_SECTION || (kind == EntityKind::People && key == SELF_SECTION) {
            continue;
        }
        match kind {
            EntityKind::People => entities.push(serde_json::from_value(value)?),
            EntityKind::Locations => {
                let bucket: IndexMap<String, ConsolidatedEntity> = serde_json::from_value(value)?;
                entities.extend(bucket.into_values().map(|mut entity| {
                    entity.city = Some(key.clone());
                    entity
                }));
            }
        }
    }

    Ok(entities)
}
