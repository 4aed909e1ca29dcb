//! Multi-year merge of curation decisions.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::curation::{
    ChainOutcome, CurationEntry, CurationFile, Disposition, EntityKind, PersonCanonical,
    location_key, location_name_from_payload, resolve_chains,
};
use crate::normalize::normalize;

use super::entity::{
    Canonical, ConsolidatedEntity, Conflict, DatesByYear, SelfReferences, SkipReason, SkippedMention,
};

/// Everything one consolidation run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidationResult {
    /// Entity kind consolidated.
    pub kind: EntityKind,
    /// Years merged, ascending.
    pub years: Vec<i32>,
    /// Merged identities, in output order.
    pub entities: Vec<ConsolidatedEntity>,
    /// Entries excluded, in encounter order.
    pub skipped: Vec<SkippedMention>,
    /// Author references (people only).
    pub self_refs: SelfReferences,
    /// Field disagreements resolved by the tie-break.
    pub conflicts: Vec<Conflict>,
    /// Curation entries read across all years.
    pub total_entries: usize,
}

impl ConsolidationResult {
    /// Curation entries that reached an entity.
    pub fn mapped_entries(&self) -> usize {
        self.entities.iter().map(|e| e.entry_count).sum()
    }

    /// Whether every entry landed in exactly one of merged, skipped or self.
    pub fn is_partition_total(&self) -> bool {
        self.mapped_entries() + self.skipped.len() + self.self_refs.entry_count == self.total_entries
    }

    /// Skipped entries with one reason.
    pub fn skipped_with(&self, reason: SkipReason) -> impl Iterator<Item = &SkippedMention> {
        self.skipped.iter().filter(move |s| s.reason == reason)
    }

    /// Look up an entity by canonical key.
    pub fn entity(&self, canonical_key: &str) -> Option<&ConsolidatedEntity> {
        self.entities.iter().find(|e| e.canonical_key == canonical_key)
    }
}

/// What a single entry contributes once its same_as chain is followed.
enum Effective {
    Person(PersonCanonical),
    Location(String),
    Author,
    Excluded(SkipReason),
}

/// Merge the curation files of one kind.
///
/// Years are merged in ascending order. When two years disagree on a field,
/// the most recent year wins; within one year the first entry wins. Every
/// disagreement is also recorded as a [`Conflict`].
pub fn consolidate(kind: EntityKind, files: &[CurationFile]) -> ConsolidationResult {
    let mut files: Vec<&CurationFile> = files.iter().filter(|f| f.kind == kind).collect();
    files.sort_by_key(|f| f.year);

    let mut merger = Merger::new(kind);
    for file in files {
        merger.add_file(file);
    }
    merger.finish()
}

fn effective(kind: EntityKind, scope: &str, key: &str, entry: &CurationEntry) -> Effective {
    let payload = entry.canonical.as_ref().unwrap_or(&serde_json::Value::Null);
    match entry.disposition(kind) {
        Ok(Disposition::Canonical) => match kind {
            EntityKind::People => PersonCanonical::from_payload(key, payload)
                .map(Effective::Person)
                .unwrap_or(Effective::Excluded(SkipReason::NoCanonical)),
            EntityKind::Locations => location_name_from_payload(key, payload)
                .map(Effective::Location)
                .unwrap_or(Effective::Excluded(SkipReason::NoCanonical)),
        },
        Ok(Disposition::Skip) => Effective::Excluded(SkipReason::Skip),
        Ok(Disposition::SelfRef) => Effective::Author,
        // Terminal entries are never aliases; this only guards malformed input.
        Ok(Disposition::SameAs(_)) => Effective::Excluded(SkipReason::UnresolvedSameAs),
        Err(reason) => {
            debug!(scope, raw_name = key, reason = %reason, "entry has no usable disposition");
            Effective::Excluded(SkipReason::NoCanonical)
        }
    }
}

/// A field value and the year it came from.
#[derive(Debug, Clone)]
struct Tracked {
    value: String,
    year: i32,
}

/// Apply the tie-break to one field; returns `(kept, discarded)` on disagreement.
fn merge_field(slot: &mut Option<Tracked>, incoming: Option<&str>, year: i32) -> Option<(Tracked, Tracked)> {
    let value = incoming?;
    let incoming = Tracked {
        value: value.to_string(),
        year,
    };

    let Some(current) = slot else {
        *slot = Some(incoming);
        return None;
    };

    let differs = normalize(&current.value) != normalize(value);
    if year > current.year {
        let previous = std::mem::replace(current, incoming);
        differs.then(|| (current.clone(), previous))
    } else if differs {
        Some((current.clone(), incoming))
    } else {
        None
    }
}

/// Merge state of one canonical key.
struct Accumulator {
    canonical_key: String,
    city: Option<String>,
    name: Option<Tracked>,
    lastname: Option<Tracked>,
    disambiguator: Option<Tracked>,
    alias: Vec<String>,
    alias_keys: HashSet<String>,
    names: NameSet,
    entry_count: usize,
}

impl Accumulator {
    fn new(canonical_key: String, city: Option<String>) -> Self {
        Self {
            canonical_key,
            city,
            name: None,
            lastname: None,
            disambiguator: None,
            alias: Vec::new(),
            alias_keys: HashSet::new(),
            names: NameSet::default(),
            entry_count: 0,
        }
    }

    fn merge_person(&mut self, person: &PersonCanonical, year: i32, conflicts: &mut Vec<Conflict>) {
        let fields = [
            ("name", &mut self.name, Some(person.name.as_str())),
            ("lastname", &mut self.lastname, person.lastname.as_deref()),
            ("disambiguator", &mut self.disambiguator, person.disambiguator.as_deref()),
        ];
        for (field, slot, incoming) in fields {
            if let Some((kept, discarded)) = merge_field(slot, incoming, year) {
                conflicts.push(conflict(&self.canonical_key, field, kept, discarded));
            }
        }

        for alias in &person.alias {
            let key = normalize(alias);
            if !key.is_empty() && self.alias_keys.insert(key) {
                self.alias.push(alias.clone());
            }
        }
    }

    fn merge_location(&mut self, name: &str, year: i32, conflicts: &mut Vec<Conflict>) {
        if let Some((kept, discarded)) = merge_field(&mut self.name, Some(name), year) {
            conflicts.push(conflict(&self.canonical_key, "name", kept, discarded));
        }
    }

    fn into_entity(self, kind: EntityKind) -> ConsolidatedEntity {
        let name = self.name.map(|t| t.value).unwrap_or_default();
        let canonical = match kind {
            EntityKind::People => Canonical::Person(PersonCanonical {
                name,
                lastname: self.lastname.map(|t| t.value),
                disambiguator: self.disambiguator.map(|t| t.value),
                alias: self.alias,
            }),
            EntityKind::Locations => Canonical::Location(name),
        };

        ConsolidatedEntity {
            canonical_key: self.canonical_key,
            canonical,
            raw_names: self.names.raw_names,
            dates: self.names.dates.into_dates(),
            city: self.city,
            entry_count: self.entry_count,
        }
    }
}

fn conflict(canonical_key: &str, field: &'static str, kept: Tracked, discarded: Tracked) -> Conflict {
    let conflict = Conflict {
        canonical_key: canonical_key.to_string(),
        field,
        kept: kept.value,
        kept_year: kept.year,
        discarded: discarded.value,
        discarded_year: discarded.year,
    };
    warn!(%conflict, "conflicting canonical values");
    conflict
}

/// Distinct raw names plus dates by year.
#[derive(Default)]
struct NameSet {
    raw_names: Vec<String>,
    seen: HashSet<String>,
    dates: YearDates,
}

impl NameSet {
    fn add(&mut self, raw_name: &str, year: i32, dates: &[String]) {
        if self.seen.insert(raw_name.to_string()) {
            self.raw_names.push(raw_name.to_string());
        }
        self.dates.add(year, dates);
    }
}

#[derive(Default)]
struct YearDates(BTreeMap<String, BTreeSet<String>>);

impl YearDates {
    fn add(&mut self, year: i32, dates: &[String]) {
        if dates.is_empty() {
            return;
        }
        self.0
            .entry(year.to_string())
            .or_default()
            .extend(dates.iter().cloned());
    }

    fn into_dates(self) -> DatesByYear {
        self.0
            .into_iter()
            .map(|(year, dates)| (year, dates.into_iter().collect()))
            .collect()
    }
}

struct Merger {
    kind: EntityKind,
    years: Vec<i32>,
    groups: IndexMap<String, Accumulator>,
    skipped: Vec<SkippedMention>,
    author: NameSet,
    author_entries: usize,
    conflicts: Vec<Conflict>,
    total_entries: usize,
}

impl Merger {
    fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            years: Vec::new(),
            groups: IndexMap::new(),
            skipped: Vec::new(),
            author: NameSet::default(),
            author_entries: 0,
            conflicts: Vec::new(),
            total_entries: 0,
        }
    }

    fn add_file(&mut self, file: &CurationFile) {
        if !self.years.contains(&file.year) {
            self.years.push(file.year);
        }

        for (scope, entries) in &file.scopes {
            let outcomes = resolve_chains(entries);

            for (raw_name, entry) in entries {
                self.total_entries += 1;

                let resolved = match outcomes.get(raw_name) {
                    Some(ChainOutcome::Terminal(terminal)) => match entries.get(terminal) {
                        Some(target) => effective(self.kind, scope, terminal, target),
                        None => Effective::Excluded(SkipReason::UnresolvedSameAs),
                    },
                    _ => Effective::Excluded(SkipReason::UnresolvedSameAs),
                };

                self.place(file.year, scope, raw_name, entry, resolved);
            }
        }

        debug!(year = file.year, kind = %self.kind, entries = file.len(), "merged curation file");
    }

    fn place(&mut self, year: i32, scope: &str, raw_name: &str, entry: &CurationEntry, resolved: Effective) {
        let city = (self.kind == EntityKind::Locations).then(|| scope.to_string());

        let (key, person, location) = match resolved {
            Effective::Excluded(reason) => {
                debug!(year, scope, raw_name, reason = %reason, "entry excluded from consolidation");
                self.skipped.push(SkippedMention {
                    raw_name: raw_name.to_string(),
                    year,
                    city,
                    reason,
                });
                return;
            }
            Effective::Author => {
                self.author.add(raw_name, year, &entry.dates);
                self.author_entries += 1;
                return;
            }
            Effective::Person(person) => (person.canonical_key(), Some(person), None),
            Effective::Location(name) => (location_key(scope, &name), None, Some(name)),
        };

        let group = self
            .groups
            .entry(key.clone())
            .or_insert_with(|| Accumulator::new(key, city));

        if let Some(person) = &person {
            group.merge_person(person, year, &mut self.conflicts);
        }
        if let Some(name) = &location {
            group.merge_location(name, year, &mut self.conflicts);
        }
        group.names.add(raw_name, year, &entry.dates);
        group.entry_count += 1;
    }

    fn finish(self) -> ConsolidationResult {
        let kind = self.kind;
        let mut entities: Vec<ConsolidatedEntity> = self
            .groups
            .into_values()
            .map(|group| group.into_entity(kind))
            .collect();
        entities.sort_by_cached_key(output_order);

        let mut years = self.years;
        years.sort_unstable();

        ConsolidationResult {
            kind,
            years,
            entities,
            skipped: self.skipped,
            self_refs: SelfReferences {
                raw_names: self.author.raw_names,
                dates: self.author.dates.into_dates(),
                entry_count: self.author_entries,
            },
            conflicts: self.conflicts,
            total_entries: self.total_entries,
        }
    }
}

/// Sort key: city bucket (unassigned-style buckets last), then name, then key.
pub(crate) fn output_order(entity: &ConsolidatedEntity) -> (bool, String, String, String, String) {
    let city = entity.city.as_deref().unwrap_or("");
    let (name, lastname) = match &entity.canonical {
        Canonical::Person(person) => (
            normalize(&person.name),
            person.lastname.as_deref().map(normalize).unwrap_or_default(),
        ),
        Canonical::Location(name) => (normalize(name), String::new()),
    };
    (
        city.starts_with('_'),
        normalize(city),
        name,
        lastname,
        entity.canonical_key.clone(),
    )
}
