//! Resolve raw mentions against consolidated identities.
//!
//! Lookup tables are built once per resolver, so each mention costs a few
//! hash lookups regardless of how many entities exist.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::consolidate::{Canonical, ConsolidatedEntity, load_entities};
use crate::curation::EntityKind;
use crate::error::Result;
use crate::mention::{base_name, parse_location, parse_person};
use crate::normalize::normalize;

/// Which lookup produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// A raw name curated for the entity.
    RawName,
    /// The full canonical name (`name lastname`), or a location name.
    FullName,
    /// One of the canonical's aliases.
    Alias,
    /// The first name of a person who has no alias.
    FirstName,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MatchKind::RawName => "raw name",
            MatchKind::FullName => "full name",
            MatchKind::Alias => "alias",
            MatchKind::FirstName => "first name",
        };
        f.write_str(label)
    }
}

/// Why a mention did not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum UnresolvedReason {
    /// Nothing left after stripping sigils and punctuation.
    Empty,
    /// No lookup matched.
    NoMatch,
    /// A lookup matched several entities and none matched exactly one.
    Ambiguous { candidates: Vec<String> },
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReason::Empty => f.write_str("empty mention"),
            UnresolvedReason::NoMatch => f.write_str("no matching entity"),
            UnresolvedReason::Ambiguous { candidates } => {
                write!(f, "ambiguous between {}", candidates.join(", "))
            }
        }
    }
}

/// Result of resolving one mention.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'a> {
    /// The mention maps to exactly one entity.
    Resolved {
        entity: &'a ConsolidatedEntity,
        matched_by: MatchKind,
    },
    /// The mention maps to no entity, or to several.
    Unresolved {
        mention: String,
        reason: UnresolvedReason,
    },
}

impl<'a> Resolution<'a> {
    /// The resolved entity, if any.
    pub fn entity(&self) -> Option<&'a ConsolidatedEntity> {
        match self {
            Resolution::Resolved { entity, .. } => Some(entity),
            Resolution::Unresolved { .. } => None,
        }
    }

    /// The resolved canonical key, if any.
    pub fn canonical_key(&self) -> Option<&'a str> {
        self.entity().map(|e| e.canonical_key.as_str())
    }

    /// Whether the mention resolved.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved { .. })
    }
}

/// Key to entity indices; a key may be shared by several entities.
#[derive(Debug, Default)]
struct Index(HashMap<String, Vec<usize>>);

impl Index {
    fn insert(&mut self, key: String, entity: usize) {
        if key.is_empty() {
            return;
        }
        let slot = self.0.entry(key).or_default();
        if !slot.contains(&entity) {
            slot.push(entity);
        }
    }

    fn get(&self, key: &str) -> &[usize] {
        self.0.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Outcome of trying the lookups in order.
enum Lookup {
    Found(usize, MatchKind),
    Ambiguous(Vec<usize>),
    Missing,
}

/// Maps raw mentions to consolidated entities of one kind.
#[derive(Debug)]
pub struct EntityResolver {
    kind: EntityKind,
    entities: Vec<ConsolidatedEntity>,
    by_raw: Index,
    by_full: Index,
    by_alias: Index,
    by_first: Index,
}

impl EntityResolver {
    /// Build a resolver over consolidated entities.
    ///
    /// Location keys are prefixed with the normalized city so the same name
    /// in two cities stays distinct; unprefixed copies serve mentions
    /// without a city.
    pub fn new(kind: EntityKind, entities: Vec<ConsolidatedEntity>) -> Self {
        let mut resolver = Self {
            kind,
            entities,
            by_raw: Index::default(),
            by_full: Index::default(),
            by_alias: Index::default(),
            by_first: Index::default(),
        };

        for (i, entity) in resolver.entities.iter().enumerate() {
            let city = entity.city.as_deref().map(normalize);
            let scoped = |key: String| match &city {
                Some(city) => vec![format!("{}|{}", city, key), key],
                None => vec![key],
            };

            for raw in &entity.raw_names {
                let key = match kind {
                    EntityKind::People => normalize(raw),
                    EntityKind::Locations => normalize(&parse_location(raw)),
                };
                for k in scoped(key) {
                    resolver.by_raw.insert(k, i);
                }
            }

            match &entity.canonical {
                Canonical::Person(person) => {
                    resolver.by_full.insert(person.full_name_key(), i);
                    for alias in &person.alias {
                        resolver.by_alias.insert(normalize(alias), i);
                    }
                    if person.alias.is_empty() {
                        if let Some(first) = normalize(&person.name).split(' ').next() {
                            resolver.by_first.insert(first.to_string(), i);
                        }
                    }
                }
                Canonical::Location(name) => {
                    for k in scoped(normalize(name)) {
                        resolver.by_full.insert(k, i);
                    }
                }
            }
        }

        debug!(kind = %kind, entities = resolver.entities.len(), "built entity resolver");
        resolver
    }

    /// Build a resolver from a consolidated file.
    pub fn from_file(path: impl AsRef<Path>, kind: EntityKind) -> Result<Self> {
        Ok(Self::new(kind, load_entities(path, kind)?))
    }

    /// Entity kind this resolver serves.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// All entities, in consolidated order.
    pub fn entities(&self) -> &[ConsolidatedEntity] {
        &self.entities
    }

    /// Resolve a mention; `city` scopes location lookups.
    pub fn resolve(&self, mention: &str, city: Option<&str>) -> Resolution<'_> {
        let lookup = match self.kind {
            EntityKind::People => self.lookup_person(mention),
            EntityKind::Locations => self.lookup_location(mention, city),
        };

        match lookup {
            Some(Lookup::Found(i, matched_by)) => Resolution::Resolved {
                entity: &self.entities[i],
                matched_by,
            },
            Some(Lookup::Ambiguous(candidates)) => Resolution::Unresolved {
                mention: mention.to_string(),
                reason: UnresolvedReason::Ambiguous {
                    candidates: candidates
                        .into_iter()
                        .map(|i| self.entities[i].canonical_key.clone())
                        .collect(),
                },
            },
            Some(Lookup::Missing) => Resolution::Unresolved {
                mention: mention.to_string(),
                reason: UnresolvedReason::NoMatch,
            },
            None => Resolution::Unresolved {
                mention: mention.to_string(),
                reason: UnresolvedReason::Empty,
            },
        }
    }

    fn lookup_person(&self, mention: &str) -> Option<Lookup> {
        let raw_key = normalize(mention);
        if raw_key.is_empty() {
            return None;
        }

        let parsed = parse_person(mention);
        let full_key = normalize(&parsed.full_name());
        let alias_key = match &parsed.alias {
            Some(alias) => normalize(alias),
            None => normalize(&base_name(mention)),
        };

        let mut attempts = vec![
            (&self.by_raw, raw_key, MatchKind::RawName),
            (&self.by_full, full_key, MatchKind::FullName),
            (&self.by_alias, alias_key, MatchKind::Alias),
        ];
        // A bare first name only; "Alice Jones" must not match "Alice Smith".
        if parsed.expansion.is_none() && parsed.last_name.is_none() {
            let first = normalize(&parsed.first_name);
            if !first.contains(' ') {
                attempts.push((&self.by_first, first, MatchKind::FirstName));
            }
        }

        Some(first_unique(attempts))
    }

    fn lookup_location(&self, mention: &str, city: Option<&str>) -> Option<Lookup> {
        let raw_key = normalize(&parse_location(mention));
        if raw_key.is_empty() {
            return None;
        }

        // A known city confines the lookup to that city's locations.
        let attempts = match city.map(normalize).filter(|c| !c.is_empty()) {
            Some(city) => {
                let scoped = format!("{}|{}", city, raw_key);
                vec![
                    (&self.by_raw, scoped.clone(), MatchKind::RawName),
                    (&self.by_full, scoped, MatchKind::FullName),
                ]
            }
            None => vec![
                (&self.by_raw, raw_key.clone(), MatchKind::RawName),
                (&self.by_full, raw_key, MatchKind::FullName),
            ],
        };

        Some(first_unique(attempts))
    }
}

/// The first lookup matching exactly one entity wins.
fn first_unique(attempts: Vec<(&Index, String, MatchKind)>) -> Lookup {
    let mut ambiguous: Option<Vec<usize>> = None;

    for (index, key, kind) in attempts {
        match index.get(&key) {
            [] => {}
            [only] => return Lookup::Found(*only, kind),
            many => {
                ambiguous.get_or_insert_with(|| many.to_vec());
            }
        }
    }

    match ambiguous {
        Some(candidates) => Lookup::Ambiguous(candidates),
        None => Lookup::Missing,
    }
}
