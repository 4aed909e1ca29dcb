//! Per-year curation files.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::{AlmanacError, Result};
use crate::mention::RawMention;

use super::entry::{CurationEntry, EntityKind};
use super::persistence::{read_json, write_json};

/// Scope name used for people, which are curated globally per year.
pub const PEOPLE_SCOPE: &str = "";

/// Scope name for locations whose city is unknown.
pub const UNASSIGNED_CITY: &str = "_unassigned";

/// Entries of one scope, keyed by raw name, in file order.
pub type ScopeEntries = IndexMap<String, CurationEntry>;

/// Outcome of merging freshly extracted mentions into a curation file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Raw names seen for the first time.
    pub added: usize,
    /// Uncurated entries whose dates were refreshed.
    pub refreshed: usize,
    /// Curated entries left untouched.
    pub preserved: usize,
}

/// One year's curation decisions for one entity kind.
///
/// People files are a flat `raw_name -> entry` map. Location files are
/// two-level: `city -> raw_name -> entry`. Both are held as scopes here;
/// people use the single [`PEOPLE_SCOPE`].
#[derive(Debug, Clone, PartialEq)]
pub struct CurationFile {
    /// Year the entries were mentioned in.
    pub year: i32,
    /// Entity kind.
    pub kind: EntityKind,
    /// Entries by scope.
    pub scopes: IndexMap<String, ScopeEntries>,
}

impl CurationFile {
    /// Create an empty file.
    pub fn new(year: i32, kind: EntityKind) -> Self {
        Self {
            year,
            kind,
            scopes: IndexMap::new(),
        }
    }

    /// Insert an entry, replacing any previous entry for the same raw name.
    pub fn insert(&mut self, scope: &str, raw_name: impl Into<String>, entry: CurationEntry) {
        self.scopes
            .entry(self.scope_name(scope).to_string())
            .or_default()
            .insert(raw_name.into(), entry);
    }

    /// Builder form of [`CurationFile::insert`].
    pub fn with_entry(mut self, scope: &str, raw_name: impl Into<String>, entry: CurationEntry) -> Self {
        self.insert(scope, raw_name, entry);
        self
    }

    /// Look up an entry.
    pub fn entry(&self, scope: &str, raw_name: &str) -> Option<&CurationEntry> {
        self.scopes.get(self.scope_name(scope))?.get(raw_name)
    }

    /// Iterate over `(scope, raw_name, entry)` in file order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &CurationEntry)> {
        self.scopes.iter().flat_map(|(scope, entries)| {
            entries
                .iter()
                .map(move |(raw, entry)| (scope.as_str(), raw.as_str(), entry))
        })
    }

    /// Total number of entries across scopes.
    pub fn len(&self) -> usize {
        self.scopes.values().map(IndexMap::len).sum()
    }

    /// Whether the file has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries still awaiting a curator.
    pub fn uncurated_count(&self) -> usize {
        self.entries().filter(|(_, _, e)| !e.is_curated()).count()
    }

    /// Merge extracted mentions of one scope.
    ///
    /// Curated entries are never modified. Uncurated entries get their dates
    /// replaced by the extracted dates; new raw names are appended.
    pub fn merge_mentions(&mut self, scope: &str, mentions: &[RawMention]) -> MergeSummary {
        let mut summary = MergeSummary::default();
        let entries = self
            .scopes
            .entry(self.scope_name(scope).to_string())
            .or_default();

        for mention in mentions {
            let dates = mention.dates();
            match entries.get_mut(&mention.raw_name) {
                Some(entry) if entry.is_curated() => summary.preserved += 1,
                Some(entry) => {
                    entry.dates = dates;
                    summary.refreshed += 1;
                }
                None => {
                    entries.insert(mention.raw_name.clone(), CurationEntry::uncurated(dates));
                    summary.added += 1;
                }
            }
        }

        summary
    }

    /// Load a curation file of the given year and kind.
    pub fn load(path: impl AsRef<Path>, year: i32, kind: EntityKind) -> Result<Self> {
        let path = path.as_ref();
        let scopes = match kind {
            EntityKind::People => {
                let entries: ScopeEntries = read_json(path)?;
                let mut scopes = IndexMap::new();
                scopes.insert(PEOPLE_SCOPE.to_string(), entries);
                scopes
            }
            EntityKind::Locations => read_json(path)?,
        };

        let file = Self { year, kind, scopes };
        debug!(path = %path.display(), year, kind = %kind, entries = file.len(), "loaded curation file");
        Ok(file)
    }

    /// Load the file if it exists, otherwise start an empty one.
    pub fn load_or_new(path: impl AsRef<Path>, year: i32, kind: EntityKind) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path, year, kind)
        } else {
            Ok(Self::new(year, kind))
        }
    }

    /// Save as a whole-file replace.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        match self.kind {
            EntityKind::People => {
                let empty = ScopeEntries::new();
                let entries = self.scopes.get(PEOPLE_SCOPE).unwrap_or(&empty);
                write_json(path, entries)
            }
            EntityKind::Locations => write_json(path, &self.scopes),
        }
    }

    fn scope_name<'a>(&self, scope: &'a str) -> &'a str {
        match self.kind {
            EntityKind::People => PEOPLE_SCOPE,
            EntityKind::Locations if scope.is_empty() => UNASSIGNED_CITY,
            EntityKind::Locations => scope,
        }
    }
}

/// File name of a year's curation file.
pub fn curation_file_name(year: i32, kind: EntityKind) -> String {
    format!("{}_{}_curation.json", year, kind.label())
}

/// Path of a year's curation file inside `dir`.
pub fn curation_file_path(dir: impl AsRef<Path>, year: i32, kind: EntityKind) -> PathBuf {
    dir.as_ref().join(curation_file_name(year, kind))
}

/// Years that have a curation file of `kind` in `dir`, ascending.
pub fn discover_years(dir: impl AsRef<Path>, kind: EntityKind) -> Result<Vec<i32>> {
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let suffix = format!("_{}_curation.json", kind.label());
    let mut years: Vec<i32> = std::fs::read_dir(dir)
        .map_err(|e| AlmanacError::io(dir, e))?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            name.strip_suffix(&suffix)?.parse::<i32>().ok()
        })
        .collect();

    years.sort_unstable();
    years.dedup();
    Ok(years)
}

/// Curation files of one kind loaded from a directory.
#[derive(Debug, Default)]
pub struct LoadedYears {
    /// Files that loaded, ascending by year.
    pub files: Vec<CurationFile>,
    /// Files that exist but could not be read or parsed.
    pub failures: Vec<(i32, PathBuf, AlmanacError)>,
    /// Requested years with no file on disk.
    pub missing: Vec<i32>,
}

/// Load every year of `kind` in `dir`, or only the requested `years`.
///
/// A file that fails to load is recorded and the remaining years are still
/// loaded.
pub fn load_years(dir: impl AsRef<Path>, kind: EntityKind, years: Option<&[i32]>) -> Result<LoadedYears> {
    let dir = dir.as_ref();
    let available = discover_years(dir, kind)?;
    let mut loaded = LoadedYears::default();

    let wanted: Vec<i32> = match years {
        Some(requested) => {
            let mut requested = requested.to_vec();
            requested.sort_unstable();
            requested.dedup();
            requested
        }
        None => available.clone(),
    };

    for year in wanted {
        if !available.contains(&year) {
            loaded.missing.push(year);
            continue;
        }
        let path = curation_file_path(dir, year, kind);
        match CurationFile::load(&path, year, kind) {
            Ok(file) => loaded.files.push(file),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load curation file");
                loaded.failures.push((year, path, e));
            }
        }
    }

    Ok(loaded)
}
