//! Mention extraction.
//!
//! Reads every source document, collects raw mentions per year (people) and
//! per year and city (locations), merges them into the curation files, and
//! writes draft clusters next to them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cluster::Clusterer;
use crate::curation::{CurationFile, EntityKind, MergeSummary, PEOPLE_SCOPE, curation_file_path, write_json};
use crate::error::Result;
use crate::mention::{Occurrence, RawMention};
use crate::source::{SourceDocument, discover_sources};

/// File name of a year's draft cluster file.
pub fn clusters_file_name(year: i32, kind: EntityKind) -> String {
    format!("{}_{}_clusters.json", year, kind.label())
}

/// Raw mentions of one kind and year, grouped by scope then raw name.
type ScopedMentions = IndexMap<String, IndexMap<String, RawMention>>;

/// Mentions collected from a set of source documents.
#[derive(Debug, Default)]
pub struct MentionSet {
    people: BTreeMap<i32, ScopedMentions>,
    locations: BTreeMap<i32, ScopedMentions>,
    /// Documents read successfully.
    pub documents: usize,
    /// Documents that could not be read, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

impl MentionSet {
    /// Add every mention of one document.
    pub fn add_document(&mut self, document: &SourceDocument) {
        for (context_type, context) in document.contexts() {
            let date = document.context_date(context);
            let year = document.year();
            let city = document.context_city(context);

            for raw in &context.people {
                let occurrence = Occurrence {
                    date,
                    context: context_type,
                    context_name: context.name.clone(),
                    city: None,
                };
                record(&mut self.people, year, PEOPLE_SCOPE, raw, occurrence);
            }

            for raw in &context.locations {
                let occurrence = Occurrence {
                    date,
                    context: context_type,
                    context_name: context.name.clone(),
                    city: Some(city.to_string()),
                };
                record(&mut self.locations, year, city, raw, occurrence);
            }
        }
        self.documents += 1;
    }

    /// Years with at least one mention of `kind`.
    pub fn years(&self, kind: EntityKind) -> Vec<i32> {
        self.by_kind(kind).keys().copied().collect()
    }

    /// Mentions of one year, by scope.
    pub fn scopes(&self, kind: EntityKind, year: i32) -> IndexMap<String, Vec<RawMention>> {
        self.by_kind(kind)
            .get(&year)
            .map(|scopes| {
                scopes
                    .iter()
                    .map(|(scope, names)| (scope.clone(), names.values().cloned().collect()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Distinct raw names of `kind` across all years and scopes.
    pub fn mention_count(&self, kind: EntityKind) -> usize {
        self.by_kind(kind)
            .values()
            .flat_map(|scopes| scopes.values())
            .map(IndexMap::len)
            .sum()
    }

    fn by_kind(&self, kind: EntityKind) -> &BTreeMap<i32, ScopedMentions> {
        match kind {
            EntityKind::People => &self.people,
            EntityKind::Locations => &self.locations,
        }
    }
}

fn record(
    into: &mut BTreeMap<i32, ScopedMentions>,
    year: i32,
    scope: &str,
    raw: &str,
    occurrence: Occurrence,
) {
    let raw = raw.trim();
    if raw.is_empty() {
        return;
    }
    into.entry(year)
        .or_default()
        .entry(scope.to_string())
        .or_default()
        .entry(raw.to_string())
        .or_insert_with(|| RawMention::new(raw, year))
        .occurrences
        .push(occurrence);
}

/// Read every source document under `dir`.
///
/// Unreadable documents are logged and listed in [`MentionSet::failed`].
pub fn collect_mentions(dir: impl AsRef<Path>) -> Result<MentionSet> {
    let mut set = MentionSet::default();
    for path in discover_sources(dir)? {
        match SourceDocument::load(&path) {
            Ok(document) => {
                debug!(path = %path.display(), "read source document");
                set.add_document(&document);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable source document");
                set.failed.push((path, e.to_string()));
            }
        }
    }
    Ok(set)
}

/// What extraction did to one curation file.
#[derive(Debug, Clone, Serialize)]
pub struct YearExtraction {
    /// Year.
    pub year: i32,
    /// Entity kind.
    #[serde(rename = "type")]
    pub kind: EntityKind,
    /// Distinct raw names extracted.
    pub mentions: usize,
    /// New raw names appended.
    pub added: usize,
    /// Uncurated entries whose dates were refreshed.
    pub refreshed: usize,
    /// Curated entries left untouched.
    pub preserved: usize,
    /// Draft groups written.
    pub groups: usize,
}

/// Summary of an extraction run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionReport {
    /// Documents read.
    pub documents: usize,
    /// Documents skipped as unreadable.
    pub failed: Vec<PathBuf>,
    /// Per year and kind.
    pub years: Vec<YearExtraction>,
    /// Whether files were left untouched.
    pub dry_run: bool,
}

impl ExtractionReport {
    /// New raw names across all files.
    pub fn added(&self) -> usize {
        self.years.iter().map(|y| y.added).sum()
    }
}

/// Runs extraction from a source tree into a curation directory.
#[derive(Debug, Clone)]
pub struct Extractor {
    clusterer: Clusterer,
    dry_run: bool,
}

impl Extractor {
    /// Create an extractor with the default clusterer.
    pub fn new() -> Self {
        Self {
            clusterer: Clusterer::new(),
            dry_run: false,
        }
    }

    /// Report without writing any file.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Use a custom clusterer for the drafts.
    pub fn with_clusterer(mut self, clusterer: Clusterer) -> Self {
        self.clusterer = clusterer;
        self
    }

    /// Extract mentions from `source_dir` into `curation_dir`.
    pub fn run(&self, source_dir: impl AsRef<Path>, curation_dir: impl AsRef<Path>) -> Result<ExtractionReport> {
        let curation_dir = curation_dir.as_ref();
        let mentions = collect_mentions(source_dir)?;

        let mut report = ExtractionReport {
            documents: mentions.documents,
            failed: mentions.failed.iter().map(|(path, _)| path.clone()).collect(),
            years: Vec::new(),
            dry_run: self.dry_run,
        };

        for kind in [EntityKind::People, EntityKind::Locations] {
            for year in mentions.years(kind) {
                let scopes = mentions.scopes(kind, year);
                report.years.push(self.update_year(curation_dir, kind, year, &scopes)?);
            }
        }

        info!(
            documents = report.documents,
            failed = report.failed.len(),
            added = report.added(),
            dry_run = self.dry_run,
            "extraction finished"
        );
        Ok(report)
    }

    fn update_year(
        &self,
        curation_dir: &Path,
        kind: EntityKind,
        year: i32,
        scopes: &IndexMap<String, Vec<RawMention>>,
    ) -> Result<YearExtraction> {
        let path = curation_file_path(curation_dir, year, kind);
        let mut file = CurationFile::load_or_new(&path, year, kind)?;

        let mut summary = MergeSummary::default();
        for (scope, mentions) in scopes {
            let merged = file.merge_mentions(scope, mentions);
            summary.added += merged.added;
            summary.refreshed += merged.refreshed;
            summary.preserved += merged.preserved;
        }

        let clusters_path = curation_dir.join(clusters_file_name(year, kind));
        let groups = match kind {
            EntityKind::People => {
                let mentions = scopes.get(PEOPLE_SCOPE).map(Vec::as_slice).unwrap_or(&[]);
                let groups = self.clusterer.cluster(kind, mentions);
                let count = groups.len();
                if !self.dry_run {
                    write_json(&clusters_path, &groups)?;
                }
                count
            }
            EntityKind::Locations => {
                let groups = self.clusterer.cluster_by_city(scopes);
                let count = groups.values().map(Vec::len).sum();
                if !self.dry_run {
                    write_json(&clusters_path, &groups)?;
                }
                count
            }
        };

        if !self.dry_run {
            file.save(&path)?;
        }

        debug!(
            year,
            kind = %kind,
            added = summary.added,
            refreshed = summary.refreshed,
            preserved = summary.preserved,
            "updated curation file"
        );

        Ok(YearExtraction {
            year,
            kind,
            mentions: scopes.values().map(Vec::len).sum(),
            added: summary.added,
            refreshed: summary.refreshed,
            preserved: summary.preserved,
            groups,
        })
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}
