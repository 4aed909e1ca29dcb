//! One-transaction-per-file import of journal sources.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::ImportConfig;
use crate::consolidate::{Canonical, ConsolidatedEntity};
use crate::error::{AlmanacError, ImportErrorKind, Result};
use crate::normalize::normalize;
use crate::resolve::{EntityResolver, Resolution};
use crate::source::{Context, SourceDocument};
use crate::store::{Datastore, RecordId, RecordKind, StoreTransaction};

use super::ledger::{FailedImport, ImportLedger};
use super::stats::{AbortReason, ImportState, ImportStats};

/// Final state of one queued file.
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    /// Source file path as queued.
    pub path: PathBuf,
    /// Terminal state.
    pub state: ImportState,
    /// Whether the content matched the stored entry.
    pub unchanged: bool,
    /// Failure message, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of one batch.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    /// Final counters.
    pub stats: ImportStats,
    /// Why the batch stopped early, if it did.
    pub aborted: Option<AbortReason>,
    /// Whether nothing was committed.
    pub dry_run: bool,
    /// Where failures are recorded.
    pub ledger_path: PathBuf,
    /// Files in processing order; files after an abort are absent.
    pub outcomes: Vec<FileOutcome>,
    /// Files still queued when the batch stopped.
    pub remaining: usize,
    /// Last failure to write the ledger; the batch itself carries on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_error: Option<String>,
}

impl ImportReport {
    /// Whether the batch stopped on a threshold.
    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }
}

/// How a file import ended without error.
enum Imported {
    Written(BTreeMap<RecordKind, usize>),
    Unchanged,
}

/// A document whose mentions all resolved.
struct ResolvedDocument<'r> {
    document: SourceDocument,
    hash: String,
    /// People and locations per context, in `SourceDocument::contexts` order.
    contexts: Vec<(Vec<&'r ConsolidatedEntity>, Vec<&'r ConsolidatedEntity>)>,
}

/// Imports source documents into a datastore, one transaction per file.
///
/// Files are processed strictly in queue order; the abort thresholds are
/// evaluated after every file.
pub struct CurationImporter<'a> {
    store: &'a mut dyn Datastore,
    people: &'a EntityResolver,
    locations: &'a EntityResolver,
    config: ImportConfig,
    ledger: ImportLedger,
    source_root: Option<PathBuf>,
    dry_run: bool,
}

impl<'a> CurationImporter<'a> {
    /// Create an importer.
    pub fn new(
        store: &'a mut dyn Datastore,
        people: &'a EntityResolver,
        locations: &'a EntityResolver,
        ledger: ImportLedger,
    ) -> Self {
        Self {
            store,
            people,
            locations,
            config: ImportConfig::default(),
            ledger,
            source_root: None,
            dry_run: false,
        }
    }

    /// Set the abort thresholds.
    pub fn with_config(mut self, config: ImportConfig) -> Self {
        self.config = config;
        self
    }

    /// Key entries by their path relative to `root`.
    pub fn with_source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_root = Some(root.into());
        self
    }

    /// Resolve and validate without committing or touching the ledger.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// The ledger as updated by the last run.
    pub fn ledger(&self) -> &ImportLedger {
        &self.ledger
    }

    /// Retry exactly the files in the ledger.
    pub fn run_failed_only(&mut self) -> Result<ImportReport> {
        let files = self.ledger.paths();
        info!(files = files.len(), "retrying ledgered imports");
        self.run(&files)
    }

    /// Import `files` in order.
    ///
    /// A failed file is rolled back and ledgered; the ledger is saved after
    /// each failure so an interrupted batch keeps its record. Files that
    /// succeed are removed from the ledger.
    pub fn run(&mut self, files: &[PathBuf]) -> Result<ImportReport> {
        let mut stats = ImportStats::default();
        let mut outcomes = Vec::with_capacity(files.len());
        let mut aborted = None;
        let mut ledger_dirty = false;
        let mut ledger_error = None;

        for path in files {
            debug!(path = %path.display(), state = %ImportState::Pending, "queued");

            match self.import_file(path) {
                Ok(imported) => {
                    let unchanged = matches!(imported, Imported::Unchanged);
                    match imported {
                        Imported::Written(created) => stats.record_success(&created),
                        Imported::Unchanged => stats.record_skip(),
                    }
                    if !self.dry_run && self.ledger.remove(path) {
                        ledger_dirty = true;
                    }
                    debug!(path = %path.display(), state = %ImportState::Succeeded, unchanged, "file done");
                    outcomes.push(FileOutcome {
                        path: path.clone(),
                        state: ImportState::Succeeded,
                        unchanged,
                        error: None,
                    });
                }
                Err(e) => {
                    stats.record_failure();
                    warn!(path = %path.display(), error = %e, state = %ImportState::Failed, "import failed");
                    if !self.dry_run {
                        self.ledger.record(FailedImport::new(path.clone(), &e));
                        ledger_dirty = !self.save_ledger(&mut ledger_error);
                    }
                    outcomes.push(FileOutcome {
                        path: path.clone(),
                        state: ImportState::Failed,
                        unchanged: false,
                        error: Some(e.to_string()),
                    });
                }
            }

            if let Some(reason) = self.config.abort_reason(&stats) {
                warn!(reason = %reason, processed = stats.processed, "aborting import");
                aborted = Some(reason);
                break;
            }
        }

        if ledger_dirty {
            self.save_ledger(&mut ledger_error);
        }

        info!(
            processed = stats.processed,
            succeeded = stats.succeeded,
            failed = stats.failed,
            skipped = stats.skipped,
            created = stats.total_created(),
            dry_run = self.dry_run,
            "import finished"
        );

        Ok(ImportReport {
            remaining: files.len() - stats.processed,
            stats,
            aborted,
            dry_run: self.dry_run,
            ledger_path: self.ledger.path().to_path_buf(),
            outcomes,
            ledger_error,
        })
    }

    /// Write the ledger, keeping the error instead of failing the batch.
    fn save_ledger(&self, ledger_error: &mut Option<String>) -> bool {
        match self.ledger.save() {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %self.ledger.path().display(), error = %e, "could not save import ledger");
                *ledger_error = Some(e.to_string());
                false
            }
        }
    }

    fn import_file(&mut self, path: &Path) -> Result<Imported> {
        debug!(path = %path.display(), state = %ImportState::Resolving, "transition");
        let resolved = self.resolve(path)?;

        debug!(path = %path.display(), state = %ImportState::Validating, "transition");
        resolved.document.check().map_err(|e| {
            AlmanacError::import(ImportErrorKind::InvalidDocument, e.to_string())
        })?;

        let entry_key = self.entry_key(path);
        let mut tx = self.store.transaction()?;
        let existing = tx.get(RecordKind::Entry, &entry_key)?;
        if let Some(entry) = &existing {
            if entry.payload.get("hash").and_then(Value::as_str) == Some(resolved.hash.as_str()) {
                debug!(path = %path.display(), "unchanged since last import");
                return Ok(Imported::Unchanged);
            }
        }

        debug!(path = %path.display(), state = %ImportState::Committing, "transition");
        let mut writer = Writer {
            tx: tx.as_mut(),
            created: BTreeMap::new(),
        };
        writer.write_document(&entry_key, existing.map(|e| e.id), &resolved)?;
        let created = writer.created;

        if self.dry_run {
            // Dropping the transaction rolls it back.
            drop(tx);
        } else {
            tx.commit()?;
        }
        Ok(Imported::Written(created))
    }

    fn resolve(&self, path: &Path) -> Result<ResolvedDocument<'a>> {
        let bytes = fs::read(path).map_err(|e| {
            AlmanacError::import(ImportErrorKind::SourceParse, format!("{}: {}", path.display(), e))
        })?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let hash = format!("sha256:{:x}", hasher.finalize());

        let document: SourceDocument = serde_json::from_slice(&bytes).map_err(|e| {
            AlmanacError::import(ImportErrorKind::SourceParse, format!("{}: {}", path.display(), e))
        })?;

        let mut unresolved = Vec::new();
        let mut contexts = Vec::new();
        for (_, context) in document.contexts() {
            let city = document.context_city(context);
            let people = resolve_all(self.people, &context.people, None, &mut unresolved);
            let locations = resolve_all(self.locations, &context.locations, Some(city), &mut unresolved);
            contexts.push((people, locations));
        }

        if !unresolved.is_empty() {
            return Err(AlmanacError::import(
                ImportErrorKind::UnresolvedMention,
                format!("{} unresolved: {}", unresolved.len(), unresolved.join("; ")),
            ));
        }

        Ok(ResolvedDocument {
            document,
            hash,
            contexts,
        })
    }

    fn entry_key(&self, path: &Path) -> String {
        let relative = self
            .source_root
            .as_deref()
            .and_then(|root| path.strip_prefix(root).ok())
            .unwrap_or(path);
        relative.to_string_lossy().replace('\\', "/")
    }
}

fn resolve_all<'r>(
    resolver: &'r EntityResolver,
    mentions: &[String],
    city: Option<&str>,
    unresolved: &mut Vec<String>,
) -> Vec<&'r ConsolidatedEntity> {
    let mut entities = Vec::new();
    for mention in mentions {
        match resolver.resolve(mention, city) {
            Resolution::Resolved { entity, .. } => {
                if !entities.iter().any(|e: &&ConsolidatedEntity| e.canonical_key == entity.canonical_key) {
                    entities.push(entity);
                }
            }
            Resolution::Unresolved { mention, reason } => {
                unresolved.push(format!("{} '{}' ({})", resolver.kind(), mention, reason));
            }
        }
    }
    entities
}

/// Records keyed under an entry, by the relation linking them to it.
const OWNED_RELATIONS: [(RecordKind, &str); 4] = [
    (RecordKind::Scene, "scene"),
    (RecordKind::Thread, "thread"),
    (RecordKind::Reference, "references"),
    (RecordKind::Poem, "poem"),
];

/// Writes one document's records inside a transaction and counts creations.
struct Writer<'t> {
    tx: &'t mut dyn StoreTransaction,
    created: BTreeMap<RecordKind, usize>,
}

impl Writer<'_> {
    fn get_or_create(&mut self, kind: RecordKind, key: &str, payload: Value) -> Result<RecordId> {
        let (id, created) = self.tx.get_or_create(kind, key, &payload)?;
        if created {
            *self.created.entry(kind).or_insert(0) += 1;
        }
        Ok(id)
    }

    /// Create or overwrite a record owned by the entry.
    fn upsert(&mut self, kind: RecordKind, key: &str, payload: Value) -> Result<RecordId> {
        match self.tx.get(kind, key)? {
            Some(record) => {
                self.tx.update(kind, record.id, &payload)?;
                Ok(record.id)
            }
            None => self.get_or_create(kind, key, payload),
        }
    }

    fn named(&mut self, kind: RecordKind, name: &str, from: RecordId, relation: &str) -> Result<()> {
        let key = normalize(name);
        if key.is_empty() {
            return Ok(());
        }
        let id = self.get_or_create(kind, &key, json!({ "name": name }))?;
        self.tx.link(from, id, relation)
    }

    fn city(&mut self, name: &str) -> Result<RecordId> {
        self.get_or_create(RecordKind::City, &normalize(name), json!({ "name": name }))
    }

    fn write_document(&mut self, entry_key: &str, existing: Option<RecordId>, resolved: &ResolvedDocument<'_>) -> Result<()> {
        let document = &resolved.document;
        let payload = json!({
            "path": entry_key,
            "date": document.date,
            "city": document.city,
            "hash": resolved.hash,
        });
        let (entry, previous) = match existing {
            Some(id) => {
                self.tx.update(RecordKind::Entry, id, &payload)?;
                (id, self.unlink_entry(id)?)
            }
            None => (self.get_or_create(RecordKind::Entry, entry_key, payload)?, Vec::new()),
        };
        let mut owned = BTreeSet::new();

        let date = document.date.to_string();
        let date_id = self.get_or_create(RecordKind::Date, &date, json!({ "date": date }))?;
        self.tx.link(entry, date_id, "on")?;

        if let Some(city) = document.city.as_deref().filter(|c| !c.trim().is_empty()) {
            let city_id = self.city(city)?;
            self.tx.link(entry, city_id, "in_city")?;
        }

        for tag in &document.tags {
            self.named(RecordKind::Tag, tag, entry, "tagged")?;
        }
        for theme in &document.themes {
            self.named(RecordKind::Theme, theme, entry, "theme")?;
        }
        for motif in &document.motifs {
            self.named(RecordKind::Motif, motif, entry, "motif")?;
        }
        for event in &document.events {
            self.named(RecordKind::Event, event, entry, "event")?;
        }

        for (i, reference) in document.references.iter().enumerate() {
            let id = self.upsert(
                RecordKind::Reference,
                &format!("{}#reference-{}", entry_key, i + 1),
                json!({ "content": reference.content, "source": reference.source }),
            )?;
            self.tx.link(entry, id, "references")?;
            owned.insert(id);
        }

        for poem in &document.poems {
            let id = self.upsert(
                RecordKind::Poem,
                &format!("{}#poem-{}", entry_key, normalize(&poem.title)),
                json!({ "title": poem.title, "content": poem.content }),
            )?;
            self.tx.link(entry, id, "poem")?;
            owned.insert(id);
        }

        for ((context_type, context), (people, locations)) in document.contexts().zip(&resolved.contexts) {
            let kind = match context_type {
                crate::mention::ContextType::Scene => RecordKind::Scene,
                crate::mention::ContextType::Thread => RecordKind::Thread,
            };
            let id = self.write_context(kind, entry_key, document, context)?;
            self.tx.link(entry, id, context_type.to_string().as_str())?;
            owned.insert(id);

            for person in people {
                let person_id = self.person(person)?;
                self.tx.link(id, person_id, "mentions")?;
            }
            for location in locations {
                let location_id = self.location(location)?;
                self.tx.link(id, location_id, "at")?;
            }
        }

        for (kind, id) in previous {
            if !owned.contains(&id) {
                self.tx.delete(kind, id)?;
            }
        }
        Ok(())
    }

    /// Drop every link a changed entry and its owned records carry, and
    /// return the owned records so the ones no longer written can be deleted.
    fn unlink_entry(&mut self, entry: RecordId) -> Result<Vec<(RecordKind, RecordId)>> {
        let mut previous = Vec::new();
        for (kind, relation) in OWNED_RELATIONS {
            for id in self.tx.linked(entry, relation)? {
                self.tx.clear_links(id)?;
                previous.push((kind, id));
            }
        }
        self.tx.clear_links(entry)?;
        Ok(previous)
    }

    fn write_context(
        &mut self,
        kind: RecordKind,
        entry_key: &str,
        document: &SourceDocument,
        context: &Context,
    ) -> Result<RecordId> {
        self.upsert(
            kind,
            &format!("{}#{}-{}", entry_key, kind, normalize(&context.name)),
            json!({
                "name": context.name,
                "date": document.context_date(context),
                "city": document.context_city(context),
            }),
        )
    }

    fn person(&mut self, entity: &ConsolidatedEntity) -> Result<RecordId> {
        self.get_or_create(RecordKind::Person, &entity.canonical_key, json!(entity.canonical))
    }

    fn location(&mut self, entity: &ConsolidatedEntity) -> Result<RecordId> {
        let name = match &entity.canonical {
            Canonical::Location(name) => name.clone(),
            other => other.display_name(),
        };
        let city = entity.city.clone().unwrap_or_default();
        let id = self.get_or_create(
            RecordKind::Location,
            &entity.canonical_key,
            json!({ "name": name, "city": city }),
        )?;
        if !city.is_empty() && !city.starts_with('_') {
            let city_id = self.city(&city)?;
            self.tx.link(id, city_id, "in_city")?;
        }
        Ok(id)
    }
}
