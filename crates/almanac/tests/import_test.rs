//! Integration tests for batch import: transactions, thresholds and the ledger.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use tempfile::TempDir;

use almanac::consolidate::consolidate;
use almanac::import::{AbortReason, ImportState};
use almanac::store::{RecordKind, SqliteStore};
use almanac::{
    CurationEntry, CurationFile, CurationImporter, EntityKind, EntityResolver, ImportErrorKind, ImportLedger,
    ImportReport,
};

struct Fixture {
    dir: TempDir,
    people: EntityResolver,
    locations: EntityResolver,
}

impl Fixture {
    fn new() -> Self {
        let people = CurationFile::new(2024, EntityKind::People)
            .with_entry("", "Alice", CurationEntry::canonical(json!({"name": "Alice", "lastname": "Smith"})))
            .with_entry("", "@Majo", CurationEntry::canonical(json!({"name": "María-José", "alias": "Majo"})));
        let locations = CurationFile::new(2024, EntityKind::Locations)
            .with_entry("Montréal", "#Parc_Jarry", CurationEntry::canonical(json!("Parc Jarry")));

        Self {
            dir: TempDir::new().unwrap(),
            people: EntityResolver::new(EntityKind::People, consolidate(EntityKind::People, &[people]).entities),
            locations: EntityResolver::new(
                EntityKind::Locations,
                consolidate(EntityKind::Locations, &[locations]).entities,
            ),
        }
    }

    fn sources(&self) -> PathBuf {
        self.dir.path().join("journal")
    }

    fn ledger_path(&self) -> PathBuf {
        self.dir.path().join("failed_imports.json")
    }

    fn open_store(&self) -> SqliteStore {
        SqliteStore::open(self.dir.path().join("almanac.db")).unwrap()
    }

    /// One source file per character: `o` imports cleanly, `F` has an unresolvable mention.
    fn write_sources(&self, outcomes: &str) -> Vec<PathBuf> {
        fs::create_dir_all(self.sources()).unwrap();
        outcomes
            .chars()
            .enumerate()
            .map(|(i, c)| {
                let path = self.sources().join(format!("entry-{:03}.json", i + 1));
                write_document(&path, i, c == 'F');
                path
            })
            .collect()
    }

    fn run(&self, store: &mut SqliteStore, files: &[PathBuf], dry_run: bool) -> ImportReport {
        let ledger = ImportLedger::load(self.ledger_path()).unwrap();
        let mut importer = CurationImporter::new(store, &self.people, &self.locations, ledger)
            .with_source_root(self.sources())
            .with_dry_run(dry_run);
        importer.run(files).unwrap()
    }
}

fn write_document(path: &Path, i: usize, broken: bool) {
    let person = if broken { "@Zed" } else { "Alice" };
    let document = json!({
        "date": format!("2024-{:02}-{:02}", 1 + i / 28, 1 + i % 28),
        "city": "Montréal",
        "tags": ["walk"],
        "scenes": [
            { "name": "Morning", "people": [person, "@Majo"], "locations": ["#Parc_Jarry", "Parc Jarry"] }
        ],
        "threads": [
            { "name": "Moving out", "people": ["Alice Smith"] }
        ]
    });
    fs::write(path, serde_json::to_string_pretty(&document).unwrap()).unwrap();
}

// =============================================================================
// Abort thresholds
// =============================================================================

#[test]
fn test_five_consecutive_failures_halt_the_batch() {
    let fixture = Fixture::new();
    // Files 6 through 10 fail.
    let files = fixture.write_sources("oooooFFFFFoooooooooo");
    let mut store = fixture.open_store();

    let report = fixture.run(&mut store, &files, false);
    assert_eq!(report.aborted, Some(AbortReason::ConsecutiveFailures { count: 5 }));
    assert_eq!(report.stats.processed, 10);
    assert_eq!(report.stats.succeeded, 5);
    assert_eq!(report.remaining, 10);
    assert_eq!(report.outcomes.len(), 10);

    // Files 11 and later were never touched.
    assert_eq!(store.count(RecordKind::Entry).unwrap(), 5);
    assert!(store.record(RecordKind::Entry, "entry-011.json").unwrap().is_none());

    let ledger = ImportLedger::load(fixture.ledger_path()).unwrap();
    assert_eq!(ledger.len(), 5);
    assert!(ledger.entries().iter().all(|e| e.error_type == ImportErrorKind::UnresolvedMention));
}

#[test]
fn test_failure_rate_halts_after_sample_floor() {
    let fixture = Fixture::new();
    // Every 15th file fails: 1 of 20 is exactly 5%, 2 of 30 exceeds it.
    let outcomes: String = (1..=100).map(|i| if i % 15 == 0 { 'F' } else { 'o' }).collect();
    let files = fixture.write_sources(&outcomes);
    let mut store = fixture.open_store();

    let report = fixture.run(&mut store, &files, false);
    assert_eq!(report.aborted, Some(AbortReason::FailureRate { failed: 2, processed: 30 }));
    assert_eq!(report.stats.processed, 30);
    assert_eq!(report.remaining, 70);
    assert_eq!(store.count(RecordKind::Entry).unwrap(), 28);
}

#[test]
fn test_success_resets_consecutive_counter() {
    let fixture = Fixture::new();
    let files = fixture.write_sources("FFFFoFFFF");
    let mut store = fixture.open_store();

    let report = fixture.run(&mut store, &files, false);
    assert!(!report.is_aborted());
    assert_eq!(report.stats.processed, 9);
    assert_eq!(report.stats.failed, 8);
    assert_eq!(report.stats.consecutive_failures, 4);
}

// =============================================================================
// Transactions and records
// =============================================================================

#[test]
fn test_failed_file_leaves_no_partial_records() {
    let fixture = Fixture::new();
    let files = fixture.write_sources("F");
    let mut store = fixture.open_store();

    let report = fixture.run(&mut store, &files, false);
    assert_eq!(report.outcomes[0].state, ImportState::Failed);
    for kind in RecordKind::ALL {
        assert_eq!(store.count(kind).unwrap(), 0, "{} records left behind", kind);
    }
}

#[test]
fn test_records_are_created_once_and_linked() {
    let fixture = Fixture::new();
    let files = fixture.write_sources("oo");
    let mut store = fixture.open_store();

    let report = fixture.run(&mut store, &files, false);
    assert_eq!(report.stats.succeeded, 2);
    assert_eq!(report.stats.created[&RecordKind::Entry], 2);
    assert_eq!(report.stats.created[&RecordKind::Person], 2);
    assert_eq!(report.stats.created[&RecordKind::Location], 1);

    assert_eq!(store.count(RecordKind::Person).unwrap(), 2);
    assert_eq!(store.count(RecordKind::Location).unwrap(), 1);
    assert_eq!(store.count(RecordKind::City).unwrap(), 1);
    assert_eq!(store.count(RecordKind::Tag).unwrap(), 1);
    assert_eq!(store.count(RecordKind::Scene).unwrap(), 2);
    assert_eq!(store.count(RecordKind::Thread).unwrap(), 2);

    let alice = store.record(RecordKind::Person, "alice|smith").unwrap().unwrap();
    assert_eq!(alice.payload["lastname"], "Smith");
    let entry = store.record(RecordKind::Entry, "entry-001.json").unwrap().unwrap();
    assert!(entry.payload["hash"].as_str().unwrap().starts_with("sha256:"));

    // Both scenes mention Alice and Majo; both threads mention Alice.
    assert_eq!(store.link_count("mentions").unwrap(), 6);
    // "#Parc_Jarry" and "Parc Jarry" resolve to the same location.
    assert_eq!(store.link_count("at").unwrap(), 2);
}

#[test]
fn test_unchanged_files_are_skipped_and_changed_files_update() {
    let fixture = Fixture::new();
    let files = fixture.write_sources("ooo");
    let mut store = fixture.open_store();

    fixture.run(&mut store, &files, false);
    let again = fixture.run(&mut store, &files, false);
    assert_eq!(again.stats.skipped, 3);
    assert_eq!(again.stats.total_created(), 0);
    assert!(again.outcomes.iter().all(|o| o.unchanged));

    // Each file: the scene mentions Alice and Majo, the thread mentions Alice.
    assert_eq!(store.link_count("mentions").unwrap(), 9);
    assert_eq!(store.link_count("at").unwrap(), 3);

    // Rewrite the second entry down to one scene mentioning only Majo.
    let before = store.record(RecordKind::Entry, "entry-002.json").unwrap().unwrap();
    let rewritten = json!({
        "date": "2024-02-12",
        "city": "Montréal",
        "scenes": [{ "name": "Morning", "people": ["@Majo"] }]
    });
    fs::write(&files[1], serde_json::to_string_pretty(&rewritten).unwrap()).unwrap();
    let changed = fixture.run(&mut store, &files, false);
    assert_eq!(changed.stats.succeeded, 1);
    assert_eq!(changed.stats.skipped, 2);

    let after = store.record(RecordKind::Entry, "entry-002.json").unwrap().unwrap();
    assert_eq!(after.id, before.id);
    assert_ne!(after.payload["hash"], before.payload["hash"]);
    assert_eq!(store.count(RecordKind::Entry).unwrap(), 3);

    // The store mirrors the rewritten document.
    assert_eq!(store.link_count("mentions").unwrap(), 7);
    assert_eq!(store.link_count("at").unwrap(), 2);
    assert_eq!(store.link_count("tagged").unwrap(), 2);
    assert_eq!(store.link_count("thread").unwrap(), 2);
    assert_eq!(store.count(RecordKind::Thread).unwrap(), 2);
    assert_eq!(store.count(RecordKind::Scene).unwrap(), 3);
    assert!(store.record(RecordKind::Thread, "entry-002.json#thread-moving out").unwrap().is_none());
}

#[test]
fn test_location_from_another_city_is_unresolved() {
    let fixture = Fixture::new();
    fs::create_dir_all(fixture.sources()).unwrap();
    let path = fixture.sources().join("berlin.json");
    let document = json!({
        "date": "2024-06-01",
        "city": "Berlin",
        "scenes": [{ "name": "Walk", "people": ["Alice"], "locations": ["#Parc_Jarry"] }]
    });
    fs::write(&path, serde_json::to_string_pretty(&document).unwrap()).unwrap();
    let mut store = fixture.open_store();

    let report = fixture.run(&mut store, &[path.clone()], false);
    assert_eq!(report.stats.failed, 1);
    assert!(report.outcomes[0].error.as_deref().unwrap().contains("Parc_Jarry"));
    assert_eq!(store.count(RecordKind::Location).unwrap(), 0);

    let ledger = ImportLedger::load(fixture.ledger_path()).unwrap();
    assert_eq!(ledger.entries()[0].error_type, ImportErrorKind::UnresolvedMention);
}

#[test]
fn test_dry_run_commits_nothing() {
    let fixture = Fixture::new();
    let files = fixture.write_sources("ooF");
    let mut store = fixture.open_store();

    let report = fixture.run(&mut store, &files, true);
    assert!(report.dry_run);
    assert_eq!(report.stats.succeeded, 2);
    assert_eq!(report.stats.failed, 1);
    assert_eq!(store.count(RecordKind::Entry).unwrap(), 0);
    assert!(!fixture.ledger_path().exists());
}

// =============================================================================
// Ledger
// =============================================================================

#[test]
fn test_failed_only_retries_exactly_the_ledger() {
    let fixture = Fixture::new();
    let files = fixture.write_sources("oFoFoF");
    let mut store = fixture.open_store();

    fixture.run(&mut store, &files, false);
    let ledger = ImportLedger::load(fixture.ledger_path()).unwrap();
    assert_eq!(ledger.paths(), vec![files[1].clone(), files[3].clone(), files[5].clone()]);

    // Fix two of the three.
    write_document(&files[1], 1, false);
    write_document(&files[5], 5, false);

    let mut importer = CurationImporter::new(&mut store, &fixture.people, &fixture.locations, ledger)
        .with_source_root(fixture.sources());
    let report = importer.run_failed_only().unwrap();
    assert_eq!(report.stats.processed, 3);
    assert_eq!(report.stats.succeeded, 2);
    assert_eq!(report.stats.failed, 1);
    assert_eq!(importer.ledger().paths(), vec![files[3].clone()]);
    drop(importer);

    let reloaded = ImportLedger::load(fixture.ledger_path()).unwrap();
    assert_eq!(reloaded.paths(), vec![files[3].clone()]);
    assert_eq!(store.count(RecordKind::Entry).unwrap(), 5);
}

#[test]
fn test_unparseable_file_is_ledgered_as_source_parse() {
    let fixture = Fixture::new();
    fs::create_dir_all(fixture.sources()).unwrap();
    let path = fixture.sources().join("broken.json");
    fs::write(&path, "{ \"date\": ").unwrap();
    let mut store = fixture.open_store();

    let report = fixture.run(&mut store, &[path.clone()], false);
    assert_eq!(report.stats.failed, 1);

    let ledger = ImportLedger::load(fixture.ledger_path()).unwrap();
    assert_eq!(ledger.entries()[0].file_path, path);
    assert_eq!(ledger.entries()[0].error_type, ImportErrorKind::SourceParse);
}

#[test]
fn test_unwritable_ledger_keeps_the_report() {
    let fixture = Fixture::new();
    let files = fixture.write_sources("oFo");
    let mut store = fixture.open_store();

    // The ledger's parent is a regular file, so every save fails.
    let blocker = fixture.dir.path().join("blocker");
    fs::write(&blocker, "").unwrap();
    let ledger = ImportLedger::empty(blocker.join("failed_imports.json"));
    let mut importer = CurationImporter::new(&mut store, &fixture.people, &fixture.locations, ledger)
        .with_source_root(fixture.sources());
    let report = importer.run(&files).unwrap();
    assert_eq!(report.stats.processed, 3);
    assert_eq!(report.stats.succeeded, 2);
    assert_eq!(report.stats.failed, 1);
    assert!(report.ledger_error.is_some());
    assert_eq!(importer.ledger().len(), 1);
    drop(importer);

    assert_eq!(store.count(RecordKind::Entry).unwrap(), 2);
}
