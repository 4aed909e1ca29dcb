//! Integration tests for validation and consolidation over curation directories.

use std::fs;
use std::path::Path;

use serde_json::{Value, json};
use tempfile::TempDir;

use almanac::consolidate::{SKIPPED_SECTION, SkipReason, consolidated_file_path, load_entities};
use almanac::curation::curation_file_path;
use almanac::validate::IssueKind;
use almanac::{AlmanacError, Consolidator, EntityKind, EntityResolver, Severity, ValidationEngine};

/// Write a curation file as a curator would.
fn write_curation(dir: &Path, year: i32, kind: EntityKind, content: Value) {
    let path = curation_file_path(dir, year, kind);
    fs::write(&path, serde_json::to_string_pretty(&content).unwrap()).unwrap();
}

fn read_output(dir: &Path, kind: EntityKind) -> Value {
    let content = fs::read_to_string(consolidated_file_path(dir, kind)).unwrap();
    serde_json::from_str(&content).unwrap()
}

/// Two curated years of people with aliases, skips and the author.
fn curated_people(dir: &Path) {
    write_curation(
        dir,
        2023,
        EntityKind::People,
        json!({
            "Alice": { "canonical": { "name": "Alice", "lastname": "Smith" }, "dates": ["2023-11-02"] },
            "Majo": { "canonical": { "name": "María-José", "lastname": "Castro", "alias": "Majo" }, "dates": ["2023-06-01"] },
            "me": { "self": true, "dates": ["2023-01-01"] }
        }),
    );
    write_curation(
        dir,
        2024,
        EntityKind::People,
        json!({
            "Alice": { "canonical": { "name": "Alice", "lastname": "Smith" }, "dates": ["2024-01-01"] },
            "Alice (Work)": { "canonical": { "name": "Alice", "lastname": "Smith" }, "dates": ["2024-02-01"] },
            "Al": { "same_as": "Alice", "dates": ["2024-03-05"] },
            "@Majo": { "canonical": { "name": "María-José", "lastname": "Castro", "alias": ["Majo", "MJ"] }, "dates": ["2024-04-01"] },
            "the barista": { "skip": true, "dates": ["2024-02-02"] },
            "Zed": { "dates": ["2024-05-05"] },
            "me": { "self": true, "dates": ["2024-01-01"] }
        }),
    );
}

// =============================================================================
// Consolidation
// =============================================================================

#[test]
fn test_alice_merges_across_variants_and_years() {
    let dir = TempDir::new().unwrap();
    curated_people(dir.path());
    // "Zed" has no disposition; force past the validation error it causes.
    let run = Consolidator::new(EntityKind::People)
        .with_force(true)
        .run(dir.path(), dir.path(), None)
        .unwrap();
    assert!(run.forced);

    let result = run.result.unwrap();
    let alice = result.entity("alice|smith").unwrap();
    // Years ascending, then file order (keys written sorted).
    assert_eq!(alice.raw_names, vec!["Alice", "Al", "Alice (Work)"]);
    assert_eq!(alice.dates["2023"], vec!["2023-11-02"]);
    assert_eq!(alice.dates["2024"], vec!["2024-01-01", "2024-02-01", "2024-03-05"]);

    let majo = result.entity("maria jose|castro").unwrap();
    assert_eq!(majo.canonical.as_person().unwrap().alias, vec!["Majo", "MJ"]);

    assert_eq!(result.skipped_with(SkipReason::Skip).count(), 1);
    assert_eq!(result.skipped_with(SkipReason::NoCanonical).count(), 1);
    assert_eq!(result.self_refs.raw_names, vec!["me"]);

    let output = read_output(dir.path(), EntityKind::People);
    assert_eq!(output["Alice Smith"]["canonical_key"], "alice|smith");
    assert_eq!(output[SKIPPED_SECTION]["no_canonical"][0]["raw_name"], "Zed");
}

#[test]
fn test_every_entry_is_accounted_for() {
    let dir = TempDir::new().unwrap();
    curated_people(dir.path());
    let run = Consolidator::new(EntityKind::People)
        .with_force(true)
        .run(dir.path(), dir.path(), None)
        .unwrap();

    let result = run.result.unwrap();
    assert_eq!(result.total_entries, 10);
    assert!(result.is_partition_total());
    assert_eq!(
        result.mapped_entries() + result.skipped.len() + result.self_refs.entry_count,
        result.total_entries
    );
}

#[test]
fn test_rerun_is_byte_identical() {
    let dir = TempDir::new().unwrap();
    curated_people(dir.path());
    let consolidator = Consolidator::new(EntityKind::People).with_force(true);
    let output = consolidated_file_path(dir.path(), EntityKind::People);

    consolidator.run(dir.path(), dir.path(), None).unwrap();
    let first = fs::read(&output).unwrap();
    consolidator.run(dir.path(), dir.path(), None).unwrap();
    let second = fs::read(&output).unwrap();

    assert_eq!(first, second);
    assert!(first.ends_with(b"\n"));
}

#[test]
fn test_year_subset_only_reads_requested_years() {
    let dir = TempDir::new().unwrap();
    curated_people(dir.path());
    let run = Consolidator::new(EntityKind::People)
        .run(dir.path(), dir.path(), Some(&[2023]))
        .unwrap();

    let result = run.result.unwrap();
    assert_eq!(result.years, vec![2023]);
    assert_eq!(result.entity("alice|smith").unwrap().raw_names, vec!["Alice"]);
}

#[test]
fn test_locations_consolidate_per_city_and_resolve() {
    let dir = TempDir::new().unwrap();
    write_curation(
        dir.path(),
        2024,
        EntityKind::Locations,
        json!({
            "Montréal": {
                "#Parc_Jarry": { "canonical": "Parc Jarry", "dates": ["2024-03-14"] },
                "Jarry": { "same_as": "#Parc_Jarry" }
            },
            "_unassigned": {
                "home": { "canonical": null }
            }
        }),
    );

    let run = Consolidator::new(EntityKind::Locations)
        .run(dir.path(), dir.path(), None)
        .unwrap();
    assert!(run.report.is_clean());

    let output = read_output(dir.path(), EntityKind::Locations);
    let cities: Vec<&String> = output.as_object().unwrap().keys().collect();
    assert_eq!(cities, vec!["Montréal", "_unassigned", SKIPPED_SECTION]);

    let path = consolidated_file_path(dir.path(), EntityKind::Locations);
    let entities = load_entities(&path, EntityKind::Locations).unwrap();
    assert_eq!(entities.len(), 2);

    let resolver = EntityResolver::from_file(&path, EntityKind::Locations).unwrap();
    assert_eq!(
        resolver.resolve("#Jarry", Some("Montréal")).canonical_key(),
        Some("montreal|parc jarry")
    );
}

// =============================================================================
// Validation gating
// =============================================================================

#[test]
fn test_circular_same_as_reported_for_both_keys() {
    let dir = TempDir::new().unwrap();
    write_curation(
        dir.path(),
        2024,
        EntityKind::People,
        json!({ "Bob": { "same_as": "Robert" }, "Robert": { "same_as": "Bob" } }),
    );

    let report = ValidationEngine::new()
        .validate_dir(dir.path(), EntityKind::People, None)
        .unwrap();
    let circular: Vec<&str> = report
        .issues
        .iter()
        .filter(|i| i.kind == IssueKind::CircularSameAs)
        .map(|i| i.raw_name.as_str())
        .collect();
    assert_eq!(circular, vec!["Bob", "Robert"]);
    assert!(report.has_errors());
}

#[test]
fn test_validation_errors_block_consolidation() {
    let dir = TempDir::new().unwrap();
    write_curation(
        dir.path(),
        2024,
        EntityKind::People,
        json!({ "Bob": { "same_as": "Robert" }, "Robert": { "same_as": "Bob" } }),
    );

    let result = Consolidator::new(EntityKind::People).run(dir.path(), dir.path(), None);
    assert!(matches!(result, Err(AlmanacError::Validation(_))));
    assert!(!consolidated_file_path(dir.path(), EntityKind::People).exists());
}

#[test]
fn test_forced_run_records_unresolved_aliases() {
    let dir = TempDir::new().unwrap();
    write_curation(
        dir.path(),
        2024,
        EntityKind::People,
        json!({
            "Bob": { "same_as": "Robert" },
            "Robert": { "same_as": "Bob" },
            "Carol": { "canonical": { "name": "Carol" } }
        }),
    );

    let run = Consolidator::new(EntityKind::People)
        .with_force(true)
        .run(dir.path(), dir.path(), None)
        .unwrap();
    assert!(run.forced);

    let result = run.result.unwrap();
    assert_eq!(result.entities.len(), 1);
    assert_eq!(result.skipped_with(SkipReason::UnresolvedSameAs).count(), 2);
}

#[test]
fn test_validate_only_writes_nothing() {
    let dir = TempDir::new().unwrap();
    curated_people(dir.path());

    let run = Consolidator::new(EntityKind::People)
        .with_validate_only(true)
        .run(dir.path(), dir.path(), None)
        .unwrap();
    assert!(run.result.is_none());
    assert_eq!(run.report.count(Severity::Error), 1);
    assert!(!consolidated_file_path(dir.path(), EntityKind::People).exists());
}

#[test]
fn test_missing_requested_year_is_structural_error() {
    let dir = TempDir::new().unwrap();
    curated_people(dir.path());

    let report = ValidationEngine::new()
        .validate_dir(dir.path(), EntityKind::People, Some(&[2023, 2019]))
        .unwrap();
    let structure: Vec<&i32> = report
        .issues
        .iter()
        .filter(|i| i.kind == IssueKind::Structure)
        .flat_map(|i| &i.years)
        .collect();
    assert_eq!(structure, vec![&2019]);
}
