//! Checks spanning every year of one entity kind.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::curation::{CurationFile, Disposition, EntityKind, PersonCanonical};
use crate::mention::base_name;
use crate::normalize::normalize;

use super::issue::{IssueKind, Severity, ValidationIssue};

/// Trait for checks that need all years at once.
pub trait CrossYearCheck {
    /// Run the check over the loaded files of one kind.
    fn check(&self, files: &[CurationFile]) -> Vec<ValidationIssue>;
}

/// A canonical person entry as seen by the disambiguation check.
struct Sighting {
    year: i32,
    raw_name: String,
    canonical: PersonCanonical,
}

/// Flags first names that are treated inconsistently across years.
///
/// Canonical entries are grouped by base name (raw name minus any
/// parenthetical). For a base name seen in two or more years:
///
/// - undisambiguated entries sharing a canonical key in two or more years
///   are flagged as ambiguous, since consolidation will merge them;
/// - years that disambiguate the name next to years that do not raise a
///   warning.
pub struct DisambiguationCheck;

impl DisambiguationCheck {
    fn sightings(files: &[CurationFile]) -> BTreeMap<String, Vec<Sighting>> {
        let mut by_base: BTreeMap<String, Vec<Sighting>> = BTreeMap::new();

        for file in files.iter().filter(|f| f.kind == EntityKind::People) {
            for (_, raw_name, entry) in file.entries() {
                if entry.disposition(file.kind) != Ok(Disposition::Canonical) {
                    continue;
                }
                let Some(payload) = entry.canonical.as_ref() else {
                    continue;
                };
                // Invalid payloads are reported by the per-file pass.
                let Ok(canonical) = PersonCanonical::from_payload(raw_name, payload) else {
                    continue;
                };

                let base = normalize(&base_name(raw_name));
                if base.is_empty() {
                    continue;
                }
                by_base.entry(base).or_default().push(Sighting {
                    year: file.year,
                    raw_name: raw_name.to_string(),
                    canonical,
                });
            }
        }

        by_base
    }
}

impl CrossYearCheck for DisambiguationCheck {
    fn check(&self, files: &[CurationFile]) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for (base, sightings) in Self::sightings(files) {
            let years: BTreeSet<i32> = sightings.iter().map(|s| s.year).collect();
            if years.len() < 2 {
                continue;
            }

            let display = base_name(&sightings[0].raw_name);

            let mut undisambiguated: BTreeMap<String, BTreeSet<i32>> = BTreeMap::new();
            let mut disambiguated_years = BTreeSet::new();
            let mut plain_years = BTreeSet::new();
            for sighting in &sightings {
                if sighting.canonical.is_disambiguated() {
                    disambiguated_years.insert(sighting.year);
                } else {
                    plain_years.insert(sighting.year);
                    undisambiguated
                        .entry(sighting.canonical.canonical_key())
                        .or_default()
                        .insert(sighting.year);
                }
            }

            for (key, key_years) in &undisambiguated {
                if key_years.len() >= 2 {
                    issues.push(
                        ValidationIssue::new(
                            IssueKind::Ambiguous,
                            Severity::Ambiguous,
                            0,
                            display.clone(),
                            format!(
                                "'{}' has no lastname or disambiguator in {} years and will merge under '{}'",
                                display,
                                key_years.len(),
                                key
                            ),
                        )
                        .with_years(key_years.iter().copied().collect()),
                    );
                }
            }

            let only_plain: Vec<i32> = plain_years.difference(&disambiguated_years).copied().collect();
            if !disambiguated_years.is_empty() && !only_plain.is_empty() {
                issues.push(
                    ValidationIssue::new(
                        IssueKind::InconsistentDisambiguation,
                        Severity::Warning,
                        0,
                        display.clone(),
                        format!(
                            "'{}' is disambiguated in {} but not in {}",
                            display,
                            join_years(&disambiguated_years),
                            join_years(&only_plain)
                        ),
                    )
                    .with_years(years.iter().copied().collect()),
                );
            }

            debug!(base = %base, years = years.len(), "checked base name across years");
        }

        issues
    }
}

fn join_years<'a>(years: impl IntoIterator<Item = &'a i32>) -> String {
    years
        .into_iter()
        .map(i32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
