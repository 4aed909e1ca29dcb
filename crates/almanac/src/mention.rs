//! Raw mentions extracted from journal sources, and the sigil syntax used
//! to write them.
//!
//! People are written as `@alias`, `@alias (Full Name)`, `Full Name`, or
//! `Name (disambiguator)`. Locations are written as `#Name` or plain text.

use std::fmt;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::normalize::collapse_whitespace;

/// `@alias`, optional possessive, optional `(expansion)`.
static ALIAS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@([^\s()]+?)(?:['\x{2019}]s)?\s*(?:\(([^)]*)\))?\s*$").expect("valid alias regex")
});

/// `Name (parenthetical)`.
static PARENTHETICAL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)\s*\(([^)]*)\)\s*$").expect("valid parenthetical regex"));

/// Where in a journal entry a mention occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextType {
    /// A dated scene inside an entry.
    Scene,
    /// A narrative thread spanning entries.
    Thread,
}

impl fmt::Display for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextType::Scene => f.write_str("scene"),
            ContextType::Thread => f.write_str("thread"),
        }
    }
}

/// One place a raw name was seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    /// Date of the scene or thread (falls back to the entry date).
    pub date: NaiveDate,
    /// Scene or thread.
    pub context: ContextType,
    /// Name of the scene or thread.
    pub context_name: String,
    /// City the location mention belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

/// Every occurrence of one raw name within one year.
///
/// Built once by extraction and never edited afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMention {
    /// The name exactly as written in the source, sigils included.
    pub raw_name: String,
    /// Year of the curation file this mention belongs to.
    pub year: i32,
    /// Where the name was seen.
    pub occurrences: Vec<Occurrence>,
}

impl RawMention {
    /// Create a mention with no occurrences yet.
    pub fn new(raw_name: impl Into<String>, year: i32) -> Self {
        Self {
            raw_name: raw_name.into(),
            year,
            occurrences: Vec::new(),
        }
    }

    /// Add an occurrence.
    pub fn with_occurrence(mut self, occurrence: Occurrence) -> Self {
        self.occurrences.push(occurrence);
        self
    }

    /// Distinct occurrence dates, sorted, as ISO strings.
    pub fn dates(&self) -> Vec<String> {
        let mut dates: Vec<NaiveDate> = self.occurrences.iter().map(|o| o.date).collect();
        dates.sort();
        dates.dedup();
        dates.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect()
    }

    /// Earliest and latest occurrence dates.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.occurrences.iter().map(|o| o.date).min()?;
        let last = self.occurrences.iter().map(|o| o.date).max()?;
        Some((first, last))
    }
}

/// A person mention broken into its parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedPerson {
    /// Alias from `@alias` syntax.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Full name from `@alias (Full Name)` syntax.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expansion: Option<String>,
    /// First name token(s).
    pub first_name: String,
    /// Remaining name tokens, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl ParsedPerson {
    /// The best full name available: expansion, else the first/last pair.
    pub fn full_name(&self) -> String {
        match (&self.expansion, &self.last_name) {
            (Some(expansion), _) => expansion.clone(),
            (None, Some(last)) => format!("{} {}", self.first_name, last),
            (None, None) => self.first_name.clone(),
        }
    }

    /// Number of characters in the parsed name, used to rank detail.
    pub fn detail(&self) -> usize {
        self.first_name.chars().count()
            + self.last_name.as_deref().map_or(0, |l| l.chars().count())
    }
}

/// Parse a person mention.
///
/// ```
/// use almanac::mention::parse_person;
///
/// let p = parse_person("@Majo (María-José Castro)");
/// assert_eq!(p.alias.as_deref(), Some("Majo"));
/// assert_eq!(p.first_name, "María-José");
/// assert_eq!(p.last_name.as_deref(), Some("Castro"));
/// ```
pub fn parse_person(raw: &str) -> ParsedPerson {
    let raw = raw.trim();

    if let Some(caps) = ALIAS_PATTERN.captures(raw) {
        let alias = caps[1].to_string();
        let expansion = caps
            .get(2)
            .map(|m| collapse_whitespace(m.as_str()))
            .filter(|e| !e.is_empty());

        let (first_name, last_name) = match &expansion {
            Some(expansion) => split_name(expansion),
            None => (alias.replace('_', " "), None),
        };

        return ParsedPerson {
            alias: Some(alias),
            expansion,
            first_name,
            last_name,
        };
    }

    let (first_name, last_name) = split_name(&base_name(raw));
    ParsedPerson {
        alias: None,
        expansion: None,
        first_name,
        last_name,
    }
}

/// Display name of a location mention: sigil dropped, underscores spaced.
pub fn parse_location(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches('#');
    collapse_whitespace(&trimmed.replace('_', " "))
}

/// Raw name with any trailing parenthetical removed.
///
/// ```
/// use almanac::mention::base_name;
///
/// assert_eq!(base_name("Alice (Work)"), "Alice");
/// assert_eq!(base_name("Alice"), "Alice");
/// ```
pub fn base_name(raw: &str) -> String {
    match PARENTHETICAL_PATTERN.captures(raw.trim()) {
        Some(caps) => collapse_whitespace(&caps[1]),
        None => collapse_whitespace(raw),
    }
}

/// The trailing parenthetical of a raw name, if any.
pub fn parenthetical(raw: &str) -> Option<String> {
    PARENTHETICAL_PATTERN
        .captures(raw.trim())
        .map(|caps| collapse_whitespace(&caps[2]))
        .filter(|p| !p.is_empty())
}

/// Split a full name into first token and the rest.
fn split_name(full: &str) -> (String, Option<String>) {
    let full = collapse_whitespace(full.trim_start_matches('@'));
    match full.split_once(' ') {
        Some((first, rest)) => (first.to_string(), Some(rest.to_string())),
        None => (full, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occurrence(date: &str) -> Occurrence {
        Occurrence {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            context: ContextType::Scene,
            context_name: "Dinner".to_string(),
            city: None,
        }
    }

    #[test]
    fn test_parse_alias_with_expansion() {
        let p = parse_person("@Majo (María-José Castro)");
        assert_eq!(p.alias.as_deref(), Some("Majo"));
        assert_eq!(p.expansion.as_deref(), Some("María-José Castro"));
        assert_eq!(p.full_name(), "María-José Castro");
    }

    #[test]
    fn test_parse_bare_alias() {
        let p = parse_person("@Majo");
        assert_eq!(p.alias.as_deref(), Some("Majo"));
        assert_eq!(p.expansion, None);
        assert_eq!(p.first_name, "Majo");
        assert_eq!(p.last_name, None);
    }

    #[test]
    fn test_parse_possessive_alias() {
        let p = parse_person("@Aliza's");
        assert_eq!(p.alias.as_deref(), Some("Aliza"));
    }

    #[test]
    fn test_parse_plain_names() {
        let p = parse_person("Alice Smith");
        assert_eq!(p.alias, None);
        assert_eq!(p.first_name, "Alice");
        assert_eq!(p.last_name.as_deref(), Some("Smith"));

        let p = parse_person("Alice (Work)");
        assert_eq!(p.first_name, "Alice");
        assert_eq!(p.last_name, None);
    }

    #[test]
    fn test_parenthetical_helpers() {
        assert_eq!(parenthetical("Alice (Work)").as_deref(), Some("Work"));
        assert_eq!(parenthetical("Alice ()"), None);
        assert_eq!(parenthetical("Alice"), None);
        assert_eq!(base_name("  Alice   (Work)"), "Alice");
    }

    #[test]
    fn test_parse_location() {
        assert_eq!(parse_location("#Café_Olimpico"), "Café Olimpico");
        assert_eq!(parse_location(" Parc  Jarry "), "Parc Jarry");
    }

    #[test]
    fn test_mention_dates_sorted_and_deduplicated() {
        let mention = RawMention::new("Alice", 2024)
            .with_occurrence(occurrence("2024-03-01"))
            .with_occurrence(occurrence("2024-01-01"))
            .with_occurrence(occurrence("2024-03-01"));

        assert_eq!(mention.dates(), vec!["2024-01-01", "2024-03-01"]);
        let (first, last) = mention.date_range().unwrap();
        assert_eq!(first.to_string(), "2024-01-01");
        assert_eq!(last.to_string(), "2024-03-01");
    }
}
