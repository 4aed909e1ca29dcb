//! A single curation entry and its disposition.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Kind of entity a curation file describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// People, curated in one global scope per year.
    People,
    /// Locations, curated per city per year.
    Locations,
}

impl EntityKind {
    /// File-name label.
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::People => "people",
            EntityKind::Locations => "locations",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "people" | "person" => Ok(EntityKind::People),
            "locations" | "location" => Ok(EntityKind::Locations),
            _ => Err(format!("Unknown type: {}. Use people or locations.", s)),
        }
    }
}

/// The single curation decision for an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// The entry carries its own canonical payload.
    Canonical,
    /// The entry is an alias of another raw name in the same scope.
    SameAs(String),
    /// The entry is noise and is not imported.
    Skip,
    /// The entry refers to the journal's author (people only).
    SelfRef,
}

impl Disposition {
    /// Marker name as written in curation files.
    pub fn marker(&self) -> &'static str {
        match self {
            Disposition::Canonical => "canonical",
            Disposition::SameAs(_) => "same_as",
            Disposition::Skip => "skip",
            Disposition::SelfRef => "self",
        }
    }
}

/// One raw name's record in a curation file.
///
/// The markers are stored as written so malformed entries survive loading
/// and can be reported instead of rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurationEntry {
    /// Canonical payload. `Some(Value::Null)` is an explicit `null`.
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub canonical: Option<Value>,

    /// Alias target within the same scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_as: Option<String>,

    /// Skip marker.
    #[serde(default, skip_serializing_if = "is_false")]
    pub skip: bool,

    /// Author marker.
    #[serde(rename = "self", default, skip_serializing_if = "is_false")]
    pub self_ref: bool,

    /// Dates the raw name was mentioned on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dates: Vec<String>,

    /// Any other fields a curator added (notes and the like).
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl CurationEntry {
    /// Uncurated entry carrying only dates.
    pub fn uncurated(dates: Vec<String>) -> Self {
        Self {
            dates,
            ..Self::default()
        }
    }

    /// Entry with a canonical payload.
    pub fn canonical(payload: Value) -> Self {
        Self {
            canonical: Some(payload),
            ..Self::default()
        }
    }

    /// Entry pointing at another raw name.
    pub fn same_as(target: impl Into<String>) -> Self {
        Self {
            same_as: Some(target.into()),
            ..Self::default()
        }
    }

    /// Entry marked as skipped.
    pub fn skipped() -> Self {
        Self {
            skip: true,
            ..Self::default()
        }
    }

    /// Entry marked as the author.
    pub fn author() -> Self {
        Self {
            self_ref: true,
            ..Self::default()
        }
    }

    /// Set the dates.
    pub fn with_dates<I, S>(mut self, dates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dates = dates.into_iter().map(Into::into).collect();
        self
    }

    /// Markers present on this entry, in a fixed order.
    pub fn markers(&self) -> Vec<&'static str> {
        let mut markers = Vec::new();
        if self.canonical.is_some() {
            markers.push("canonical");
        }
        if self.same_as.is_some() {
            markers.push("same_as");
        }
        if self.skip {
            markers.push("skip");
        }
        if self.self_ref {
            markers.push("self");
        }
        markers
    }

    /// Whether a curator has touched this entry.
    pub fn is_curated(&self) -> bool {
        !self.markers().is_empty()
    }

    /// The entry's disposition, or a description of why it has none.
    pub fn disposition(&self, kind: EntityKind) -> Result<Disposition, String> {
        let markers = self.markers();
        match markers.as_slice() {
            [] => Err("no disposition marker (expected one of canonical, same_as, skip, self)".to_string()),
            ["canonical"] => Ok(Disposition::Canonical),
            ["same_as"] => Ok(Disposition::SameAs(self.same_as.clone().unwrap_or_default())),
            ["skip"] => Ok(Disposition::Skip),
            ["self"] if kind == EntityKind::People => Ok(Disposition::SelfRef),
            ["self"] => Err("'self' is only valid for people".to_string()),
            many => Err(format!("multiple disposition markers: {}", many.join(", "))),
        }
    }

    /// The same_as target, only when same_as is the sole marker.
    pub fn same_as_target(&self) -> Option<&str> {
        match self.markers().as_slice() {
            ["same_as"] => self.same_as.as_deref(),
            _ => None,
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Distinguish an explicit `null` from an absent field.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}
