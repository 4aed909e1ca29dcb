//! Journal source documents.
//!
//! One JSON document per journal entry:
//!
//! ```json
//! {
//!   "date": "2024-03-14",
//!   "city": "Montréal",
//!   "tags": ["walk"],
//!   "scenes": [
//!     { "name": "Morning", "people": ["@Majo (María-José Castro)"], "locations": ["#Parc_Jarry"] }
//!   ],
//!   "threads": [
//!     { "name": "Moving out", "date": "2024-03-01", "people": ["Alice"] }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::curation::{UNASSIGNED_CITY, read_json};
use crate::error::{AlmanacError, Result};
use crate::mention::ContextType;

/// A quoted reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Quoted text.
    pub content: String,
    /// Where it comes from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// A poem written in the entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poem {
    /// Title.
    pub title: String,
    /// Full text.
    pub content: String,
}

/// A scene or thread and the people and places it mentions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// Scene or thread name.
    pub name: String,
    /// Date, when it differs from the entry date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// City, when it differs from the entry city.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Person mentions as written.
    #[serde(default)]
    pub people: Vec<String>,
    /// Location mentions as written.
    #[serde(default)]
    pub locations: Vec<String>,
}

/// One journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Entry date.
    pub date: NaiveDate,
    /// City the entry was written in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub motifs: Vec<String>,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub references: Vec<Reference>,
    #[serde(default)]
    pub poems: Vec<Poem>,
    #[serde(default)]
    pub scenes: Vec<Context>,
    #[serde(default)]
    pub threads: Vec<Context>,
}

impl SourceDocument {
    /// Load a document.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        read_json(path)
    }

    /// Year of the entry.
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    /// Scenes then threads, tagged with their context type.
    pub fn contexts(&self) -> impl Iterator<Item = (ContextType, &Context)> {
        self.scenes
            .iter()
            .map(|c| (ContextType::Scene, c))
            .chain(self.threads.iter().map(|c| (ContextType::Thread, c)))
    }

    /// Date of a context, falling back to the entry date.
    pub fn context_date(&self, context: &Context) -> NaiveDate {
        context.date.unwrap_or(self.date)
    }

    /// City of a context: its own, else the entry's, else the unassigned bucket.
    pub fn context_city<'a>(&'a self, context: &'a Context) -> &'a str {
        context
            .city
            .as_deref()
            .or(self.city.as_deref())
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(UNASSIGNED_CITY)
    }

    /// Check content that parsing alone does not enforce.
    pub fn check(&self) -> Result<()> {
        for (context_type, context) in self.contexts() {
            if context.name.trim().is_empty() {
                return Err(AlmanacError::Structure(format!("{} without a name", context_type)));
            }
            for mention in context.people.iter().chain(&context.locations) {
                if mention.trim().is_empty() {
                    return Err(AlmanacError::Structure(format!(
                        "empty mention in {} '{}'",
                        context_type, context.name
                    )));
                }
            }
        }
        if let Some(poem) = self.poems.iter().find(|p| p.title.trim().is_empty()) {
            return Err(AlmanacError::Structure(format!(
                "poem without a title ({} characters)",
                poem.content.len()
            )));
        }
        if self.references.iter().any(|r| r.content.trim().is_empty()) {
            return Err(AlmanacError::Structure("reference without content".to_string()));
        }
        Ok(())
    }
}

/// Every `*.json` document under `dir`, sorted by path.
pub fn discover_sources(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.exists() {
        return Err(AlmanacError::Config(format!(
            "source directory '{}' does not exist",
            dir.display()
        )));
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
            AlmanacError::io(path, e.into())
        })?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path.to_path_buf());
        }
    }

    paths.sort();
    Ok(paths)
}
