//! Transactional datastore used by the importer.
//!
//! The importer only sees the [`Datastore`] and [`StoreTransaction`] traits:
//! records are addressed by `(kind, key)`, carry a JSON payload, and can be
//! linked to each other. A transaction dropped without [`StoreTransaction::commit`]
//! rolls back.

mod sqlite;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

pub use sqlite::{SqliteStore, SqliteTransaction};

/// Identifier assigned by the datastore.
pub type RecordId = i64;

/// Kind of a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Person,
    Location,
    City,
    Entry,
    Scene,
    Thread,
    Event,
    Tag,
    Theme,
    Motif,
    Reference,
    Poem,
    Date,
}

impl RecordKind {
    /// Every kind, in declaration order.
    pub const ALL: [RecordKind; 13] = [
        RecordKind::Person,
        RecordKind::Location,
        RecordKind::City,
        RecordKind::Entry,
        RecordKind::Scene,
        RecordKind::Thread,
        RecordKind::Event,
        RecordKind::Tag,
        RecordKind::Theme,
        RecordKind::Motif,
        RecordKind::Reference,
        RecordKind::Poem,
        RecordKind::Date,
    ];

    /// Storage label.
    pub fn label(&self) -> &'static str {
        match self {
            RecordKind::Person => "person",
            RecordKind::Location => "location",
            RecordKind::City => "city",
            RecordKind::Entry => "entry",
            RecordKind::Scene => "scene",
            RecordKind::Thread => "thread",
            RecordKind::Event => "event",
            RecordKind::Tag => "tag",
            RecordKind::Theme => "theme",
            RecordKind::Motif => "motif",
            RecordKind::Reference => "reference",
            RecordKind::Poem => "poem",
            RecordKind::Date => "date",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        RecordKind::ALL
            .into_iter()
            .find(|kind| kind.label() == s)
            .ok_or_else(|| format!("Unknown record kind: {}", s))
    }
}

/// A record read back from the datastore.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: RecordId,
    pub kind: RecordKind,
    pub key: String,
    pub payload: Value,
}

/// Operations available inside one transaction.
pub trait StoreTransaction {
    /// Look up a record by kind and key.
    fn get(&self, kind: RecordKind, key: &str) -> Result<Option<StoredRecord>>;

    /// Create a record; `(kind, key)` must not exist yet.
    fn create(&mut self, kind: RecordKind, key: &str, payload: &Value) -> Result<RecordId>;

    /// Replace the payload of an existing record.
    fn update(&mut self, kind: RecordKind, id: RecordId, payload: &Value) -> Result<()>;

    /// Link two records; linking twice is a no-op.
    fn link(&mut self, from: RecordId, to: RecordId, relation: &str) -> Result<()>;

    /// Targets of a record's outgoing links with one relation, in link order.
    fn linked(&self, from: RecordId, relation: &str) -> Result<Vec<RecordId>>;

    /// Remove every outgoing link of a record. Returns how many were removed.
    fn clear_links(&mut self, from: RecordId) -> Result<usize>;

    /// Delete a record together with every link touching it.
    fn delete(&mut self, kind: RecordKind, id: RecordId) -> Result<()>;

    /// Make every change of this transaction durable.
    fn commit(self: Box<Self>) -> Result<()>;

    /// Return the existing record's id, or create it. The flag is true when created.
    fn get_or_create(&mut self, kind: RecordKind, key: &str, payload: &Value) -> Result<(RecordId, bool)> {
        match self.get(kind, key)? {
            Some(record) => Ok((record.id, false)),
            None => Ok((self.create(kind, key, payload)?, true)),
        }
    }
}

/// A datastore that hands out transactions.
pub trait Datastore {
    /// Begin a transaction.
    fn transaction(&mut self) -> Result<Box<dyn StoreTransaction + '_>>;
}
