//! Durable ledger of failed imports.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::curation::{read_json, write_json};
use crate::error::{AlmanacError, ImportErrorKind, Result};

/// One failed source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedImport {
    /// Source file path as queued.
    pub file_path: PathBuf,
    /// Error classification.
    pub error_type: ImportErrorKind,
    /// Error message.
    pub error_message: String,
    /// When the failure happened.
    pub timestamp: DateTime<Utc>,
}

impl FailedImport {
    /// Record a failure now.
    pub fn new(file_path: impl Into<PathBuf>, error: &AlmanacError) -> Self {
        Self {
            file_path: file_path.into(),
            error_type: error.import_kind(),
            error_message: error.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// The `failed_imports.json` side file.
///
/// Holds at most one record per path: a newer failure replaces the older.
#[derive(Debug, Clone)]
pub struct ImportLedger {
    path: PathBuf,
    entries: Vec<FailedImport>,
}

impl ImportLedger {
    /// Load the ledger at `path`, or start an empty one.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() { read_json(&path)? } else { Vec::new() };
        debug!(path = %path.display(), entries = entries.len(), "loaded import ledger");
        Ok(Self { path, entries })
    }

    /// An empty ledger that will be written to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
        }
    }

    /// Where the ledger is saved.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All failures, oldest first.
    pub fn entries(&self) -> &[FailedImport] {
        &self.entries
    }

    /// Paths of every ledgered file, in ledger order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.entries.iter().map(|e| e.file_path.clone()).collect()
    }

    /// Number of failures.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no failure is recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a failure, replacing any earlier one for the same path.
    pub fn record(&mut self, failure: FailedImport) {
        self.entries.retain(|e| e.file_path != failure.file_path);
        self.entries.push(failure);
    }

    /// Drop the failure for `path`; returns whether one was present.
    pub fn remove(&mut self, path: &Path) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.file_path != path);
        self.entries.len() != before
    }

    /// Write the ledger as a whole-file replace.
    pub fn save(&self) -> Result<()> {
        write_json(&self.path, &self.entries)
    }
}
