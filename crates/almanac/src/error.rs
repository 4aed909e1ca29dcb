//! Error types for the almanac library.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a failed source-file import, recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportErrorKind {
    /// The source document could not be read or parsed.
    SourceParse,
    /// One or more mentions did not resolve to a canonical identity.
    UnresolvedMention,
    /// The document parsed but its content is not importable.
    InvalidDocument,
    /// The datastore rejected a read or write.
    Datastore,
}

impl ImportErrorKind {
    /// Ledger label.
    pub fn label(&self) -> &'static str {
        match self {
            ImportErrorKind::SourceParse => "source_parse",
            ImportErrorKind::UnresolvedMention => "unresolved_mention",
            ImportErrorKind::InvalidDocument => "invalid_document",
            ImportErrorKind::Datastore => "datastore",
        }
    }
}

impl fmt::Display for ImportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Main error type for almanac operations.
#[derive(Debug, Error)]
pub enum AlmanacError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be parsed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Failure saving or loading a curation artifact.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed curation entry shape.
    #[error("Structural error: {0}")]
    Structure(String),

    /// Dangling or circular same_as reference.
    #[error("Reference error: {0}")]
    Reference(String),

    /// Validation found blocking errors.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Datastore failure.
    #[error("Datastore error: {0}")]
    Datastore(String),

    /// A source file could not be imported.
    #[error("Import error ({kind}): {message}")]
    Import {
        kind: ImportErrorKind,
        message: String,
    },
}

impl AlmanacError {
    /// Build an IO error bound to a path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AlmanacError::Io {
            path: path.into(),
            source,
        }
    }

    /// Build an import error.
    pub fn import(kind: ImportErrorKind, message: impl Into<String>) -> Self {
        AlmanacError::Import {
            kind,
            message: message.into(),
        }
    }

    /// Ledger classification of this error when it aborts a file import.
    pub fn import_kind(&self) -> ImportErrorKind {
        match self {
            AlmanacError::Import { kind, .. } => *kind,
            AlmanacError::Datastore(_) => ImportErrorKind::Datastore,
            AlmanacError::Io { .. } | AlmanacError::Json(_) => ImportErrorKind::SourceParse,
            _ => ImportErrorKind::InvalidDocument,
        }
    }
}

impl From<rusqlite::Error> for AlmanacError {
    fn from(e: rusqlite::Error) -> Self {
        AlmanacError::Datastore(e.to_string())
    }
}

/// Result type alias for almanac operations.
pub type Result<T> = std::result::Result<T, AlmanacError>;
