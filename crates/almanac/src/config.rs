//! Project configuration, read from `almanac.toml`.
//!
//! ```toml
//! source_dir = "journal"
//! curation_dir = "curation"
//! output_dir = "consolidated"
//! ledger_path = "failed_imports.json"
//! database_path = "almanac.db"
//!
//! [import]
//! max_consecutive_failures = 5
//! max_failure_rate = 0.05
//! min_files_for_rate = 20
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::curation::EntityKind;
use crate::consolidate::consolidated_file_path;
use crate::error::{AlmanacError, Result};

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "almanac.toml";

/// Abort thresholds for a batch import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Halt after this many failures in a row.
    pub max_consecutive_failures: usize,
    /// Halt when the failure rate exceeds this fraction...
    pub max_failure_rate: f64,
    /// ...once at least this many files have been processed.
    pub min_files_for_rate: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 5,
            max_failure_rate: 0.05,
            min_files_for_rate: 20,
        }
    }
}

/// Paths and settings for every pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlmanacConfig {
    /// Journal source documents.
    pub source_dir: PathBuf,
    /// Per-year curation files and cluster drafts.
    pub curation_dir: PathBuf,
    /// Consolidated files.
    pub output_dir: PathBuf,
    /// Ledger of failed imports.
    pub ledger_path: PathBuf,
    /// SQLite database.
    pub database_path: PathBuf,
    /// Import thresholds.
    pub import: ImportConfig,
}

impl Default for AlmanacConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("journal"),
            curation_dir: PathBuf::from("curation"),
            output_dir: PathBuf::from("consolidated"),
            ledger_path: PathBuf::from("failed_imports.json"),
            database_path: PathBuf::from("almanac.db"),
            import: ImportConfig::default(),
        }
    }
}

impl AlmanacConfig {
    /// Load `path` if given, else `almanac.toml` when present, else defaults.
    ///
    /// An explicit path that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(CONFIG_FILE_NAME);
                if default.exists() {
                    Self::from_file(default)
                } else {
                    debug!("no {} found, using defaults", CONFIG_FILE_NAME);
                    Ok(Self::default())
                }
            }
        }
    }

    /// Parse a TOML configuration file.
    ///
    /// Relative paths inside the file are resolved against its directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AlmanacError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;

        let base = path.parent().filter(|p| !p.as_os_str().is_empty());
        let config = match base {
            Some(base) => config.relative_to(base),
            None => config,
        };
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let rate = self.import.max_failure_rate;
        if !(0.0..=1.0).contains(&rate) {
            return Err(AlmanacError::Config(format!(
                "import.max_failure_rate must be between 0 and 1, got {}",
                rate
            )));
        }
        if self.import.max_consecutive_failures == 0 {
            return Err(AlmanacError::Config(
                "import.max_consecutive_failures must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn relative_to(mut self, base: &Path) -> Self {
        for path in [
            &mut self.source_dir,
            &mut self.curation_dir,
            &mut self.output_dir,
            &mut self.ledger_path,
            &mut self.database_path,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        self
    }

    /// Set the source directory.
    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = dir.into();
        self
    }

    /// Set the curation directory.
    pub fn with_curation_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.curation_dir = dir.into();
        self
    }

    /// Set the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the failed-import ledger path.
    pub fn with_ledger_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ledger_path = path.into();
        self
    }

    /// Set the database path.
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    /// Set the import thresholds.
    pub fn with_import(mut self, import: ImportConfig) -> Self {
        self.import = import;
        self
    }

    /// Consolidated file of one kind.
    pub fn consolidated_path(&self, kind: EntityKind) -> PathBuf {
        consolidated_file_path(&self.output_dir, kind)
    }
}
