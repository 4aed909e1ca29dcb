//! Persistence for curation artifacts - whole-file JSON save/load.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{AlmanacError, Result};

/// Serialize `value` as pretty JSON and replace `path` with it.
///
/// The document is written to a sibling temporary file first and renamed
/// over the target, so readers never observe a partially written file.
pub fn write_json<T: Serialize + ?Sized>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();

    // Create parent directory if needed
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                AlmanacError::Persistence(format!(
                    "Failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    let temp_path = temporary_path(path);
    let file = File::create(&temp_path).map_err(|e| {
        AlmanacError::Persistence(format!(
            "Failed to create file '{}': {}",
            temp_path.display(),
            e
        ))
    })?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|e| {
        AlmanacError::Persistence(format!("Failed to serialize '{}': {}", path.display(), e))
    })?;
    writer
        .write_all(b"\n")
        .and_then(|_| writer.flush())
        .map_err(|e| AlmanacError::io(&temp_path, e))?;
    drop(writer);

    fs::rename(&temp_path, path).map_err(|e| {
        AlmanacError::Persistence(format!(
            "Failed to replace '{}': {}",
            path.display(),
            e
        ))
    })
}

/// Load a JSON document.
pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();

    let file = File::open(path).map_err(|e| {
        AlmanacError::Persistence(format!("Failed to open file '{}': {}", path.display(), e))
    })?;

    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(|e| {
        AlmanacError::Persistence(format!("Failed to parse '{}': {}", path.display(), e))
    })
}

/// Sibling path used while a replacement is being written.
fn temporary_path(path: &Path) -> PathBuf {
    let name = path.file_name().unwrap_or_default().to_string_lossy();
    path.with_file_name(format!(".{}.tmp", name))
}
