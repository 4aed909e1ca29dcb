//! Database import of journal sources.
//!
//! Each source file is imported in its own transaction, moving through
//! [`ImportState`] from `Pending` to `Succeeded` or `Failed`. A failed file
//! is rolled back and written to the [`ImportLedger`]; the batch halts when
//! the thresholds in [`ImportConfig`](crate::config::ImportConfig) are
//! crossed, leaving later files untouched.

mod importer;
mod ledger;
mod stats;

pub use importer::{CurationImporter, FileOutcome, ImportReport};
pub use ledger::{FailedImport, ImportLedger};
pub use stats::{AbortReason, ImportState, ImportStats};
